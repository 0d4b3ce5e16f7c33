use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Both the device handle and the generic facing request failed, or the
    /// generic request failed on its own.
    #[error("Failed to start capture on {target}: {message}")]
    StartFailed { target: String, message: String },

    /// A newer start, switch or stop was requested while this start ran.
    #[error("Capture start #{generation} was superseded by a newer request")]
    Superseded { generation: u64 },

    #[error("Failed to stop capture: {0}")]
    Stop(String),
}

impl CaptureError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, CaptureError::Superseded { .. })
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
