use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Scan error: {0}")]
    Scan(#[from] core_scan::ScanError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Capture error: {0}")]
    Capture(#[from] core_capture::CaptureError),

    #[error("Engine has been shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, CoreError>;
