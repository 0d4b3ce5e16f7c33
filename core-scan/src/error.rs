use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No tokio runtime available to drive batch timers: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
