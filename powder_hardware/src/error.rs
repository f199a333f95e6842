use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("analog source unavailable: {0}")]
    Unavailable(String),
    #[error("analog read timeout")]
    Timeout,
    #[error("storage: {0}")]
    Storage(String),
    #[error("display: {0}")]
    Display(String),
    #[error("update sink: {0}")]
    Update(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
