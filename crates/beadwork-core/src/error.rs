use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeadworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Input validation error: {0}")]
    InputValidation(String),

    #[error("Metric timed out: {0}")]
    Timeout(String),

    #[error("Analysis cancelled: {0}")]
    Cancelled(String),

    #[error("Cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Entry oversize: {0}")]
    Oversize(String),

    #[error("Feedback store error: {0}")]
    Feedback(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, BeadworkError>;
