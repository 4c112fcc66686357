/// Vote processor error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Festify(#[from] festify_core::FestifyError),

    #[error("Storage error: {0}")]
    Storage(#[from] festify_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dispatcher task failed: {0}")]
    Dispatcher(String),
}
