use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob key not found: {0}")]
    NotFound(String),
    #[error("blob key already exists: {0}")]
    AlreadyExists(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote backend error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;
