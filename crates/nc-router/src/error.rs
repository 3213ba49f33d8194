use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("storage error: {0}")]
    Storage(#[from] nc_storage::StorageError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
