//! Error types for leader election.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StandbyError {
    #[error("storage error: {0}")]
    Storage(#[from] nc_storage::StorageError),

    #[error("already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, StandbyError>;
