//! Error types for job scheduling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("storage error: {0}")]
    Storage(#[from] nc_storage::StorageError),

    #[error("standby error: {0}")]
    Standby(#[from] nc_standby::StandbyError),

    #[error("invalid cron expression {0:?}: {1}")]
    InvalidCron(String, String),

    #[error("job validation failed: {0}")]
    Validation(String),

    #[error("job {0} not found")]
    NotFound(uuid::Uuid),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
