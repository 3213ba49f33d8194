//! Storage error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} already exists with {field}={value}")]
    Duplicate {
        entity_type: String,
        field: String,
        value: String,
    },

    #[error("compare-and-swap failed: {entity_type} {id} was not in the expected state")]
    CasConflict { entity_type: String, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn cas_conflict(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::CasConflict {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// `true` when the underlying error is a unique-constraint violation,
    /// so callers can translate it into a domain-specific `Duplicate`.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::Database(e)) if e.is_unique_violation())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
