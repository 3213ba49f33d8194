//! Admin API error type: every handler returns `Result<_, ApiError>` and
//! `IntoResponse` maps it onto the `{error, message}` body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use nc_storage::StorageError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} already exists with {field}={value}")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("router error: {0}")]
    Router(#[from] nc_router::RouterError),
}

impl ApiError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity_type: entity_type.into(), id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Storage(StorageError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(StorageError::Duplicate { .. }) => (StatusCode::CONFLICT, "DUPLICATE"),
            ApiError::Storage(StorageError::CasConflict { .. }) => (StatusCode::CONFLICT, "CAS_CONFLICT"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Redis(_) => (StatusCode::BAD_GATEWAY, "PUBSUB_ERROR"),
            ApiError::Router(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ROUTER_ERROR"),
        };

        let body = ErrorResponse { error: error_type.to_string(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
