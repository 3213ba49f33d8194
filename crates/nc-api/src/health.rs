//! `GET /health` (§6: `{status: healthy|degraded, components: {db, pubsub}}`).
//!
//! Grounded on the teacher's `HealthChecker`/`HealthState` split, with the
//! Mongo ping swapped for a Postgres `SELECT 1` and a Redis `PING`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use redis::aio::ConnectionManager;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Components {
    pub db: ComponentStatus,
    pub pubsub: ComponentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: Components,
}

#[derive(Clone)]
pub struct HealthState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
}

async fn check_db(pool: &PgPool) -> ComponentStatus {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => ComponentStatus::Connected,
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            ComponentStatus::Disconnected
        }
    }
}

async fn check_pubsub(redis: &ConnectionManager) -> ComponentStatus {
    let mut conn = redis.clone();
    let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    match result {
        Ok(_) => ComponentStatus::Connected,
        Err(e) => {
            tracing::warn!(error = %e, "health check: redis unreachable");
            ComponentStatus::Disconnected
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All components connected", body = HealthResponse),
        (status = 503, description = "One or more components disconnected", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<HealthState>) -> impl IntoResponse {
    let (db, pubsub) = tokio::join!(check_db(&state.pool), check_pubsub(&state.redis));

    let status = if db == ComponentStatus::Connected && pubsub == ComponentStatus::Connected {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let status_code = if status == HealthStatus::Healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(HealthResponse { status, components: Components { db, pubsub } }))
}

pub fn health_router(state: HealthState) -> Router {
    Router::new().route("/health", get(get_health)).with_state(state)
}
