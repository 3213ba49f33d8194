//! L13: the admin REST API (§4.6, §6). Thin CRUD/lifecycle surface over
//! `nc-storage` plus read access to the router's live stats and the
//! realtime event bus; every admin mutation goes through the same
//! repositories the pipeline workers use, so the API never becomes a
//! second source of truth.

pub mod auth;
pub mod common;
pub mod error;
pub mod events;
pub mod health;
pub mod routes;

use crate::auth::{AuthLayer, AuthState};
use crate::events::{EventsState, JobChangePoller};
use crate::health::HealthState;
use crate::routes::channels::ChannelsState;
use crate::routes::jobs::JobsState;
use crate::routes::publish_history::PublishHistoryState;
use crate::routes::route_rules::RoutesState;
use crate::routes::sources::SourcesState;
use crate::routes::stats::StatsState;
use axum::Router;
use nc_router::ChannelStatsRegistry;
use nc_storage::{
    ChannelRepository, JobExecutionRepository, JobRepository, PublishHistoryRepository, RouteRepository,
    SourceRepository,
};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

/// Everything a running admin API process needs, assembled once at
/// startup and cloned cheaply into each route's state struct.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub admin_token: String,
    pub sources: Arc<SourceRepository>,
    pub jobs: Arc<JobRepository>,
    pub executions: Arc<JobExecutionRepository>,
    pub channels: Arc<ChannelRepository>,
    pub routes: Arc<RouteRepository>,
    pub publish_history: Arc<PublishHistoryRepository>,
    pub channel_stats: Arc<ChannelStatsRegistry>,
    pub events: Arc<nc_events::EventBus>,
}

impl AppState {
    pub fn new(pool: PgPool, redis: ConnectionManager, admin_token: String) -> Self {
        Self {
            sources: Arc::new(SourceRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool.clone())),
            executions: Arc::new(JobExecutionRepository::new(pool.clone())),
            channels: Arc::new(ChannelRepository::new(pool.clone())),
            routes: Arc::new(RouteRepository::new(pool.clone())),
            publish_history: Arc::new(PublishHistoryRepository::new(pool.clone())),
            channel_stats: Arc::new(ChannelStatsRegistry::new()),
            events: Arc::new(nc_events::EventBus::default()),
            pool,
            redis,
            admin_token,
        }
    }

    /// Spawns the job-status poll that bridges scheduler-process state
    /// changes onto this process's in-memory event bus (see
    /// `events::JobChangePoller`).
    pub fn spawn_event_poller(&self) {
        let poller = JobChangePoller::new(self.jobs.clone(), self.events.clone(), Duration::from_secs(2));
        tokio::spawn(poller.run());
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Newsroom Pipeline Admin API", description = "Crawl scheduling, routing and delivery administration"),
    tags(
        (name = "health", description = "Liveness/readiness"),
        (name = "sources", description = "Crawl targets"),
        (name = "jobs", description = "Scheduled crawl jobs"),
        (name = "channels", description = "Layer 2 delivery channels"),
        (name = "routes", description = "Source-to-channel gating rules"),
        (name = "publish-history", description = "Delivery idempotence ledger"),
        (name = "stats", description = "Delivery throughput"),
        (name = "topics", description = "Layer 1 topic vocabulary"),
        (name = "events", description = "Realtime event stream"),
    )
)]
struct ApiDoc;

/// Builds the full router: `/health` unauthenticated, Swagger UI
/// unauthenticated, and everything under `/api/v1` behind `AuthLayer`.
pub fn build_router(state: AppState) -> Router {
    let health_router = health::health_router(HealthState { pool: state.pool.clone(), redis: state.redis.clone() });

    let api = OpenApiRouter::new()
        .nest("/sources", routes::sources::sources_router(SourcesState { repo: state.sources.clone() }))
        .nest(
            "/jobs",
            routes::jobs::jobs_router(JobsState { jobs: state.jobs.clone(), executions: state.executions.clone() }),
        )
        .nest(
            "/channels",
            routes::channels::channels_router(ChannelsState {
                repo: state.channels.clone(),
                redis: state.redis.clone(),
                stats: state.channel_stats.clone(),
            }),
        )
        .nest(
            "/routes",
            routes::route_rules::routes_router(RoutesState { routes: state.routes.clone(), channels: state.channels.clone() }),
        )
        .nest(
            "/publish-history",
            routes::publish_history::publish_history_router(PublishHistoryState { repo: state.publish_history.clone() }),
        )
        .nest(
            "/stats",
            routes::stats::stats_router(StatsState { history: state.publish_history.clone(), registry: state.channel_stats.clone() }),
        )
        .nest("/topics", routes::topics::topics_router())
        .nest("/events", events::events_router(EventsState { bus: state.events.clone() }));

    let (api_router, api_doc) = api.split_for_parts();
    let api_router = api_router.layer(AuthLayer::new(AuthState::new(state.admin_token.clone())));

    Router::new()
        .merge(health_router)
        .nest("/api/v1", api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi().merge(api_doc)))
}
