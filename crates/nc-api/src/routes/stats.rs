//! `/api/v1/stats` (§4.6, §6): delivery throughput, both the in-memory
//! 5-minute window the router keeps live (`ChannelStatsRegistry`) and the
//! durable per-period totals backed by `publish_history`.

use crate::auth::Authenticated;
use crate::error::Result;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use nc_router::{ChannelStats, ChannelStatsRegistry};
use nc_storage::PublishHistoryRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Clone)]
pub struct StatsState {
    pub history: Arc<PublishHistoryRepository>,
    pub registry: Arc<ChannelStatsRegistry>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl StatsPeriod {
    /// Lower bound for a "since" count query. `All` has none.
    fn since(self) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        match self {
            StatsPeriod::Today => Some(now - Duration::days(1)),
            StatsPeriod::Week => Some(now - Duration::weeks(1)),
            StatsPeriod::Month => Some(now - Duration::days(30)),
            StatsPeriod::All => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    #[serde(default)]
    pub period: StatsPeriod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewResponse {
    pub period: String,
    pub total_delivered: i64,
    pub active_channels: usize,
}

/// `GET /stats/overview?period=today|week|month|all`: total deliveries
/// recorded in `publish_history` for the period, plus how many channels
/// the live 5-minute window currently considers active.
#[utoipa::path(
    get, path = "/overview", tag = "stats",
    params(OverviewQuery),
    responses((status = 200, body = OverviewResponse))
)]
pub async fn get_overview(
    State(state): State<StatsState>,
    _auth: Authenticated,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>> {
    let total_delivered = match query.period.since() {
        Some(since) => state.history.count_all_since(since).await?,
        None => {
            // `count_all_since` requires a lower bound; for "all" we use
            // the dawn of the system rather than adding a second query path.
            state.history.count_all_since(DateTime::<Utc>::from_timestamp(0, 0).unwrap_or(Utc::now())).await?
        }
    };

    Ok(Json(OverviewResponse {
        period: format!("{:?}", query.period).to_lowercase(),
        total_delivered,
        active_channels: state.registry.active_channels().len(),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelStatsResponse {
    pub channels: HashMap<String, ChannelStats>,
}

/// `GET /stats/channels`: the live 5-minute-window counters for every
/// channel the router has delivered to or failed since process start.
#[utoipa::path(
    get, path = "/channels", tag = "stats",
    responses((status = 200, body = ChannelStatsResponse))
)]
pub async fn get_channel_stats(
    State(state): State<StatsState>,
    _auth: Authenticated,
) -> Result<Json<ChannelStatsResponse>> {
    Ok(Json(ChannelStatsResponse { channels: state.registry.snapshot_all() }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveChannelsResponse {
    pub channels: Vec<String>,
}

#[utoipa::path(
    get, path = "/channels/active", tag = "stats",
    responses((status = 200, body = ActiveChannelsResponse))
)]
pub async fn get_active_channels(
    State(state): State<StatsState>,
    _auth: Authenticated,
) -> Result<Json<ActiveChannelsResponse>> {
    Ok(Json(ActiveChannelsResponse { channels: state.registry.active_channels() }))
}

pub fn stats_router(state: StatsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_overview))
        .routes(routes!(get_channel_stats))
        .routes(routes!(get_active_channels))
        .with_state(state)
}
