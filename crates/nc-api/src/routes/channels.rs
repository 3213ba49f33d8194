//! `/api/v1/channels` (§4.6, §6): CRUD plus `test-publish`, a dry run of
//! the Layer-2 delivery path against a synthetic article.

use crate::auth::Authenticated;
use crate::common::SuccessResponse;
use crate::error::{ApiError, Result};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use nc_domain::{Channel, ChannelRules};
use nc_router::ChannelStatsRegistry;
use nc_storage::ChannelRepository;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChannelsState {
    pub repo: Arc<ChannelRepository>,
    pub redis: ConnectionManager,
    pub stats: Arc<ChannelStatsRegistry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChannelRequest {
    pub name: String,
    pub slug: String,
    pub redis_channel: String,
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub rules: ChannelRules,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub redis_channel: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub rules: Option<ChannelRules>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelListResponse {
    pub data: Vec<Channel>,
}

#[utoipa::path(
    get, path = "", tag = "channels",
    responses((status = 200, body = ChannelListResponse))
)]
pub async fn list_channels(State(state): State<ChannelsState>, _auth: Authenticated) -> Result<Json<ChannelListResponse>> {
    let data = state.repo.list().await?;
    Ok(Json(ChannelListResponse { data }))
}

#[utoipa::path(
    post, path = "", tag = "channels",
    request_body = CreateChannelRequest,
    responses((status = 201, body = Channel))
)]
pub async fn create_channel(
    State(state): State<ChannelsState>,
    _auth: Authenticated,
    Json(req): Json<CreateChannelRequest>,
) -> Result<Json<Channel>> {
    let channel = Channel {
        id: Uuid::new_v4(),
        name: req.name,
        slug: req.slug,
        redis_channel: req.redis_channel,
        description: req.description,
        enabled: req.enabled,
        rules: req.rules,
        created_at: Utc::now(),
    };
    state.repo.insert(&channel).await?;
    Ok(Json(channel))
}

#[utoipa::path(
    get, path = "/{id}", tag = "channels",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = Channel), (status = 404, description = "Channel not found"))
)]
pub async fn get_channel(
    State(state): State<ChannelsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<Channel>> {
    let channel = state.repo.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Channel", id.to_string()))?;
    Ok(Json(channel))
}

#[utoipa::path(
    put, path = "/{id}", tag = "channels",
    params(("id" = Uuid, Path)),
    request_body = UpdateChannelRequest,
    responses((status = 200, body = Channel), (status = 404, description = "Channel not found"))
)]
pub async fn update_channel(
    State(state): State<ChannelsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateChannelRequest>,
) -> Result<Json<Channel>> {
    let mut channel =
        state.repo.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Channel", id.to_string()))?;

    if let Some(name) = req.name {
        channel.name = name;
    }
    if let Some(slug) = req.slug {
        channel.slug = slug;
    }
    if let Some(redis_channel) = req.redis_channel {
        channel.redis_channel = redis_channel;
    }
    if req.description.is_some() {
        channel.description = req.description;
    }
    if let Some(enabled) = req.enabled {
        channel.enabled = enabled;
    }
    if let Some(rules) = req.rules {
        channel.rules = rules;
    }

    state.repo.update(&channel).await?;
    Ok(Json(channel))
}

#[utoipa::path(
    delete, path = "/{id}", tag = "channels",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Channel not found"))
)]
pub async fn delete_channel(
    State(state): State<ChannelsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.repo.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestPublishResponse {
    pub channel_name: String,
    pub redis_channel: String,
    pub subscriber_count: i64,
}

/// Publishes a synthetic delivery payload to the channel's Redis channel
/// without writing a `publish_history` row, so operators can verify
/// downstream subscribers are wired up without polluting delivery stats.
#[utoipa::path(
    get, path = "/{id}/test-publish", tag = "channels",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = TestPublishResponse), (status = 404, description = "Channel not found"))
)]
pub async fn test_publish_channel(
    State(mut state): State<ChannelsState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<TestPublishResponse>> {
    let channel = state.repo.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Channel", id.to_string()))?;

    let body = serde_json::json!({
        "test": true,
        "channel_name": channel.name,
        "sent_at": Utc::now(),
    });

    let subscriber_count: i64 =
        redis::cmd("PUBLISH").arg(&channel.redis_channel).arg(body.to_string()).query_async(&mut state.redis).await?;

    state.stats.record_delivered(&channel.name);

    Ok(Json(TestPublishResponse {
        channel_name: channel.name,
        redis_channel: channel.redis_channel,
        subscriber_count,
    }))
}

pub fn channels_router(state: ChannelsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_channels, create_channel))
        .routes(routes!(get_channel, update_channel, delete_channel))
        .routes(routes!(test_publish_channel))
        .with_state(state)
}
