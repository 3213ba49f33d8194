//! `/api/v1/topics` (§4.5, §6): enumerates the fixed Layer-1 topic set
//! and the implicit `articles:{topic}` channel each one resolves to, so
//! operators configuring Layer-2 `ChannelRules.include_topics` can see
//! the exact vocabulary the router recognizes.

use crate::auth::Authenticated;
use axum::Json;
use nc_domain::layer1_channel_name;
use nc_router::KNOWN_TOPICS;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicEntry {
    pub topic: String,
    pub channel_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicsResponse {
    pub topics: Vec<TopicEntry>,
}

#[utoipa::path(
    get, path = "", tag = "topics",
    responses((status = 200, body = TopicsResponse))
)]
pub async fn list_topics(_auth: Authenticated) -> Json<TopicsResponse> {
    let topics = KNOWN_TOPICS
        .iter()
        .map(|topic| TopicEntry { topic: topic.to_string(), channel_name: layer1_channel_name(topic) })
        .collect();
    Json(TopicsResponse { topics })
}

pub fn topics_router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(list_topics))
}
