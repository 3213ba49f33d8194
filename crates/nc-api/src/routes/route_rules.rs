//! `/api/v1/routes` (§4.6, §6): CRUD over source↔channel gating, plus
//! `preview` for testing a hypothetical article against the current
//! routing table without publishing anything.

use crate::auth::Authenticated;
use crate::common::SuccessResponse;
use crate::error::{ApiError, Result};
use axum::extract::{Path, Query, State};
use axum::Json;
use nc_domain::{Article, ContentType, Route};
use nc_router::{route as compute_route, Delivery, RouteCandidate};
use nc_storage::{ChannelRepository, RouteRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

#[derive(Clone)]
pub struct RoutesState {
    pub routes: Arc<RouteRepository>,
    pub channels: Arc<ChannelRepository>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRouteRequest {
    pub source_id: Uuid,
    pub channel_id: Uuid,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub min_quality_score: Option<i16>,
    #[serde(default)]
    pub topics: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRouteRequest {
    pub enabled: Option<bool>,
    pub min_quality_score: Option<i16>,
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteListResponse {
    pub data: Vec<Route>,
}

#[utoipa::path(get, path = "", tag = "routes", responses((status = 200, body = RouteListResponse)))]
pub async fn list_routes(State(state): State<RoutesState>, _auth: Authenticated) -> Result<Json<RouteListResponse>> {
    let data = state.routes.list().await?;
    Ok(Json(RouteListResponse { data }))
}

#[utoipa::path(
    post, path = "", tag = "routes",
    request_body = CreateRouteRequest,
    responses((status = 201, body = Route))
)]
pub async fn create_route(
    State(state): State<RoutesState>,
    _auth: Authenticated,
    Json(req): Json<CreateRouteRequest>,
) -> Result<Json<Route>> {
    let route = Route {
        id: Uuid::new_v4(),
        source_id: req.source_id,
        channel_id: req.channel_id,
        enabled: req.enabled,
        min_quality_score: req.min_quality_score,
        topics: req.topics,
    };
    state.routes.insert(&route).await?;
    Ok(Json(route))
}

#[utoipa::path(
    get, path = "/{id}", tag = "routes",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = Route), (status = 404, description = "Route not found"))
)]
pub async fn get_route(State(state): State<RoutesState>, _auth: Authenticated, Path(id): Path<Uuid>) -> Result<Json<Route>> {
    let route = find_route(&state, id).await?;
    Ok(Json(route))
}

async fn find_route(state: &RoutesState, id: Uuid) -> Result<Route> {
    state.routes.list().await?.into_iter().find(|r| r.id == id).ok_or_else(|| ApiError::not_found("Route", id.to_string()))
}

#[utoipa::path(
    put, path = "/{id}", tag = "routes",
    params(("id" = Uuid, Path)),
    request_body = UpdateRouteRequest,
    responses((status = 200, body = Route), (status = 404, description = "Route not found"))
)]
pub async fn update_route(
    State(state): State<RoutesState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRouteRequest>,
) -> Result<Json<Route>> {
    let mut route = find_route(&state, id).await?;

    if let Some(enabled) = req.enabled {
        route.enabled = enabled;
    }
    if req.min_quality_score.is_some() {
        route.min_quality_score = req.min_quality_score;
    }
    if let Some(topics) = req.topics {
        route.topics = topics;
    }

    state.routes.update(&route).await?;
    Ok(Json(route))
}

#[utoipa::path(
    delete, path = "/{id}", tag = "routes",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Route not found"))
)]
pub async fn delete_route(
    State(state): State<RoutesState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.routes.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    pub source_id: Uuid,
    #[serde(default)]
    pub topics: String,
    #[serde(default)]
    pub quality_score: i16,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewResponse {
    pub deliveries: Vec<Delivery>,
}

/// Runs §4.5's Layer-1/Layer-2 fanout against a hypothetical article
/// (comma-separated `topics`, a `quality_score`, and `source_id`) without
/// publishing anything, so operators can verify a route/channel change
/// before it goes live.
#[utoipa::path(
    get, path = "/preview", tag = "routes",
    params(PreviewQuery),
    responses((status = 200, body = PreviewResponse))
)]
pub async fn preview_route(
    State(state): State<RoutesState>,
    _auth: Authenticated,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>> {
    let topic_tags: Vec<String> = query.topics.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
    let article = synthetic_article(topic_tags, query.quality_score);

    let channels = state.channels.list_enabled().await?;
    let routes = state.routes.list().await?;

    let candidates: Vec<RouteCandidate<'_>> = channels
        .iter()
        .filter_map(|channel| {
            routes
                .iter()
                .find(|r| r.source_id == query.source_id && r.channel_id == channel.id)
                .map(|route| RouteCandidate { channel, route })
        })
        .collect();

    let deliveries = compute_route(&article, ContentType::Article, &candidates);
    Ok(Json(PreviewResponse { deliveries }))
}

fn synthetic_article(topic_tags: Vec<String>, quality_score: i16) -> Article {
    use nc_domain::{ClassificationStatus, JsonLdValue, RawContent, Relevance};
    use std::collections::BTreeMap;

    Article {
        raw: RawContent {
            id: "preview".to_string(),
            source_id: Uuid::new_v4(),
            url: "https://preview.invalid/article".to_string(),
            source_name: "preview".to_string(),
            title: "preview".to_string(),
            raw_text: String::new(),
            raw_html: String::new(),
            description: None,
            keywords: vec![],
            og: JsonLdValue::default(),
            twitter: JsonLdValue::default(),
            json_ld: JsonLdValue::default(),
            author: None,
            published_date: None,
            canonical_url: None,
            article_section: None,
            crawled_at: chrono::Utc::now(),
            word_count: 0,
            classification_status: ClassificationStatus::Classified,
            meta: BTreeMap::new(),
        },
        topic_tags,
        quality_score,
        crime_sub_type: None,
        relevance: Relevance::Direct,
        review_required: false,
        category: None,
        section: None,
        tags: vec![],
        intro: None,
        byline: None,
    }
}

pub fn routes_router(state: RoutesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_routes, create_route))
        .routes(routes!(get_route, update_route, delete_route))
        .routes(routes!(preview_route))
        .with_state(state)
}
