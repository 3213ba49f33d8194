//! `/api/v1/sources` (§4.6, §6): CRUD over crawl targets.

use crate::auth::Authenticated;
use crate::common::SuccessResponse;
use crate::error::{ApiError, Result};
use axum::extract::{Path, Query, State};
use axum::Json;
use nc_domain::{Source, SourceSelectors};
use nc_storage::SourceRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

#[derive(Clone)]
pub struct SourcesState {
    pub repo: Arc<SourceRepository>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSourceRequest {
    pub name: String,
    pub seed_url: String,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub selectors: SourceSelectors,
    pub rate_limit_ms: Option<i64>,
    #[serde(default = "default_max_depth")]
    pub max_depth: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub index_names: Vec<String>,
}

fn default_max_depth() -> i32 {
    3
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSourceRequest {
    pub name: Option<String>,
    pub seed_url: Option<String>,
    pub allowed_domains: Option<Vec<String>>,
    pub selectors: Option<SourceSelectors>,
    pub rate_limit_ms: Option<i64>,
    pub max_depth: Option<i32>,
    pub enabled: Option<bool>,
    pub index_names: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SourcesQuery {
    pub enabled_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SourceListResponse {
    pub data: Vec<Source>,
}

#[utoipa::path(
    get, path = "", tag = "sources",
    params(SourcesQuery),
    responses((status = 200, description = "List sources", body = SourceListResponse))
)]
pub async fn list_sources(
    State(state): State<SourcesState>,
    _auth: Authenticated,
    Query(query): Query<SourcesQuery>,
) -> Result<Json<SourceListResponse>> {
    let data = state.repo.list(query.enabled_only.unwrap_or(false)).await?;
    Ok(Json(SourceListResponse { data }))
}

#[utoipa::path(
    post, path = "", tag = "sources",
    request_body = CreateSourceRequest,
    responses((status = 201, description = "Source created", body = Source))
)]
pub async fn create_source(
    State(state): State<SourcesState>,
    _auth: Authenticated,
    Json(req): Json<CreateSourceRequest>,
) -> Result<Json<Source>> {
    let source = Source {
        id: Uuid::new_v4(),
        name: req.name,
        seed_url: req.seed_url,
        allowed_domains: req.allowed_domains,
        selectors: req.selectors,
        rate_limit_ms: req.rate_limit_ms,
        max_depth: req.max_depth,
        enabled: req.enabled,
        index_names: req.index_names,
    };
    state.repo.insert(&source).await?;
    Ok(Json(source))
}

#[utoipa::path(
    get, path = "/{id}", tag = "sources",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = Source), (status = 404, description = "Source not found"))
)]
pub async fn get_source(
    State(state): State<SourcesState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<Source>> {
    let source = state.repo.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Source", id.to_string()))?;
    Ok(Json(source))
}

#[utoipa::path(
    put, path = "/{id}", tag = "sources",
    params(("id" = Uuid, Path)),
    request_body = UpdateSourceRequest,
    responses((status = 200, body = Source), (status = 404, description = "Source not found"))
)]
pub async fn update_source(
    State(state): State<SourcesState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSourceRequest>,
) -> Result<Json<Source>> {
    let mut source =
        state.repo.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("Source", id.to_string()))?;

    if let Some(name) = req.name {
        source.name = name;
    }
    if let Some(seed_url) = req.seed_url {
        source.seed_url = seed_url;
    }
    if let Some(allowed_domains) = req.allowed_domains {
        source.allowed_domains = allowed_domains;
    }
    if let Some(selectors) = req.selectors {
        source.selectors = selectors;
    }
    if req.rate_limit_ms.is_some() {
        source.rate_limit_ms = req.rate_limit_ms;
    }
    if let Some(max_depth) = req.max_depth {
        source.max_depth = max_depth;
    }
    if let Some(enabled) = req.enabled {
        source.enabled = enabled;
    }
    if let Some(index_names) = req.index_names {
        source.index_names = index_names;
    }

    state.repo.update(&source).await?;
    Ok(Json(source))
}

#[utoipa::path(
    delete, path = "/{id}", tag = "sources",
    params(("id" = Uuid, Path)),
    responses((status = 200, body = SuccessResponse), (status = 404, description = "Source not found"))
)]
pub async fn delete_source(
    State(state): State<SourcesState>,
    _auth: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    state.repo.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub fn sources_router(state: SourcesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_sources, create_source))
        .routes(routes!(get_source, update_source, delete_source))
        .with_state(state)
}
