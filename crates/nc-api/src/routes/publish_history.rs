//! `/api/v1/publish-history` (§4.6, §6): read-only view over delivery
//! records, plus an operator escape hatch to clear the table (e.g. after
//! a routing-table bug delivered a batch of articles that must be
//! re-published once fixed).

use crate::auth::Authenticated;
use crate::common::{DeletedResponse, ListParams, PaginatedResponse};
use crate::error::Result;
use axum::extract::{Path, Query, State};
use axum::Json;
use nc_domain::PublishHistoryItem;
use nc_storage::PublishHistoryRepository;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Clone)]
pub struct PublishHistoryState {
    pub repo: Arc<PublishHistoryRepository>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublishHistoryQuery {
    pub channel_name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get, path = "", tag = "publish-history",
    params(PublishHistoryQuery),
    responses((status = 200, body = PaginatedResponse<PublishHistoryItem>))
)]
pub async fn list_publish_history(
    State(state): State<PublishHistoryState>,
    _auth: Authenticated,
    Query(query): Query<PublishHistoryQuery>,
) -> Result<Json<PaginatedResponse<PublishHistoryItem>>> {
    let channel_name = crate::common::normalize_filter(query.channel_name);
    let params = ListParams { limit: query.limit, offset: query.offset };
    let data = state.repo.list(channel_name.as_deref(), params.limit(), params.offset()).await?;
    // publish_history has no cheap total count query beyond per-channel/all
    // `count_since`; a page-sized total avoids a second full-table scan per
    // request and still tells the caller whether more pages may exist.
    let total = data.len() as i64 + params.offset();
    Ok(Json(PaginatedResponse::new(data, &params, total)))
}

#[utoipa::path(
    get, path = "/{article_id}", tag = "publish-history",
    params(("article_id" = String, Path)),
    responses((status = 200, body = Vec<PublishHistoryItem>))
)]
pub async fn get_publish_history_for_article(
    State(state): State<PublishHistoryState>,
    _auth: Authenticated,
    Path(article_id): Path<String>,
) -> Result<Json<Vec<PublishHistoryItem>>> {
    let data = state.repo.find_for_article(&article_id).await?;
    Ok(Json(data))
}

#[utoipa::path(
    delete, path = "", tag = "publish-history",
    responses((status = 200, body = DeletedResponse))
)]
pub async fn clear_publish_history(
    State(state): State<PublishHistoryState>,
    _auth: Authenticated,
) -> Result<Json<DeletedResponse>> {
    let deleted = state.repo.delete_all().await?;
    Ok(Json(DeletedResponse { deleted }))
}

pub fn publish_history_router(state: PublishHistoryState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_publish_history, clear_publish_history))
        .routes(routes!(get_publish_history_for_article))
        .with_state(state)
}
