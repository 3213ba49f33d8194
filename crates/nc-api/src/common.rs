//! Pagination and response envelope types shared by every resource route.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;

/// `?limit&offset` query params (§4.6: "Pagination is server-side
/// (limit/offset, total)").
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &ListParams, total: i64) -> Self {
        Self { data, limit: params.limit(), offset: params.offset(), total }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: uuid::Uuid,
}

impl CreatedResponse {
    pub fn new(id: uuid::Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: u64,
}

/// Normalizes a free-text filter (§4.6: "Filters are normalized; empty
/// strings and nulls dropped before caching/query-key derivation").
pub fn normalize_filter(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_defaults() {
        let params = ListParams::default();
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn list_params_clamps_excessive_limit() {
        let params = ListParams { limit: Some(10_000), offset: Some(-5) };
        assert_eq!(params.limit(), 200);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn normalize_filter_drops_blank_strings() {
        assert_eq!(normalize_filter(Some("  ".to_string())), None);
        assert_eq!(normalize_filter(Some(" business ".to_string())), Some("business".to_string()));
        assert_eq!(normalize_filter(None), None);
    }
}
