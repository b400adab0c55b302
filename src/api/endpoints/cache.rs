//! Cache administration endpoints.

use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, ApiResponse};
use crate::clinical::ClinicalCacheStats;

/// `GET /api/cache/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> Json<ApiResponse<ClinicalCacheStats>> {
    Json(ApiResponse::ok(ctx.clinical.cache_stats()))
}

/// `DELETE /api/cache`: drop every cached drug record and interaction result.
pub async fn clear(State(ctx): State<ApiContext>) -> Json<ApiResponse<ClinicalCacheStats>> {
    ctx.clinical.clear_cache();
    Json(ApiResponse::with_message(
        ctx.clinical.cache_stats(),
        "Cache cleared",
    ))
}
