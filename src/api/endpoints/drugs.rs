//! Drug lookup endpoints.
//!
//! - `GET /api/drugs/search?name=`: RxNorm concept search
//! - `GET /api/drugs/:name`: merged drug record (cached)
//! - `GET /api/drugs/:name/adverse-events?limit=`: OpenFDA reaction counts
//! - `GET /api/drugs/:name/monographs`: DailyMed product labels
//! - `GET /api/monographs/:setid`: one DailyMed label

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::{ApiError, FieldError};
use crate::api::types::{ApiContext, ApiResponse};
use crate::clients::{AdverseEventCount, DrugConcept, SplSummary};
use crate::clinical::DrugInfo;

const DEFAULT_EVENT_LIMIT: u32 = 10;
const MAX_EVENT_LIMIT: u32 = 100;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

/// `GET /api/drugs/search?name=`
pub async fn search(
    State(ctx): State<ApiContext>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<DrugConcept>>>, ApiError> {
    let Query(query) = query?;
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            ApiError::Validation(vec![FieldError::new("name", "Drug name is required")])
        })?;

    let concepts = ctx.clinical.search_drugs(&name).await?;
    Ok(Json(ApiResponse::ok(concepts)))
}

/// `GET /api/drugs/:name`
pub async fn info(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<DrugInfo>>, ApiError> {
    let info = ctx.clinical.get_drug_info(&name).await?;
    Ok(Json(ApiResponse::ok(info.data).cached(info.cached)))
}

#[derive(Deserialize)]
pub struct AdverseEventQuery {
    pub limit: Option<u32>,
}

/// `GET /api/drugs/:name/adverse-events?limit=`
pub async fn adverse_events(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
    query: Result<Query<AdverseEventQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<AdverseEventCount>>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    if !(1..=MAX_EVENT_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(vec![FieldError::new(
            "limit",
            format!("Limit must be between 1 and {MAX_EVENT_LIMIT}"),
        )]));
    }

    let events = ctx.clinical.get_adverse_events(&name, limit).await?;
    Ok(Json(ApiResponse::ok(events)))
}

/// `GET /api/drugs/:name/monographs`
pub async fn monographs(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<SplSummary>>>, ApiError> {
    let spls = ctx.clinical.get_monographs(&name).await?;
    Ok(Json(ApiResponse::ok(spls)))
}

/// `GET /api/monographs/:setid`
pub async fn monograph(
    State(ctx): State<ApiContext>,
    Path(setid): Path<String>,
) -> Result<Json<ApiResponse<SplSummary>>, ApiError> {
    let spl = ctx.clinical.get_monograph(&setid).await?;
    Ok(Json(ApiResponse::ok(spl)))
}
