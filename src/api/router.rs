//! API router.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Access logger

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router over a shared context.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let interactions = Router::new()
        .route("/check", post(endpoints::drug_interactions::check))
        .route("/check-pair", post(endpoints::drug_interactions::check_pair))
        .route(
            "/duplications",
            post(endpoints::drug_interactions::duplications),
        )
        .route(
            "/contraindications",
            post(endpoints::drug_interactions::contraindications),
        )
        .route(
            "/clinical-review",
            post(endpoints::drug_interactions::clinical_review),
        )
        .route(
            "/severity-levels",
            get(endpoints::drug_interactions::severity_levels),
        );

    let drugs = Router::new()
        .route("/search", get(endpoints::drugs::search))
        .route("/:name", get(endpoints::drugs::info))
        .route(
            "/:name/adverse-events",
            get(endpoints::drugs::adverse_events),
        )
        .route("/:name/monographs", get(endpoints::drugs::monographs));

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/cache/stats", get(endpoints::cache::stats))
        .route("/cache", delete(endpoints::cache::clear))
        .route("/monographs/:setid", get(endpoints::drugs::monograph))
        .nest("/drug-interactions", interactions)
        .nest("/drugs", drugs)
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(cors)
}
