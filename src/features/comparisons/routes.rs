use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::comparisons::handlers;
use crate::features::comparisons::services::ComparisonService;

/// Create routes for entry/exit comparisons
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<ComparisonService>) -> Router {
    Router::new()
        .route(
            "/api/inspections/{id}/comparisons",
            post(handlers::run_comparison).get(handlers::list_comparisons),
        )
        .route("/api/comparisons/{id}", get(handlers::get_comparison))
        .route("/api/issues/{id}/decision", put(handlers::decide_issue))
        .with_state(service)
}
