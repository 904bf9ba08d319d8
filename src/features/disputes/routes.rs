use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::disputes::handlers;
use crate::features::disputes::services::DisputeService;

/// Create routes for item disputes
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<DisputeService>) -> Router {
    Router::new()
        .route(
            "/api/inspections/{id}/disputes",
            post(handlers::raise_dispute).get(handlers::list_disputes),
        )
        .route("/api/disputes/{id}", get(handlers::get_dispute))
        .route(
            "/api/disputes/{id}/respond",
            post(handlers::respond_to_dispute),
        )
        .with_state(service)
}
