use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::features::inspections::handlers::{self, InspectionState};
use crate::shared::constants::EVIDENCE_BODY_LIMIT;

/// Create routes for inspections and templates
///
/// Note: This feature requires authentication
pub fn routes(state: InspectionState) -> Router {
    Router::new()
        .route(
            "/api/inspections",
            post(handlers::schedule_inspection).get(handlers::list_inspections),
        )
        .route("/api/inspections/{id}", get(handlers::get_inspection))
        .route("/api/inspections/{id}/rooms", post(handlers::add_room))
        .route(
            "/api/inspections/{id}/rooms/expand",
            post(handlers::expand_rooms),
        )
        .route("/api/inspections/{id}/rooms/seed", post(handlers::seed_rooms))
        .route(
            "/api/inspections/{id}/rooms/{room_id}/complete",
            post(handlers::complete_room),
        )
        .route(
            "/api/inspections/{id}/items/{item_id}",
            put(handlers::rate_item),
        )
        .route(
            "/api/inspections/{id}/images",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(EVIDENCE_BODY_LIMIT)),
        )
        .route(
            "/api/inspections/{id}/voice-notes",
            post(handlers::upload_voice_note).layer(DefaultBodyLimit::max(EVIDENCE_BODY_LIMIT)),
        )
        .route(
            "/api/inspections/{id}/voice-notes/{note_id}/transcript",
            put(handlers::set_transcript),
        )
        .route("/api/inspections/{id}/report", put(handlers::attach_report))
        .route("/api/inspections/{id}/start", post(handlers::start_inspection))
        .route(
            "/api/inspections/{id}/complete",
            post(handlers::complete_inspection),
        )
        .route(
            "/api/inspections/{id}/tenant-review",
            post(handlers::send_for_tenant_review),
        )
        .route(
            "/api/inspections/{id}/acknowledge",
            post(handlers::acknowledge_inspection),
        )
        .route(
            "/api/inspections/{id}/dispute",
            post(handlers::dispute_inspection),
        )
        .route(
            "/api/inspections/{id}/finalize",
            post(handlers::finalize_inspection),
        )
        .route(
            "/api/inspections/{id}/cancel",
            post(handlers::cancel_inspection),
        )
        .route("/api/inspections/{id}/sign", post(handlers::sign_inspection))
        .route(
            "/api/templates",
            post(handlers::create_template).get(handlers::list_templates),
        )
        .route("/api/templates/{id}", get(handlers::get_template))
        .with_state(state)
}
