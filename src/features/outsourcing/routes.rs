use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::features::outsourcing::handlers::{self, OutsourcingState};
use crate::features::outsourcing::services::ExternalInspectionService;
use crate::shared::constants::EVIDENCE_BODY_LIMIT;

/// Create routes for assignments and access-token management
///
/// Note: This feature requires authentication
pub fn routes(state: OutsourcingState) -> Router {
    Router::new()
        .route(
            "/api/inspections/{id}/assignments",
            post(handlers::create_assignment).get(handlers::list_assignments),
        )
        .route(
            "/api/assignments/{id}/respond",
            post(handlers::respond_to_assignment),
        )
        .route(
            "/api/assignments/{id}/complete",
            post(handlers::complete_assignment),
        )
        .route(
            "/api/assignments/{id}/fee-paid",
            post(handlers::mark_fee_paid),
        )
        .route("/api/assignments/{id}/rating", post(handlers::rate_inspector))
        .route(
            "/api/inspections/{id}/access-tokens",
            post(handlers::issue_access_token),
        )
        .route(
            "/api/assignments/{id}/access-tokens",
            get(handlers::list_access_tokens),
        )
        .route(
            "/api/access-tokens/{id}/revoke",
            post(handlers::revoke_access_token),
        )
        .with_state(state)
}

/// Create routes for external inspectors holding an access link
///
/// Note: The access token in the path is the only credential
pub fn access_routes(service: Arc<ExternalInspectionService>) -> Router {
    Router::new()
        .route("/api/access/{token}", get(handlers::view_access))
        .route(
            "/api/access/{token}/respond",
            post(handlers::respond_via_access),
        )
        .route("/api/access/{token}/start", post(handlers::start_via_access))
        .route(
            "/api/access/{token}/items/{item_id}",
            put(handlers::rate_item_via_access),
        )
        .route(
            "/api/access/{token}/rooms/{room_id}/complete",
            post(handlers::complete_room_via_access),
        )
        .route(
            "/api/access/{token}/images",
            post(handlers::upload_image_via_access)
                .layer(DefaultBodyLimit::max(EVIDENCE_BODY_LIMIT)),
        )
        .route(
            "/api/access/{token}/voice-notes",
            post(handlers::upload_voice_note_via_access)
                .layer(DefaultBodyLimit::max(EVIDENCE_BODY_LIMIT)),
        )
        .route(
            "/api/access/{token}/submit",
            post(handlers::submit_via_access),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{InspectionType, ScheduleInspection};
    use crate::features::inspections::services::{InspectionService, LifecycleService};
    use crate::features::outsourcing::services::{AccessTokenService, AssignmentService};
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::test_helpers::{create_user, owner, store_with_property, with_user};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;
    use uuid::Uuid;

    async fn app() -> (Router, Uuid) {
        let (store, property_id) = store_with_property().await;
        let inspections = Arc::new(InspectionService::new(
            store.clone(),
            Arc::new(MemoryEvidenceStorage::new()),
        ));
        let lifecycle = Arc::new(LifecycleService::new(store.clone()));
        let assignments = Arc::new(AssignmentService::new(store.clone()));
        let tokens = Arc::new(AccessTokenService::new(
            store.clone(),
            "https://app.example.com",
        ));
        let inspection = inspections
            .schedule(
                &owner(),
                ScheduleInspection {
                    property_id,
                    tenancy_id: None,
                    inspector_id: None,
                    inspection_type: InspectionType::Routine,
                    scheduled_date: "2026-03-14".to_string(),
                    scheduled_time: None,
                    compare_to_inspection_id: None,
                },
            )
            .await
            .unwrap();

        let external = Arc::new(ExternalInspectionService::new(
            store,
            tokens.clone(),
            assignments.clone(),
            inspections,
            lifecycle,
        ));
        let authenticated = with_user(
            routes(OutsourcingState {
                assignments,
                tokens,
            }),
            create_user("owner-1", &["owner"]),
        );
        (authenticated.merge(access_routes(external)), inspection.id)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_outsource_and_open_access_link() {
        let (app, inspection_id) = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/inspections/{}/assignments", inspection_id),
                serde_json::json!({
                    "inspector_id": "pro-1",
                    "inspector_email": "Pro@Example.com",
                    "proposed_date": "2026-03-14"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["data"]["inspector_email"], "pro@example.com");
        let assignment_id = body["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/inspections/{}/access-tokens", inspection_id),
                serde_json::json!({ "assignment_id": assignment_id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 32);
        assert_eq!(
            body["data"]["access_link"],
            format!("https://app.example.com/inspect/{}", token)
        );
        assert!(body["data"]["record"].get("token_hash").is_none());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/access/{}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["inspection"]["inspection"]["is_outsourced"], true);

        let response = app
            .oneshot(post_json(
                &format!("/api/access/{}/respond", token),
                serde_json::json!({
                    "accept": true,
                    "confirmed_date": "2026-03-14",
                    "confirmed_time": "09:30:00"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["accepted"], true);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/access/{}", "0".repeat(32)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
