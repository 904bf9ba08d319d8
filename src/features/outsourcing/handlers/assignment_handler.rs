use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{ActingActor, AppJson};
use crate::features::outsourcing::dtos::{
    CreateAssignmentDto, IssueAccessTokenDto, IssuedAccessTokenDto, RateInspectorDto,
    RespondAssignmentDto,
};
use crate::features::outsourcing::models::{AccessToken, Assignment};
use crate::features::outsourcing::services::{AccessTokenService, AssignmentService};
use crate::shared::types::ApiResponse;

/// Services shared by the authenticated outsourcing routes
#[derive(Clone)]
pub struct OutsourcingState {
    pub assignments: Arc<AssignmentService>,
    pub tokens: Arc<AccessTokenService>,
}

/// Outsource an inspection to an inspector
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/assignments",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = ApiResponse<Assignment>),
        (status = 409, description = "Inspection already has a live assignment")
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn create_assignment(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<ApiResponse<Assignment>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let assignment = state.assignments.create(&actor, id, dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(assignment),
            Some("Assignment created".to_string()),
            None,
        )),
    ))
}

/// Assignment history of an inspection, current first
#[utoipa::path(
    get,
    path = "/api/inspections/{id}/assignments",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Assignments", body = ApiResponse<Vec<Assignment>>)
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn list_assignments(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Assignment>>>> {
    let assignments = state.assignments.list(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(assignments), None, None)))
}

/// Accept or decline an assignment as the assigned inspector
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/respond",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = RespondAssignmentDto,
    responses(
        (status = 200, description = "Response recorded", body = ApiResponse<Assignment>),
        (status = 409, description = "Assignment already answered")
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn respond_to_assignment(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RespondAssignmentDto>,
) -> Result<Json<ApiResponse<Assignment>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let assignment = state
        .assignments
        .respond(&actor, id, dto.try_into()?)
        .await?;
    Ok(Json(ApiResponse::success(Some(assignment), None, None)))
}

/// Mark an accepted assignment completed
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/complete",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment completed", body = ApiResponse<Assignment>)
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn complete_assignment(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Assignment>>> {
    let assignment = state.assignments.complete(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(assignment), None, None)))
}

/// Record that the inspector's fee was paid
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/fee-paid",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Fee marked paid", body = ApiResponse<Assignment>)
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn mark_fee_paid(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Assignment>>> {
    let assignment = state.assignments.mark_fee_paid(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(assignment), None, None)))
}

/// Rate the inspector of a completed assignment
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/rating",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = RateInspectorDto,
    responses(
        (status = 200, description = "Rating recorded", body = ApiResponse<Assignment>),
        (status = 409, description = "Assignment not completed")
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn rate_inspector(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RateInspectorDto>,
) -> Result<Json<ApiResponse<Assignment>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let assignment = state
        .assignments
        .rate_inspector(&actor, id, dto.rating, dto.review)
        .await?;
    Ok(Json(ApiResponse::success(Some(assignment), None, None)))
}

/// Issue a 48-hour access link for the current assignment.
/// Any previous live token for the assignment is revoked.
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/access-tokens",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = IssueAccessTokenDto,
    responses(
        (status = 201, description = "Token issued", body = ApiResponse<IssuedAccessTokenDto>),
        (status = 409, description = "Assignment is not live")
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn issue_access_token(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<IssueAccessTokenDto>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedAccessTokenDto>>)> {
    let issued = state.tokens.issue(&actor, id, dto.assignment_id).await?;
    let link = state.tokens.access_link(&issued.token);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(IssuedAccessTokenDto::new(issued, link)),
            Some("Access token issued".to_string()),
            None,
        )),
    ))
}

/// Tokens issued for an assignment (hashes are never returned)
#[utoipa::path(
    get,
    path = "/api/assignments/{id}/access-tokens",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Issued tokens", body = ApiResponse<Vec<AccessToken>>)
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn list_access_tokens(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AccessToken>>>> {
    let tokens = state.tokens.list(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(tokens), None, None)))
}

/// Revoke an access token
#[utoipa::path(
    post,
    path = "/api/access-tokens/{id}/revoke",
    params(("id" = Uuid, Path, description = "Access token ID")),
    responses(
        (status = 200, description = "Token revoked", body = ApiResponse<AccessToken>),
        (status = 404, description = "Token not found")
    ),
    security(("bearer_auth" = [])),
    tag = "outsourcing"
)]
pub async fn revoke_access_token(
    ActingActor(actor): ActingActor,
    State(state): State<OutsourcingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccessToken>>> {
    let token = state.tokens.revoke(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(token),
        Some("Access token revoked".to_string()),
        None,
    )))
}
