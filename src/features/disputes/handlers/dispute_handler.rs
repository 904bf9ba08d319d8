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
use crate::features::disputes::dtos::{ItemDisputeDto, RespondDisputeDto};
use crate::features::disputes::models::ItemDispute;
use crate::features::disputes::services::DisputeService;
use crate::shared::types::ApiResponse;

/// Raise another item dispute on a disputed inspection
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/disputes",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = ItemDisputeDto,
    responses(
        (status = 201, description = "Dispute raised", body = ApiResponse<ItemDispute>),
        (status = 409, description = "Inspection is not disputed")
    ),
    security(("bearer_auth" = [])),
    tag = "disputes"
)]
pub async fn raise_dispute(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<DisputeService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ItemDisputeDto>,
) -> Result<(StatusCode, Json<ApiResponse<ItemDispute>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let dispute = service.raise(&actor, id, dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(dispute),
            Some("Dispute raised".to_string()),
            None,
        )),
    ))
}

/// Item disputes of an inspection
#[utoipa::path(
    get,
    path = "/api/inspections/{id}/disputes",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Disputes", body = ApiResponse<Vec<ItemDispute>>)
    ),
    security(("bearer_auth" = [])),
    tag = "disputes"
)]
pub async fn list_disputes(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<DisputeService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ItemDispute>>>> {
    let disputes = service.list(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(disputes), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Dispute found", body = ApiResponse<ItemDispute>),
        (status = 404, description = "Dispute not found")
    ),
    security(("bearer_auth" = [])),
    tag = "disputes"
)]
pub async fn get_dispute(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<DisputeService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ItemDispute>>> {
    let dispute = service.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(dispute), None, None)))
}

/// Respond to a dispute, optionally resolving it with a corrected condition
#[utoipa::path(
    post,
    path = "/api/disputes/{id}/respond",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = RespondDisputeDto,
    responses(
        (status = 200, description = "Response recorded", body = ApiResponse<ItemDispute>),
        (status = 409, description = "Dispute already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "disputes"
)]
pub async fn respond_to_dispute(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<DisputeService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RespondDisputeDto>,
) -> Result<Json<ApiResponse<ItemDispute>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let dispute = service
        .respond(&actor, id, &dto.response, dto.resolved_condition)
        .await?;
    Ok(Json(ApiResponse::success(Some(dispute), None, None)))
}
