use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::inspections::dtos::{
    CompleteInspectionDto, CompleteRoomDto, EvidenceForm, RateItemDto, UploadEvidenceDto,
};
use crate::features::inspections::models::{Inspection, InspectionImage, Item, Room, VoiceNote};
use crate::features::outsourcing::dtos::{ExternalInspectionDto, RespondAssignmentDto};
use crate::features::outsourcing::models::Assignment;
use crate::features::outsourcing::services::ExternalInspectionService;
use crate::shared::types::ApiResponse;

/// Open the inspection behind an access link
#[utoipa::path(
    get,
    path = "/api/access/{token}",
    params(("token" = String, Path, description = "Access token from the emailed link")),
    responses(
        (status = 200, description = "Assignment and inspection", body = ApiResponse<ExternalInspectionDto>),
        (status = 401, description = "Invalid or expired access token")
    ),
    tag = "external"
)]
pub async fn view_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<ExternalInspectionDto>>> {
    let (assignment, inspection) = service.view(&token).await?;
    Ok(Json(ApiResponse::success(
        Some(ExternalInspectionDto {
            assignment,
            inspection,
        }),
        None,
        None,
    )))
}

/// Accept or decline the assignment
#[utoipa::path(
    post,
    path = "/api/access/{token}/respond",
    params(("token" = String, Path, description = "Access token")),
    request_body = RespondAssignmentDto,
    responses(
        (status = 200, description = "Response recorded", body = ApiResponse<Assignment>),
        (status = 401, description = "Invalid or expired access token")
    ),
    tag = "external"
)]
pub async fn respond_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
    AppJson(dto): AppJson<RespondAssignmentDto>,
) -> Result<Json<ApiResponse<Assignment>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let assignment = service.respond(&token, dto.try_into()?).await?;
    Ok(Json(ApiResponse::success(Some(assignment), None, None)))
}

/// Start the inspection
#[utoipa::path(
    post,
    path = "/api/access/{token}/start",
    params(("token" = String, Path, description = "Access token")),
    responses(
        (status = 200, description = "Inspection started", body = ApiResponse<Inspection>),
        (status = 409, description = "Assignment not accepted")
    ),
    tag = "external"
)]
pub async fn start_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<Inspection>>> {
    let inspection = service.start(&token).await?;
    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}

/// Rate an item
#[utoipa::path(
    put,
    path = "/api/access/{token}/items/{item_id}",
    params(
        ("token" = String, Path, description = "Access token"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    request_body = RateItemDto,
    responses(
        (status = 200, description = "Item rated", body = ApiResponse<Item>)
    ),
    tag = "external"
)]
pub async fn rate_item_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path((token, item_id)): Path<(String, Uuid)>,
    AppJson(dto): AppJson<RateItemDto>,
) -> Result<Json<ApiResponse<Item>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let item = service.rate_item(&token, item_id, dto.into()).await?;
    Ok(Json(ApiResponse::success(Some(item), None, None)))
}

/// Complete a room
#[utoipa::path(
    post,
    path = "/api/access/{token}/rooms/{room_id}/complete",
    params(
        ("token" = String, Path, description = "Access token"),
        ("room_id" = Uuid, Path, description = "Room ID")
    ),
    request_body = CompleteRoomDto,
    responses(
        (status = 200, description = "Room completed", body = ApiResponse<Room>)
    ),
    tag = "external"
)]
pub async fn complete_room_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path((token, room_id)): Path<(String, Uuid)>,
    AppJson(dto): AppJson<CompleteRoomDto>,
) -> Result<Json<ApiResponse<Room>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let room = service
        .complete_room(&token, room_id, dto.overall_condition, dto.notes)
        .await?;
    Ok(Json(ApiResponse::success(Some(room), None, None)))
}

/// Upload a photo
#[utoipa::path(
    post,
    path = "/api/access/{token}/images",
    params(("token" = String, Path, description = "Access token")),
    request_body(content = UploadEvidenceDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo stored", body = ApiResponse<InspectionImage>)
    ),
    tag = "external"
)]
pub async fn upload_image_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<InspectionImage>>)> {
    let form = EvidenceForm::read(multipart).await?;
    let metadata = form.image_metadata()?;
    let image = service
        .upload_image(&token, form.data, &form.content_type, metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(image), None, None)),
    ))
}

/// Upload a voice note
#[utoipa::path(
    post,
    path = "/api/access/{token}/voice-notes",
    params(("token" = String, Path, description = "Access token")),
    request_body(content = UploadEvidenceDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Voice note stored", body = ApiResponse<VoiceNote>)
    ),
    tag = "external"
)]
pub async fn upload_voice_note_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<VoiceNote>>)> {
    let form = EvidenceForm::read(multipart).await?;
    let metadata = form.voice_metadata()?;
    let note = service
        .upload_voice_note(&token, form.data, &form.content_type, metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(note), None, None)),
    ))
}

/// Submit the finished inspection. The access link stops working afterwards.
#[utoipa::path(
    post,
    path = "/api/access/{token}/submit",
    params(("token" = String, Path, description = "Access token")),
    request_body = CompleteInspectionDto,
    responses(
        (status = 200, description = "Inspection submitted", body = ApiResponse<Inspection>),
        (status = 401, description = "Invalid or expired access token")
    ),
    tag = "external"
)]
pub async fn submit_via_access(
    State(service): State<Arc<ExternalInspectionService>>,
    Path(token): Path<String>,
    AppJson(dto): AppJson<CompleteInspectionDto>,
) -> Result<Json<ApiResponse<Inspection>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let inspection = service.submit(&token, dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(inspection),
        Some("Inspection submitted".to_string()),
        None,
    )))
}
