use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{ActingActor, AppJson};
use crate::features::comparisons::services::ComparisonService;
use crate::features::inspections::dtos::{
    AcknowledgeDto, AddRoomDto, AttachReportDto, CompleteInspectionDto, CompleteRoomDto,
    DisputeInspectionDto, DisputeOutcomeDto, EvidenceForm, ExpandRoomsDto, PropertyFilter,
    RateItemDto, ScheduleInspectionDto, SetTranscriptDto, SignInspectionDto, UploadEvidenceDto,
};
use crate::features::inspections::models::{
    Inspection, InspectionImage, Item, Room, RoomBlueprint, RoomWithItems, VoiceNote,
};
use crate::features::inspections::services::{
    InspectionDetail, InspectionService, LifecycleService, TemplateService,
};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Services shared by the inspection routes
#[derive(Clone)]
pub struct InspectionState {
    pub inspections: Arc<InspectionService>,
    pub lifecycle: Arc<LifecycleService>,
    pub templates: Arc<TemplateService>,
    pub comparisons: Arc<ComparisonService>,
}

/// Schedule an inspection
#[utoipa::path(
    post,
    path = "/api/inspections",
    request_body = ScheduleInspectionDto,
    responses(
        (status = 201, description = "Inspection scheduled", body = ApiResponse<InspectionDetail>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Actor may not schedule inspections")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn schedule_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    AppJson(dto): AppJson<ScheduleInspectionDto>,
) -> Result<(StatusCode, Json<ApiResponse<InspectionDetail>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let template_id = dto.template_id;
    let inspection = state.inspections.schedule(&actor, dto.into()).await?;
    if let Some(template_id) = template_id {
        state
            .templates
            .apply(&actor, &state.inspections, template_id, inspection.id)
            .await?;
    }
    let detail = state.inspections.get_detail(&actor, inspection.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(detail),
            Some("Inspection scheduled".to_string()),
            None,
        )),
    ))
}

/// List a property's inspections, newest first
#[utoipa::path(
    get,
    path = "/api/inspections",
    params(PropertyFilter, PaginationQuery),
    responses(
        (status = 200, description = "Inspections for the property", body = ApiResponse<Vec<Inspection>>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn list_inspections(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Query(filter): Query<PropertyFilter>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<Inspection>>>> {
    let (inspections, total) = state
        .inspections
        .list_by_property(&actor, filter.property_id, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::success(
        Some(inspections),
        None,
        Some(Meta { total }),
    )))
}

/// Get an inspection with its rooms, items and evidence
#[utoipa::path(
    get,
    path = "/api/inspections/{id}",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection found", body = ApiResponse<InspectionDetail>),
        (status = 404, description = "Inspection not found")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn get_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InspectionDetail>>> {
    let detail = state.inspections.get_detail(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(detail), None, None)))
}

/// Expand a template or inline room blueprints into the inspection
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/rooms/expand",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = ExpandRoomsDto,
    responses(
        (status = 201, description = "Rooms created", body = ApiResponse<Vec<RoomWithItems>>),
        (status = 400, description = "Neither a template nor rooms were given")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn expand_rooms(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ExpandRoomsDto>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<RoomWithItems>>>)> {
    let rooms = match dto.template_id {
        Some(template_id) => {
            state
                .templates
                .apply(&actor, &state.inspections, template_id, id)
                .await?
        }
        None if !dto.rooms.is_empty() => {
            state
                .inspections
                .expand_template(&actor, id, &dto.rooms)
                .await?
        }
        None => {
            return Err(AppError::Validation(
                "Either template_id or rooms is required".to_string(),
            ))
        }
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(rooms), None, None)),
    ))
}

/// Copy the room/item layout of the compared entry inspection
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/rooms/seed",
    params(("id" = Uuid, Path, description = "Exit inspection ID")),
    responses(
        (status = 201, description = "Rooms seeded from the entry inspection", body = ApiResponse<Vec<RoomWithItems>>),
        (status = 400, description = "Inspection has no compared entry inspection")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn seed_rooms(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<RoomWithItems>>>)> {
    let rooms = state.inspections.seed_from_compared(&actor, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(rooms), None, None)),
    ))
}

/// Add a single ad-hoc room
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/rooms",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = AddRoomDto,
    responses(
        (status = 201, description = "Room added", body = ApiResponse<RoomWithItems>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn add_room(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<AddRoomDto>,
) -> Result<(StatusCode, Json<ApiResponse<RoomWithItems>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let blueprint = RoomBlueprint {
        name: dto.name,
        items: dto.items,
    };
    let room = state.inspections.add_room(&actor, id, blueprint).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(room), None, None)),
    ))
}

/// Rate a checklist item
#[utoipa::path(
    put,
    path = "/api/inspections/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Inspection ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    request_body = RateItemDto,
    responses(
        (status = 200, description = "Item rated", body = ApiResponse<Item>),
        (status = 404, description = "Item not found in this inspection")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn rate_item(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<RateItemDto>,
) -> Result<Json<ApiResponse<Item>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let item = state
        .inspections
        .rate_item(&actor, id, item_id, dto.into())
        .await?;
    Ok(Json(ApiResponse::success(Some(item), None, None)))
}

/// Mark a room as completed
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/rooms/{room_id}/complete",
    params(
        ("id" = Uuid, Path, description = "Inspection ID"),
        ("room_id" = Uuid, Path, description = "Room ID")
    ),
    request_body = CompleteRoomDto,
    responses(
        (status = 200, description = "Room completed", body = ApiResponse<Room>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn complete_room(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path((id, room_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<CompleteRoomDto>,
) -> Result<Json<ApiResponse<Room>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let room = state
        .inspections
        .complete_room(&actor, id, room_id, dto.overall_condition, dto.notes)
        .await?;
    Ok(Json(ApiResponse::success(Some(room), None, None)))
}

/// Upload a photo
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/images",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body(content = UploadEvidenceDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo stored", body = ApiResponse<InspectionImage>),
        (status = 400, description = "Missing file or unsupported content type")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn upload_image(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<InspectionImage>>)> {
    let form = EvidenceForm::read(multipart).await?;
    let metadata = form.image_metadata()?;
    let image = state
        .inspections
        .upload_image(&actor, id, form.data, &form.content_type, metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(image), None, None)),
    ))
}

/// Upload a voice note
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/voice-notes",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body(content = UploadEvidenceDto, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Voice note stored", body = ApiResponse<VoiceNote>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn upload_voice_note(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<VoiceNote>>)> {
    let form = EvidenceForm::read(multipart).await?;
    let metadata = form.voice_metadata()?;
    let note = state
        .inspections
        .upload_voice_note(&actor, id, form.data, &form.content_type, metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(note), None, None)),
    ))
}

/// Store the transcript of a voice note
#[utoipa::path(
    put,
    path = "/api/inspections/{id}/voice-notes/{note_id}/transcript",
    params(
        ("id" = Uuid, Path, description = "Inspection ID"),
        ("note_id" = Uuid, Path, description = "Voice note ID")
    ),
    request_body = SetTranscriptDto,
    responses(
        (status = 200, description = "Transcript stored", body = ApiResponse<VoiceNote>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn set_transcript(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<SetTranscriptDto>,
) -> Result<Json<ApiResponse<VoiceNote>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let note = state
        .inspections
        .set_transcript(&actor, id, note_id, &dto.transcript)
        .await?;
    Ok(Json(ApiResponse::success(Some(note), None, None)))
}

/// Attach the rendered report document
#[utoipa::path(
    put,
    path = "/api/inspections/{id}/report",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = AttachReportDto,
    responses(
        (status = 200, description = "Report attached", body = ApiResponse<Inspection>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn attach_report(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<AttachReportDto>,
) -> Result<Json<ApiResponse<Inspection>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let inspection = state
        .inspections
        .attach_report(&actor, id, &dto.report_url)
        .await?;
    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}

/// Start an inspection (scheduled -> in_progress)
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/start",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection started", body = ApiResponse<Inspection>),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn start_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>> {
    let inspection = state.lifecycle.start(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(inspection),
        Some("Inspection started".to_string()),
        None,
    )))
}

/// Complete an inspection (in_progress -> completed)
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/complete",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = CompleteInspectionDto,
    responses(
        (status = 200, description = "Inspection completed", body = ApiResponse<Inspection>),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn complete_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CompleteInspectionDto>,
) -> Result<Json<ApiResponse<Inspection>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let inspection = state.lifecycle.complete(&actor, id, dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(inspection),
        Some("Inspection completed".to_string()),
        None,
    )))
}

/// Send a completed inspection to the tenant for review.
/// For an exit inspection this also starts the comparison against its entry inspection.
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/tenant-review",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Sent for tenant review", body = ApiResponse<Inspection>),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn send_for_tenant_review(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>> {
    let inspection = state.lifecycle.send_for_tenant_review(&actor, id).await?;

    // Exit inspections get their entry comparison started alongside the review
    if inspection.is_exit() && inspection.compare_to_inspection_id.is_some() {
        match state.comparisons.claim(&actor, inspection.id, false).await {
            Ok(run) => {
                let worker = Arc::clone(&state.comparisons);
                tokio::spawn(async move {
                    worker.execute(run).await;
                });
            }
            Err(e) => tracing::warn!(
                "Comparison not started for inspection {}: {}",
                inspection.id,
                e
            ),
        }
    }

    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}

/// Tenant acknowledges the inspection with a signature
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/acknowledge",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = AcknowledgeDto,
    responses(
        (status = 200, description = "Inspection acknowledged", body = ApiResponse<Inspection>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn acknowledge_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<AcknowledgeDto>,
) -> Result<Json<ApiResponse<Inspection>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let inspection = state
        .lifecycle
        .acknowledge(&actor, id, &dto.signature_url)
        .await?;
    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}

/// Tenant disputes the inspection, optionally per item
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/dispute",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = DisputeInspectionDto,
    responses(
        (status = 200, description = "Inspection disputed", body = ApiResponse<DisputeOutcomeDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn dispute_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<DisputeInspectionDto>,
) -> Result<Json<ApiResponse<DisputeOutcomeDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let items = dto.items.into_iter().map(Into::into).collect();
    let (inspection, disputes) = state.lifecycle.dispute(&actor, id, &dto.text, items).await?;
    Ok(Json(ApiResponse::success(
        Some(DisputeOutcomeDto {
            inspection,
            disputes,
        }),
        None,
        None,
    )))
}

/// Finalize the inspection
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/finalize",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection finalized", body = ApiResponse<Inspection>),
        (status = 409, description = "Unresolved disputes or invalid transition")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn finalize_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>> {
    let inspection = state.lifecycle.finalize(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(inspection),
        Some("Inspection finalized".to_string()),
        None,
    )))
}

/// Cancel the inspection
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/cancel",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection cancelled", body = ApiResponse<Inspection>),
        (status = 409, description = "Inspection is already terminal")
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn cancel_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>> {
    let inspection = state.lifecycle.cancel(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}

/// Record an owner or tenant signature
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/sign",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = SignInspectionDto,
    responses(
        (status = 200, description = "Signature recorded", body = ApiResponse<Inspection>)
    ),
    security(("bearer_auth" = [])),
    tag = "inspections"
)]
pub async fn sign_inspection(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<SignInspectionDto>,
) -> Result<Json<ApiResponse<Inspection>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let inspection = state
        .lifecycle
        .sign(&actor, id, dto.role.into(), &dto.signature_url)
        .await?;
    Ok(Json(ApiResponse::success(Some(inspection), None, None)))
}
