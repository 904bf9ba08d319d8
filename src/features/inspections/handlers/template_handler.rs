use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::InspectionState;
use crate::core::error::{AppError, Result};
use crate::core::extractor::{ActingActor, AppJson};
use crate::features::inspections::dtos::CreateTemplateDto;
use crate::features::inspections::models::{Template, TemplateWithRooms};
use crate::shared::types::ApiResponse;

/// Author a room/item template
#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = CreateTemplateDto,
    responses(
        (status = 201, description = "Template created", body = ApiResponse<TemplateWithRooms>),
        (status = 400, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "templates"
)]
pub async fn create_template(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    AppJson(dto): AppJson<CreateTemplateDto>,
) -> Result<(StatusCode, Json<ApiResponse<TemplateWithRooms>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let template = state
        .templates
        .create(&actor, &dto.name, dto.description, dto.rooms)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(template),
            Some("Template created".to_string()),
            None,
        )),
    ))
}

/// List system templates and the caller's own
#[utoipa::path(
    get,
    path = "/api/templates",
    responses(
        (status = 200, description = "Available templates", body = ApiResponse<Vec<Template>>)
    ),
    security(("bearer_auth" = [])),
    tag = "templates"
)]
pub async fn list_templates(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
) -> Result<Json<ApiResponse<Vec<Template>>>> {
    let templates = state.templates.list(&actor).await?;
    Ok(Json(ApiResponse::success(Some(templates), None, None)))
}

/// Get a template with its rooms
#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template found", body = ApiResponse<TemplateWithRooms>),
        (status = 404, description = "Template not found")
    ),
    security(("bearer_auth" = [])),
    tag = "templates"
)]
pub async fn get_template(
    ActingActor(actor): ActingActor,
    State(state): State<InspectionState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TemplateWithRooms>>> {
    let template = state.templates.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(template), None, None)))
}
