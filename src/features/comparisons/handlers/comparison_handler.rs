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
use crate::features::comparisons::dtos::{DecideIssueDto, RunComparisonDto};
use crate::features::comparisons::models::AiComparison;
use crate::features::comparisons::services::{ComparisonDetail, ComparisonService};
use crate::shared::types::ApiResponse;

/// Compare an exit inspection against its entry inspection.
///
/// Returns 202 with the claimed run and classifies in the background,
/// unless `wait` is set.
#[utoipa::path(
    post,
    path = "/api/inspections/{id}/comparisons",
    params(("id" = Uuid, Path, description = "Exit inspection ID")),
    request_body = RunComparisonDto,
    responses(
        (status = 202, description = "Comparison started", body = ApiResponse<AiComparison>),
        (status = 200, description = "Comparison finished (wait = true)", body = ApiResponse<AiComparison>),
        (status = 409, description = "A run is already in progress")
    ),
    security(("bearer_auth" = [])),
    tag = "comparisons"
)]
pub async fn run_comparison(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<ComparisonService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<RunComparisonDto>,
) -> Result<(StatusCode, Json<ApiResponse<AiComparison>>)> {
    if dto.wait {
        let comparison = service.run(&actor, id, dto.reset_overrides).await?;
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::success(Some(comparison), None, None)),
        ));
    }

    let run = service.claim(&actor, id, dto.reset_overrides).await?;
    let claimed = run.comparison.clone();
    let worker = Arc::clone(&service);
    tokio::spawn(async move {
        worker.execute(run).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            Some(claimed),
            Some("Comparison started".to_string()),
            None,
        )),
    ))
}

/// Comparisons run for an exit inspection
#[utoipa::path(
    get,
    path = "/api/inspections/{id}/comparisons",
    params(("id" = Uuid, Path, description = "Exit inspection ID")),
    responses(
        (status = 200, description = "Comparisons", body = ApiResponse<Vec<AiComparison>>)
    ),
    security(("bearer_auth" = [])),
    tag = "comparisons"
)]
pub async fn list_comparisons(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<ComparisonService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AiComparison>>>> {
    let comparisons = service.list(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(comparisons), None, None)))
}

/// Get a comparison with its issues
#[utoipa::path(
    get,
    path = "/api/comparisons/{id}",
    params(("id" = Uuid, Path, description = "Comparison ID")),
    responses(
        (status = 200, description = "Comparison found", body = ApiResponse<ComparisonDetail>),
        (status = 404, description = "Comparison not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comparisons"
)]
pub async fn get_comparison(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<ComparisonService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ComparisonDetail>>> {
    let detail = service.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(detail), None, None)))
}

/// Agree with or override one issue
#[utoipa::path(
    put,
    path = "/api/issues/{id}/decision",
    params(("id" = Uuid, Path, description = "Issue ID")),
    request_body = DecideIssueDto,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<ComparisonDetail>),
        (status = 409, description = "Comparison is being re-run")
    ),
    security(("bearer_auth" = [])),
    tag = "comparisons"
)]
pub async fn decide_issue(
    ActingActor(actor): ActingActor,
    State(service): State<Arc<ComparisonService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<DecideIssueDto>,
) -> Result<Json<ApiResponse<ComparisonDetail>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let detail = service.decide_issue(&actor, id, dto.try_into()?).await?;
    Ok(Json(ApiResponse::success(Some(detail), None, None)))
}
