use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::comparisons::{
    dtos as comparisons_dtos, handlers as comparisons_handlers, models as comparisons_models,
    services::ComparisonDetail,
};
use crate::features::disputes::{
    dtos as disputes_dtos, handlers as disputes_handlers, models as disputes_models,
};
use crate::features::inspections::{
    dtos as inspections_dtos, handlers as inspections_handlers, models as inspections_models,
    services::InspectionDetail,
};
use crate::features::outsourcing::{
    dtos as outsourcing_dtos, handlers as outsourcing_handlers, models as outsourcing_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Inspections
        inspections_handlers::schedule_inspection,
        inspections_handlers::list_inspections,
        inspections_handlers::get_inspection,
        inspections_handlers::expand_rooms,
        inspections_handlers::seed_rooms,
        inspections_handlers::add_room,
        inspections_handlers::rate_item,
        inspections_handlers::complete_room,
        inspections_handlers::upload_image,
        inspections_handlers::upload_voice_note,
        inspections_handlers::set_transcript,
        inspections_handlers::attach_report,
        inspections_handlers::start_inspection,
        inspections_handlers::complete_inspection,
        inspections_handlers::send_for_tenant_review,
        inspections_handlers::acknowledge_inspection,
        inspections_handlers::dispute_inspection,
        inspections_handlers::finalize_inspection,
        inspections_handlers::cancel_inspection,
        inspections_handlers::sign_inspection,
        // Templates
        inspections_handlers::create_template,
        inspections_handlers::list_templates,
        inspections_handlers::get_template,
        // Outsourcing
        outsourcing_handlers::create_assignment,
        outsourcing_handlers::list_assignments,
        outsourcing_handlers::respond_to_assignment,
        outsourcing_handlers::complete_assignment,
        outsourcing_handlers::mark_fee_paid,
        outsourcing_handlers::rate_inspector,
        outsourcing_handlers::issue_access_token,
        outsourcing_handlers::list_access_tokens,
        outsourcing_handlers::revoke_access_token,
        // External inspector (access token)
        outsourcing_handlers::view_access,
        outsourcing_handlers::respond_via_access,
        outsourcing_handlers::start_via_access,
        outsourcing_handlers::rate_item_via_access,
        outsourcing_handlers::complete_room_via_access,
        outsourcing_handlers::upload_image_via_access,
        outsourcing_handlers::upload_voice_note_via_access,
        outsourcing_handlers::submit_via_access,
        // Comparisons
        comparisons_handlers::run_comparison,
        comparisons_handlers::list_comparisons,
        comparisons_handlers::get_comparison,
        comparisons_handlers::decide_issue,
        // Disputes
        disputes_handlers::raise_dispute,
        disputes_handlers::list_disputes,
        disputes_handlers::get_dispute,
        disputes_handlers::respond_to_dispute,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Inspections
            inspections_models::Inspection,
            inspections_models::InspectionStatus,
            inspections_models::InspectionType,
            inspections_models::OutsourceMode,
            inspections_models::OverallCondition,
            inspections_models::ItemCondition,
            inspections_models::Room,
            inspections_models::Item,
            inspections_models::RoomWithItems,
            inspections_models::InspectionImage,
            inspections_models::VoiceNote,
            inspections_models::Template,
            inspections_models::TemplateRoom,
            inspections_models::TemplateWithRooms,
            inspections_models::RoomBlueprint,
            InspectionDetail,
            inspections_dtos::ScheduleInspectionDto,
            inspections_dtos::ExpandRoomsDto,
            inspections_dtos::AddRoomDto,
            inspections_dtos::RateItemDto,
            inspections_dtos::CompleteRoomDto,
            inspections_dtos::CompleteInspectionDto,
            inspections_dtos::AcknowledgeDto,
            inspections_dtos::DisputeInspectionDto,
            inspections_dtos::DisputeOutcomeDto,
            inspections_dtos::SignatureRoleDto,
            inspections_dtos::SignInspectionDto,
            inspections_dtos::AttachReportDto,
            inspections_dtos::SetTranscriptDto,
            inspections_dtos::CreateTemplateDto,
            inspections_dtos::UploadEvidenceDto,
            ApiResponse<inspections_models::Inspection>,
            ApiResponse<Vec<inspections_models::Inspection>>,
            ApiResponse<InspectionDetail>,
            ApiResponse<inspections_models::RoomWithItems>,
            ApiResponse<Vec<inspections_models::RoomWithItems>>,
            ApiResponse<inspections_models::Room>,
            ApiResponse<inspections_models::Item>,
            ApiResponse<inspections_models::InspectionImage>,
            ApiResponse<inspections_models::VoiceNote>,
            ApiResponse<inspections_models::TemplateWithRooms>,
            ApiResponse<Vec<inspections_models::Template>>,
            ApiResponse<inspections_dtos::DisputeOutcomeDto>,
            // Outsourcing
            outsourcing_models::Assignment,
            outsourcing_models::AssignedBy,
            outsourcing_models::AssignmentState,
            outsourcing_models::AccessToken,
            outsourcing_dtos::CreateAssignmentDto,
            outsourcing_dtos::RespondAssignmentDto,
            outsourcing_dtos::RateInspectorDto,
            outsourcing_dtos::IssueAccessTokenDto,
            outsourcing_dtos::IssuedAccessTokenDto,
            outsourcing_dtos::ExternalInspectionDto,
            ApiResponse<outsourcing_models::Assignment>,
            ApiResponse<Vec<outsourcing_models::Assignment>>,
            ApiResponse<outsourcing_models::AccessToken>,
            ApiResponse<Vec<outsourcing_models::AccessToken>>,
            ApiResponse<outsourcing_dtos::IssuedAccessTokenDto>,
            ApiResponse<outsourcing_dtos::ExternalInspectionDto>,
            // Comparisons
            comparisons_models::AiComparison,
            comparisons_models::ComparisonStatus,
            comparisons_models::AiIssue,
            comparisons_models::ChangeType,
            comparisons_models::IssueSeverity,
            comparisons_models::Classification,
            ComparisonDetail,
            comparisons_dtos::RunComparisonDto,
            comparisons_dtos::DecisionKind,
            comparisons_dtos::DecideIssueDto,
            ApiResponse<comparisons_models::AiComparison>,
            ApiResponse<Vec<comparisons_models::AiComparison>>,
            ApiResponse<ComparisonDetail>,
            // Disputes
            disputes_models::ItemDispute,
            disputes_models::DisputeStatus,
            disputes_dtos::ItemDisputeDto,
            disputes_dtos::RespondDisputeDto,
            ApiResponse<disputes_models::ItemDispute>,
            ApiResponse<Vec<disputes_models::ItemDispute>>,
        )
    ),
    tags(
        (name = "inspections", description = "Inspection scheduling, checklists, evidence and status"),
        (name = "templates", description = "Reusable room/item templates"),
        (name = "outsourcing", description = "Assignments to external inspectors and access links"),
        (name = "external", description = "Token-scoped endpoints for external inspectors (no login)"),
        (name = "comparisons", description = "Entry vs exit condition comparison"),
        (name = "disputes", description = "Tenant item disputes and owner responses"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Inspection Core API",
        version = "0.1.0",
        description = "API documentation for the property inspection service",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_access_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/access/{token}/submit"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
