use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::disputes::dtos::ItemDisputeDto;
use crate::features::inspections::models::{
    InspectionType, ItemCondition, OverallCondition, RateItem, RoomBlueprint,
    ScheduleInspection,
};
use crate::features::inspections::services::{CompleteInspection, SignatureRole};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ScheduleInspectionDto {
    pub property_id: Uuid,
    pub tenancy_id: Option<Uuid>,
    /// Defaults to the caller
    #[validate(length(min = 1, max = 128))]
    pub inspector_id: Option<String>,
    pub inspection_type: InspectionType,
    /// `YYYY-MM-DD`, `DD/MM/YYYY` or RFC 3339
    #[validate(length(min = 1, max = 64, message = "scheduled_date is required"))]
    #[schema(example = "2026-03-14")]
    pub scheduled_date: String,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub scheduled_time: Option<NaiveTime>,
    /// Entry inspection an exit inspection is compared against
    pub compare_to_inspection_id: Option<Uuid>,
    /// Template to expand into rooms right away
    pub template_id: Option<Uuid>,
}

impl From<ScheduleInspectionDto> for ScheduleInspection {
    fn from(dto: ScheduleInspectionDto) -> Self {
        Self {
            property_id: dto.property_id,
            tenancy_id: dto.tenancy_id,
            inspector_id: dto.inspector_id,
            inspection_type: dto.inspection_type,
            scheduled_date: dto.scheduled_date,
            scheduled_time: dto.scheduled_time,
            compare_to_inspection_id: dto.compare_to_inspection_id,
        }
    }
}

/// Property filter for listing inspections
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PropertyFilter {
    pub property_id: Uuid,
}

/// Expand either a stored template or inline room blueprints
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ExpandRoomsDto {
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub rooms: Vec<RoomBlueprint>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddRoomDto {
    #[validate(length(min = 1, max = 128, message = "Room name is required"))]
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RateItemDto {
    pub condition: ItemCondition,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub action_required: Option<bool>,
    #[validate(length(max = 2000))]
    pub action_description: Option<String>,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub estimated_cost: Option<Decimal>,
}

impl From<RateItemDto> for RateItem {
    fn from(dto: RateItemDto) -> Self {
        Self {
            condition: dto.condition,
            notes: dto.notes,
            action_required: dto.action_required,
            action_description: dto.action_description,
            estimated_cost: dto.estimated_cost,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CompleteRoomDto {
    pub overall_condition: Option<OverallCondition>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CompleteInspectionDto {
    pub overall_condition: Option<OverallCondition>,
    #[validate(length(max = 5000))]
    pub summary_notes: Option<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Complete even if some rooms are not completed
    #[serde(default)]
    pub force: bool,
}

impl From<CompleteInspectionDto> for CompleteInspection {
    fn from(dto: CompleteInspectionDto) -> Self {
        Self {
            overall_condition: dto.overall_condition,
            summary_notes: dto.summary_notes,
            action_items: dto.action_items,
            force: dto.force,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AcknowledgeDto {
    #[validate(length(min = 1, max = 2048, message = "signature_url is required"))]
    pub signature_url: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DisputeInspectionDto {
    #[validate(length(min = 1, max = 5000, message = "Dispute text is required"))]
    pub text: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ItemDisputeDto>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignatureRoleDto {
    Owner,
    Tenant,
}

impl From<SignatureRoleDto> for SignatureRole {
    fn from(dto: SignatureRoleDto) -> Self {
        match dto {
            SignatureRoleDto::Owner => SignatureRole::Owner,
            SignatureRoleDto::Tenant => SignatureRole::Tenant,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignInspectionDto {
    pub role: SignatureRoleDto,
    #[validate(length(min = 1, max = 2048, message = "signature_url is required"))]
    pub signature_url: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AttachReportDto {
    #[validate(url(message = "report_url must be a valid URL"))]
    pub report_url: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetTranscriptDto {
    #[validate(length(min = 1, message = "transcript is required"))]
    pub transcript: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateDto {
    #[validate(length(min = 1, max = 128, message = "Template name is required"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub rooms: Vec<RoomBlueprint>,
}

/// Result of a tenant dispute: the inspection plus one record per disputed item
#[derive(Debug, Serialize, ToSchema)]
pub struct DisputeOutcomeDto {
    pub inspection: crate::features::inspections::models::Inspection,
    pub disputes: Vec<crate::features::disputes::models::ItemDispute>,
}
