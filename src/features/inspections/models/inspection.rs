use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "inspection_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Scheduled,
    InProgress,
    Completed,
    TenantReview,
    Disputed,
    Finalized,
    Cancelled,
}

impl InspectionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InspectionStatus::Finalized | InspectionStatus::Cancelled)
    }
}

impl std::fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionStatus::Scheduled => write!(f, "scheduled"),
            InspectionStatus::InProgress => write!(f, "in_progress"),
            InspectionStatus::Completed => write!(f, "completed"),
            InspectionStatus::TenantReview => write!(f, "tenant_review"),
            InspectionStatus::Disputed => write!(f, "disputed"),
            InspectionStatus::Finalized => write!(f, "finalized"),
            InspectionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "inspection_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InspectionType {
    Routine,
    Entry,
    Exit,
    PreListing,
    Maintenance,
    Complaint,
}

impl std::fmt::Display for InspectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectionType::Routine => write!(f, "routine"),
            InspectionType::Entry => write!(f, "entry"),
            InspectionType::Exit => write!(f, "exit"),
            InspectionType::PreListing => write!(f, "pre_listing"),
            InspectionType::Maintenance => write!(f, "maintenance"),
            InspectionType::Complaint => write!(f, "complaint"),
        }
    }
}

/// Who performs the inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "outsource_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutsourceMode {
    #[sqlx(rename = "self")]
    #[serde(rename = "self")]
    SelfManaged,
    Professional,
    AutoManaged,
}

/// Summary rating for a whole inspection or room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "overall_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OverallCondition {
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
}

/// Database model for an inspection
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Inspection {
    pub id: Uuid,
    pub property_id: Uuid,
    pub tenancy_id: Option<Uuid>,
    /// Owner, platform inspector or outsourced professional
    pub inspector_id: String,
    pub inspection_type: InspectionType,
    pub status: InspectionStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub actual_date: Option<NaiveDate>,
    pub actual_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub compare_to_inspection_id: Option<Uuid>,
    pub overall_condition: Option<OverallCondition>,
    pub summary_notes: Option<String>,
    pub action_items: Vec<String>,
    pub tenant_acknowledged: bool,
    pub tenant_acknowledged_at: Option<DateTime<Utc>>,
    pub tenant_disputes: Option<String>,
    pub owner_signature_url: Option<String>,
    pub owner_signed_at: Option<DateTime<Utc>>,
    pub tenant_signature_url: Option<String>,
    pub tenant_signed_at: Option<DateTime<Utc>>,
    pub report_url: Option<String>,
    pub report_generated_at: Option<DateTime<Utc>>,
    pub is_outsourced: bool,
    pub outsource_mode: OutsourceMode,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inspection {
    pub fn is_exit(&self) -> bool {
        self.inspection_type == InspectionType::Exit
    }
}

/// Data for scheduling a new inspection
#[derive(Debug, Clone)]
pub struct ScheduleInspection {
    pub property_id: Uuid,
    pub tenancy_id: Option<Uuid>,
    pub inspector_id: Option<String>,
    pub inspection_type: InspectionType,
    /// Free-form date; must resolve to a calendar date
    pub scheduled_date: String,
    pub scheduled_time: Option<NaiveTime>,
    pub compare_to_inspection_id: Option<Uuid>,
}
