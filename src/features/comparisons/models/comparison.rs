use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "comparison_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonStatus::Pending => write!(f, "pending"),
            ComparisonStatus::Processing => write!(f, "processing"),
            ComparisonStatus::Completed => write!(f, "completed"),
            ComparisonStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Entry-vs-exit comparison for one (entry, exit) inspection pair
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct AiComparison {
    pub id: Uuid,
    pub entry_inspection_id: Uuid,
    pub exit_inspection_id: Uuid,
    pub property_id: Uuid,
    pub status: ComparisonStatus,
    pub total_issues: i32,
    pub tenant_responsible_count: i32,
    pub wear_and_tear_count: i32,
    pub total_estimated_cost: Decimal,
    /// Machine recommendation: tenant-responsible, non-wear-and-tear costs
    pub bond_deduction_amount: Decimal,
    /// Same sum over owner-override-aware assessments
    pub bond_deduction_recommended: Decimal,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub run_count: i32,
    pub requested_by: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AiComparison {
    pub fn new(
        entry_inspection_id: Uuid,
        exit_inspection_id: Uuid,
        property_id: Uuid,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_inspection_id,
            exit_inspection_id,
            property_id,
            status: ComparisonStatus::Pending,
            total_issues: 0,
            tenant_responsible_count: 0,
            wear_and_tear_count: 0,
            total_estimated_cost: Decimal::ZERO,
            bond_deduction_amount: Decimal::ZERO,
            bond_deduction_recommended: Decimal::ZERO,
            summary: None,
            error_message: None,
            run_count: 0,
            requested_by: requested_by.to_string(),
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of trying to claim a comparison run
#[derive(Debug, Clone)]
pub enum RunClaim {
    /// The caller owns the run; the record is now `processing`
    Claimed(AiComparison),
    /// Another run for the same pair is in flight
    AlreadyRunning(AiComparison),
}
