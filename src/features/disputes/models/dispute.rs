use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::inspections::models::ItemCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    OwnerResponded,
    Resolved,
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "open"),
            DisputeStatus::OwnerResponded => write!(f, "owner_responded"),
            DisputeStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A tenant's objection to the rating of one item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ItemDispute {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub item_id: Uuid,
    pub raised_by: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub owner_response: Option<String>,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub resolved_condition: Option<ItemCondition>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemDispute {
    pub fn open(
        inspection_id: Uuid,
        item_id: Uuid,
        raised_by: &str,
        reason: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            inspection_id,
            item_id,
            raised_by: raised_by.to_string(),
            reason,
            status: DisputeStatus::Open,
            owner_response: None,
            responded_by: None,
            responded_at: None,
            resolved_condition: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == DisputeStatus::Resolved
    }
}

/// Tenant's per-item objection submitted with a dispute
#[derive(Debug, Clone)]
pub struct RaiseItemDispute {
    pub item_id: Uuid,
    pub reason: String,
}
