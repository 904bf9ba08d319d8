use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "assigned_by", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignedBy {
    Agent,
    Owner,
}

/// Derived response state of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Pending,
    Accepted,
    Declined,
    Completed,
}

/// Outsourcing of one inspection to an external inspector.
///
/// At most one row per inspection has `is_current = true`; superseded rows are kept for audit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub inspector_id: String,
    pub inspector_email: String,
    pub assigned_by: AssignedBy,
    pub assigned_by_id: String,
    pub proposed_date: NaiveDate,
    pub proposed_time_start: Option<NaiveTime>,
    pub proposed_time_end: Option<NaiveTime>,
    pub confirmed_date: Option<NaiveDate>,
    pub confirmed_time: Option<NaiveTime>,
    /// `None` until the inspector responds
    pub accepted: Option<bool>,
    pub responded_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub fee_amount: Option<Decimal>,
    pub fee_paid: bool,
    pub fee_paid_at: Option<DateTime<Utc>>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub is_current: bool,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn state(&self) -> AssignmentState {
        if self.completed_at.is_some() {
            return AssignmentState::Completed;
        }
        match self.accepted {
            None => AssignmentState::Pending,
            Some(true) => AssignmentState::Accepted,
            Some(false) => AssignmentState::Declined,
        }
    }
}

/// Data for outsourcing an inspection
#[derive(Debug, Clone)]
pub struct CreateAssignment {
    pub inspector_id: String,
    pub inspector_email: String,
    pub proposed_date: NaiveDate,
    pub proposed_time_start: Option<NaiveTime>,
    pub proposed_time_end: Option<NaiveTime>,
    pub fee_amount: Option<Decimal>,
}

/// The inspector's answer to an assignment
#[derive(Debug, Clone)]
pub enum AssignmentResponse {
    Accept {
        confirmed_date: NaiveDate,
        confirmed_time: NaiveTime,
    },
    Decline {
        reason: String,
    },
}
