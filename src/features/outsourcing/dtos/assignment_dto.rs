use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::inspections::services::InspectionDetail;
use crate::features::outsourcing::models::{
    AccessToken, Assignment, AssignmentResponse, CreateAssignment, IssuedAccessToken,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    #[validate(length(min = 1, max = 128, message = "inspector_id is required"))]
    pub inspector_id: String,
    #[validate(email(message = "inspector_email must be a valid email"))]
    pub inspector_email: String,
    #[schema(value_type = String, example = "2026-03-14")]
    pub proposed_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub proposed_time_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "11:00:00")]
    pub proposed_time_end: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "150.00")]
    pub fee_amount: Option<Decimal>,
}

impl From<CreateAssignmentDto> for CreateAssignment {
    fn from(dto: CreateAssignmentDto) -> Self {
        Self {
            inspector_id: dto.inspector_id,
            inspector_email: dto.inspector_email,
            proposed_date: dto.proposed_date,
            proposed_time_start: dto.proposed_time_start,
            proposed_time_end: dto.proposed_time_end,
            fee_amount: dto.fee_amount,
        }
    }
}

/// Accept with a confirmed slot, or decline with a reason
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RespondAssignmentDto {
    pub accept: bool,
    #[schema(value_type = Option<String>, example = "2026-03-14")]
    pub confirmed_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub confirmed_time: Option<NaiveTime>,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

impl TryFrom<RespondAssignmentDto> for AssignmentResponse {
    type Error = AppError;

    fn try_from(dto: RespondAssignmentDto) -> Result<Self> {
        if dto.accept {
            match (dto.confirmed_date, dto.confirmed_time) {
                (Some(confirmed_date), Some(confirmed_time)) => Ok(AssignmentResponse::Accept {
                    confirmed_date,
                    confirmed_time,
                }),
                _ => Err(AppError::Validation(
                    "confirmed_date and confirmed_time are required to accept".to_string(),
                )),
            }
        } else {
            Ok(AssignmentResponse::Decline {
                reason: dto.reason.unwrap_or_default(),
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RateInspectorDto {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub review: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IssueAccessTokenDto {
    pub assignment_id: Uuid,
}

/// A freshly issued token. The plaintext is returned once and never again.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedAccessTokenDto {
    pub token: String,
    pub access_link: String,
    pub expires_at: DateTime<Utc>,
    pub record: AccessToken,
}

impl IssuedAccessTokenDto {
    pub fn new(issued: IssuedAccessToken, access_link: String) -> Self {
        Self {
            token: issued.token,
            access_link,
            expires_at: issued.record.expires_at,
            record: issued.record,
        }
    }
}

/// What an external inspector sees through their access link
#[derive(Debug, Serialize, ToSchema)]
pub struct ExternalInspectionDto {
    pub assignment: Assignment,
    pub inspection: InspectionDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_needs_slot() {
        let dto = RespondAssignmentDto {
            accept: true,
            confirmed_date: NaiveDate::from_ymd_opt(2026, 3, 14),
            confirmed_time: None,
            reason: None,
        };
        assert!(matches!(
            AssignmentResponse::try_from(dto),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_decline_carries_reason() {
        let dto = RespondAssignmentDto {
            accept: false,
            confirmed_date: None,
            confirmed_time: None,
            reason: Some("Away that week".to_string()),
        };
        match AssignmentResponse::try_from(dto).unwrap() {
            AssignmentResponse::Decline { reason } => assert_eq!(reason, "Away that week"),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
