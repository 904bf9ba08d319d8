use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::comparisons::models::{ChangeType, OwnerDecision};

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RunComparisonDto {
    /// Drop owner decisions carried over from the previous run
    #[serde(default)]
    pub reset_overrides: bool,
    /// Run inline and return the finished comparison instead of 202
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Agree,
    Override,
}

/// Owner agreement with, or override of, a machine classification
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DecideIssueDto {
    pub decision: DecisionKind,
    pub change_type: Option<ChangeType>,
    pub is_tenant_responsible: Option<bool>,
    #[schema(value_type = Option<String>, example = "80.00")]
    pub estimated_cost: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl TryFrom<DecideIssueDto> for OwnerDecision {
    type Error = AppError;

    fn try_from(dto: DecideIssueDto) -> Result<Self> {
        match dto.decision {
            DecisionKind::Agree => Ok(OwnerDecision::Agree { notes: dto.notes }),
            DecisionKind::Override => {
                if dto.change_type.is_none()
                    && dto.is_tenant_responsible.is_none()
                    && dto.estimated_cost.is_none()
                {
                    return Err(AppError::Validation(
                        "An override must change the type, responsibility or cost".to_string(),
                    ));
                }
                Ok(OwnerDecision::Override {
                    change_type: dto.change_type,
                    is_tenant_responsible: dto.is_tenant_responsible,
                    estimated_cost: dto.estimated_cost,
                    notes: dto.notes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_override_rejected() {
        let dto: DecideIssueDto =
            serde_json::from_value(serde_json::json!({ "decision": "override" })).unwrap();
        assert!(matches!(
            OwnerDecision::try_from(dto),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_override_fields_carried() {
        let dto: DecideIssueDto = serde_json::from_value(serde_json::json!({
            "decision": "override",
            "change_type": "wear_and_tear",
            "is_tenant_responsible": false
        }))
        .unwrap();
        assert_eq!(
            OwnerDecision::try_from(dto).unwrap(),
            OwnerDecision::Override {
                change_type: Some(ChangeType::WearAndTear),
                is_tenant_responsible: Some(false),
                estimated_cost: None,
                notes: None,
            }
        );
    }
}
