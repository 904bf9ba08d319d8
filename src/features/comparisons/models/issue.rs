use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::inspections::models::ItemCondition;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema, JsonSchema,
)]
#[sqlx(type_name = "issue_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Minor,
    Moderate,
    Major,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema, JsonSchema,
)]
#[sqlx(type_name = "change_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    WearAndTear,
    MinorDamage,
    MajorDamage,
    Missing,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::WearAndTear => write!(f, "wear_and_tear"),
            ChangeType::MinorDamage => write!(f, "minor_damage"),
            ChangeType::MajorDamage => write!(f, "major_damage"),
            ChangeType::Missing => write!(f, "missing"),
        }
    }
}

/// Judgment on one changed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Classification {
    pub change_type: ChangeType,
    pub severity: IssueSeverity,
    pub is_tenant_responsible: bool,
    /// In [0, 1]
    pub confidence: f64,
    pub estimated_cost: Decimal,
    pub description: String,
    pub evidence_notes: Option<String>,
}

impl Classification {
    /// Wear and tear is never the tenant's responsibility
    pub fn normalized(mut self) -> Self {
        if self.change_type == ChangeType::WearAndTear {
            self.is_tenant_responsible = false;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }

    /// Cost that may be withheld from the bond
    pub fn deductible_cost(&self) -> Decimal {
        if self.is_tenant_responsible && self.change_type != ChangeType::WearAndTear {
            self.estimated_cost
        } else {
            Decimal::ZERO
        }
    }
}

/// Which classification is authoritative for an issue
#[derive(Debug, Clone, PartialEq)]
pub enum IssueAssessment {
    Computed(Classification),
    Overridden {
        classification: Classification,
        by: String,
        at: DateTime<Utc>,
    },
}

impl IssueAssessment {
    pub fn classification(&self) -> &Classification {
        match self {
            IssueAssessment::Computed(c) => c,
            IssueAssessment::Overridden { classification, .. } => classification,
        }
    }
}

/// Owner's patch over a machine classification
#[derive(Debug, Clone, PartialEq)]
pub enum OwnerDecision {
    Agree {
        notes: Option<String>,
    },
    Override {
        change_type: Option<ChangeType>,
        is_tenant_responsible: Option<bool>,
        estimated_cost: Option<Decimal>,
        notes: Option<String>,
    },
}

/// One detected material change between entry and exit
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct AiIssue {
    pub id: Uuid,
    pub comparison_id: Uuid,
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub room_name: String,
    pub item_name: String,
    pub description: String,
    pub severity: IssueSeverity,
    pub change_type: ChangeType,
    pub is_tenant_responsible: bool,
    pub confidence: f64,
    pub estimated_cost: Decimal,
    pub entry_condition: Option<ItemCondition>,
    pub exit_condition: Option<ItemCondition>,
    pub entry_image_ids: Vec<Uuid>,
    pub exit_image_ids: Vec<Uuid>,
    pub evidence_notes: Option<String>,
    pub owner_agreed: Option<bool>,
    pub owner_notes: Option<String>,
    pub override_change_type: Option<ChangeType>,
    pub override_tenant_responsible: Option<bool>,
    pub override_estimated_cost: Option<Decimal>,
    pub overridden_by: Option<String>,
    pub overridden_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AiIssue {
    /// The engine's own classification, regardless of any override
    pub fn computed(&self) -> Classification {
        Classification {
            change_type: self.change_type,
            severity: self.severity,
            is_tenant_responsible: self.is_tenant_responsible,
            confidence: self.confidence,
            estimated_cost: self.estimated_cost,
            description: self.description.clone(),
            evidence_notes: self.evidence_notes.clone(),
        }
    }

    pub fn assessment(&self) -> IssueAssessment {
        let computed = self.computed();
        match (self.owner_agreed, &self.overridden_by, self.overridden_at) {
            (Some(false), Some(by), Some(at)) => {
                let classification = Classification {
                    change_type: self.override_change_type.unwrap_or(computed.change_type),
                    is_tenant_responsible: self
                        .override_tenant_responsible
                        .unwrap_or(computed.is_tenant_responsible),
                    estimated_cost: self
                        .override_estimated_cost
                        .unwrap_or(computed.estimated_cost),
                    ..computed
                }
                .normalized();
                IssueAssessment::Overridden {
                    classification,
                    by: by.clone(),
                    at,
                }
            }
            _ => IssueAssessment::Computed(computed),
        }
    }

    pub fn has_owner_decision(&self) -> bool {
        self.owner_agreed.is_some()
    }

    /// Record an owner decision on this issue
    pub fn apply_decision(&mut self, decision: OwnerDecision, by: &str, at: DateTime<Utc>) {
        match decision {
            OwnerDecision::Agree { notes } => {
                self.owner_agreed = Some(true);
                self.owner_notes = notes;
                self.override_change_type = None;
                self.override_tenant_responsible = None;
                self.override_estimated_cost = None;
            }
            OwnerDecision::Override {
                change_type,
                is_tenant_responsible,
                estimated_cost,
                notes,
            } => {
                self.owner_agreed = Some(false);
                self.owner_notes = notes;
                self.override_change_type = change_type;
                self.override_tenant_responsible = is_tenant_responsible;
                self.override_estimated_cost = estimated_cost;
            }
        }
        self.overridden_by = Some(by.to_string());
        self.overridden_at = Some(at);
    }

    /// Carry an earlier owner decision onto a freshly computed issue
    pub fn inherit_decision(&mut self, previous: &AiIssue) {
        self.owner_agreed = previous.owner_agreed;
        self.owner_notes = previous.owner_notes.clone();
        self.override_change_type = previous.override_change_type;
        self.override_tenant_responsible = previous.override_tenant_responsible;
        self.override_estimated_cost = previous.override_estimated_cost;
        self.overridden_by = previous.overridden_by.clone();
        self.overridden_at = previous.overridden_at;
    }
}
