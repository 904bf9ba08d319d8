//! Actor roles and the per-operation allow-list.
//!
//! Every mutating service call receives an explicit [`Actor`]; services call [`authorize`]
//! before touching the store. There is no ambient session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::core::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Property manager / agency staff
    Admin,
    Owner,
    /// Platform inspector working on the owner's behalf
    Inspector,
    Tenant,
    /// Outsourced inspector authenticated only by an access token
    ExternalInspector,
}

impl ActorRole {
    pub fn precedence(&self) -> u8 {
        match self {
            ActorRole::Admin => 0,
            ActorRole::Owner => 1,
            ActorRole::Inspector => 2,
            ActorRole::Tenant => 3,
            ActorRole::ExternalInspector => 4,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Admin => write!(f, "admin"),
            ActorRole::Owner => write!(f, "owner"),
            ActorRole::Inspector => write!(f, "inspector"),
            ActorRole::Tenant => write!(f, "tenant"),
            ActorRole::ExternalInspector => write!(f, "external_inspector"),
        }
    }
}

impl FromStr for ActorRole {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "agent" => Ok(ActorRole::Admin),
            "owner" => Ok(ActorRole::Owner),
            "inspector" => Ok(ActorRole::Inspector),
            "tenant" => Ok(ActorRole::Tenant),
            "external_inspector" => Ok(ActorRole::ExternalInspector),
            _ => Err(()),
        }
    }
}

/// Identity and role on whose behalf a mutation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewInspection,
    ScheduleInspection,
    ManageRooms,
    ManageTemplates,
    StartInspection,
    RateItem,
    CompleteRoom,
    AddEvidence,
    CompleteInspection,
    SendForTenantReview,
    AcknowledgeInspection,
    DisputeInspection,
    FinalizeInspection,
    CancelInspection,
    SignAsOwner,
    AttachReport,
    ManageAssignments,
    RespondToAssignment,
    CompleteAssignment,
    RateInspector,
    ManageAccessTokens,
    RunComparison,
    OverrideIssue,
    RespondToDispute,
}

impl Capability {
    pub fn allowed_roles(&self) -> &'static [ActorRole] {
        use ActorRole::*;
        match self {
            Capability::ViewInspection => &[Admin, Owner, Inspector, Tenant, ExternalInspector],
            Capability::ScheduleInspection | Capability::ManageRooms => {
                &[Admin, Owner, Inspector]
            }
            Capability::ManageTemplates => &[Admin, Owner],
            Capability::StartInspection
            | Capability::RateItem
            | Capability::CompleteRoom
            | Capability::AddEvidence
            | Capability::CompleteInspection => &[Admin, Owner, Inspector, ExternalInspector],
            Capability::SendForTenantReview | Capability::AttachReport => {
                &[Admin, Owner, Inspector]
            }
            Capability::AcknowledgeInspection | Capability::DisputeInspection => &[Tenant],
            Capability::FinalizeInspection | Capability::CancelInspection => &[Admin, Owner],
            Capability::SignAsOwner => &[Owner],
            Capability::ManageAssignments
            | Capability::ManageAccessTokens
            | Capability::RateInspector => &[Admin, Owner],
            Capability::RespondToAssignment => &[Inspector, ExternalInspector],
            Capability::CompleteAssignment => &[Admin, Owner, ExternalInspector],
            Capability::RunComparison => &[Admin, Owner, Inspector],
            Capability::OverrideIssue | Capability::RespondToDispute => &[Admin, Owner],
        }
    }
}

/// Reject the call unless the actor's role is on the capability's allow-list
pub fn authorize(actor: &Actor, capability: Capability) -> Result<()> {
    if capability.allowed_roles().contains(&actor.role) {
        Ok(())
    } else {
        tracing::warn!(
            "Actor {} ({}) denied capability {:?}",
            actor.id,
            actor.role,
            capability
        );
        Err(AppError::Forbidden(format!(
            "Role '{}' may not perform {:?}",
            actor.role, capability
        )))
    }
}
