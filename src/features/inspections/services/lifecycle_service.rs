use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{find_inspection, save_if_status};
use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, Capability};
use crate::features::disputes::models::{ItemDispute, RaiseItemDispute};
use crate::features::inspections::models::{Inspection, InspectionStatus, OverallCondition};
use crate::features::inspections::state_machine::{check_transition, TransitionFacts};
use crate::modules::store::InspectionStore;
use crate::shared::validation::require_text;

/// Input for `in_progress -> completed`
#[derive(Debug, Clone, Default)]
pub struct CompleteInspection {
    pub overall_condition: Option<OverallCondition>,
    pub summary_notes: Option<String>,
    pub action_items: Vec<String>,
    /// Complete even though some rooms are not completed
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRole {
    Owner,
    Tenant,
}

/// Drives inspections through their status graph
pub struct LifecycleService {
    store: Arc<dyn InspectionStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn InspectionStore>) -> Self {
        Self { store }
    }

    /// `scheduled -> in_progress`; stamps the actual date and time
    pub async fn start(&self, actor: &Actor, id: Uuid) -> Result<Inspection> {
        authorize(actor, Capability::StartInspection)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        check_transition(
            current,
            InspectionStatus::InProgress,
            &TransitionFacts::default(),
        )?;

        let now = Utc::now();
        inspection.status = InspectionStatus::InProgress;
        inspection.actual_date = Some(now.date_naive());
        inspection.actual_time = Some(now.time());
        inspection.started_at = Some(now);
        inspection.updated_at = now;

        save_if_status(self.store.as_ref(), &inspection, current).await?;
        log_transition(&inspection, current, actor);
        Ok(inspection)
    }

    /// `in_progress -> completed`
    pub async fn complete(
        &self,
        actor: &Actor,
        id: Uuid,
        data: CompleteInspection,
    ) -> Result<Inspection> {
        let inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        let completed = self
            .prepare_completion(actor, inspection, data, Utc::now())
            .await?;

        save_if_status(self.store.as_ref(), &completed, current).await?;
        log_transition(&completed, current, actor);
        Ok(completed)
    }

    /// Validate completion and return the completed inspection without persisting it
    pub async fn prepare_completion(
        &self,
        actor: &Actor,
        mut inspection: Inspection,
        data: CompleteInspection,
        now: DateTime<Utc>,
    ) -> Result<Inspection> {
        authorize(actor, Capability::CompleteInspection)?;

        let rooms = self.store.list_rooms(inspection.id).await?;
        let incomplete_rooms = rooms
            .iter()
            .filter(|r| r.room.completed_at.is_none())
            .count();
        check_transition(
            inspection.status,
            InspectionStatus::Completed,
            &TransitionFacts {
                incomplete_rooms,
                force_complete: data.force,
                ..Default::default()
            },
        )?;

        if incomplete_rooms > 0 {
            tracing::warn!(
                "Inspection {} force-completed by {} with {} incomplete room(s)",
                inspection.id,
                actor.id,
                incomplete_rooms
            );
        }

        inspection.status = InspectionStatus::Completed;
        inspection.completed_at = Some(now);
        inspection.duration_minutes = inspection
            .started_at
            .map(|started| (now - started).num_minutes().max(0) as i32);
        inspection.overall_condition = data.overall_condition.or(inspection.overall_condition);
        inspection.summary_notes = data.summary_notes.or(inspection.summary_notes);
        if !data.action_items.is_empty() {
            inspection.action_items = data
                .action_items
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
        }
        inspection.updated_at = now;
        Ok(inspection)
    }

    /// `completed -> tenant_review`; needs a linked tenancy
    pub async fn send_for_tenant_review(&self, actor: &Actor, id: Uuid) -> Result<Inspection> {
        authorize(actor, Capability::SendForTenantReview)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        check_transition(
            current,
            InspectionStatus::TenantReview,
            &TransitionFacts {
                has_tenancy: inspection.tenancy_id.is_some(),
                ..Default::default()
            },
        )?;

        inspection.status = InspectionStatus::TenantReview;
        inspection.updated_at = Utc::now();

        save_if_status(self.store.as_ref(), &inspection, current).await?;
        log_transition(&inspection, current, actor);
        Ok(inspection)
    }

    /// Tenant acknowledgment: signs and finalizes in one step
    pub async fn acknowledge(
        &self,
        actor: &Actor,
        id: Uuid,
        signature_url: &str,
    ) -> Result<Inspection> {
        authorize(actor, Capability::AcknowledgeInspection)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        let signature_url = signature_url.trim();
        check_transition(
            current,
            InspectionStatus::Finalized,
            &TransitionFacts {
                has_tenant_signature: !signature_url.is_empty(),
                ..Default::default()
            },
        )?;
        if current != InspectionStatus::TenantReview {
            return Err(AppError::invalid_transition(
                current,
                InspectionStatus::Finalized,
                "tenants can only acknowledge during tenant review",
            ));
        }

        let now = Utc::now();
        inspection.status = InspectionStatus::Finalized;
        inspection.tenant_acknowledged = true;
        inspection.tenant_acknowledged_at = Some(now);
        inspection.tenant_signature_url = Some(signature_url.to_string());
        inspection.tenant_signed_at = Some(now);
        inspection.updated_at = now;

        save_if_status(self.store.as_ref(), &inspection, current).await?;
        log_transition(&inspection, current, actor);
        Ok(inspection)
    }

    /// `tenant_review -> disputed`, opening per-item disputes alongside
    pub async fn dispute(
        &self,
        actor: &Actor,
        id: Uuid,
        text: &str,
        items: Vec<RaiseItemDispute>,
    ) -> Result<(Inspection, Vec<ItemDispute>)> {
        authorize(actor, Capability::DisputeInspection)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        let text = text.trim().to_string();
        check_transition(
            current,
            InspectionStatus::Disputed,
            &TransitionFacts {
                dispute_text: Some(text.clone()),
                ..Default::default()
            },
        )?;

        let now = Utc::now();
        let item_ids: Vec<Uuid> = self
            .store
            .list_rooms(id)
            .await?
            .iter()
            .flat_map(|r| r.items.iter().map(|i| i.id))
            .collect();

        let disputes = items
            .into_iter()
            .map(|raised| -> Result<ItemDispute> {
                if !item_ids.contains(&raised.item_id) {
                    return Err(AppError::NotFound(format!(
                        "Item {} not found",
                        raised.item_id
                    )));
                }
                let reason = require_text("reason", &raised.reason)?;
                Ok(ItemDispute::open(id, raised.item_id, &actor.id, reason, now))
            })
            .collect::<Result<Vec<_>>>()?;

        inspection.status = InspectionStatus::Disputed;
        inspection.tenant_disputes = Some(text);
        inspection.updated_at = now;

        if !self
            .store
            .open_disputes(&inspection, current, &disputes)
            .await?
        {
            tracing::warn!("Stale dispute rejected for inspection {}", id);
            return Err(AppError::ConcurrencyAnomaly(format!(
                "Inspection {} changed while it was being disputed; reload and retry",
                id
            )));
        }

        log_transition(&inspection, current, actor);
        tracing::info!(
            "Disputes opened: inspection={}, items={}",
            id,
            disputes.len()
        );
        Ok((inspection, disputes))
    }

    /// `disputed -> finalized` once every item dispute is resolved
    pub async fn finalize(&self, actor: &Actor, id: Uuid) -> Result<Inspection> {
        authorize(actor, Capability::FinalizeInspection)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        if current == InspectionStatus::TenantReview {
            return Err(AppError::invalid_transition(
                current,
                InspectionStatus::Finalized,
                "only the tenant's acknowledgment finalizes an inspection under review",
            ));
        }

        let unresolved_disputes = self
            .store
            .list_disputes(id)
            .await?
            .iter()
            .filter(|d| !d.is_resolved())
            .count();
        check_transition(
            current,
            InspectionStatus::Finalized,
            &TransitionFacts {
                unresolved_disputes,
                ..Default::default()
            },
        )?;

        inspection.status = InspectionStatus::Finalized;
        inspection.updated_at = Utc::now();

        if !self
            .store
            .update_inspection_if_settled(&inspection, current)
            .await?
        {
            tracing::warn!(
                "Finalize of inspection {} rejected: status or disputes changed",
                id
            );
            return Err(AppError::ConcurrencyAnomaly(format!(
                "Inspection {} changed while it was being finalized; reload and retry",
                id
            )));
        }
        log_transition(&inspection, current, actor);
        Ok(inspection)
    }

    /// Any non-terminal status -> `cancelled`
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> Result<Inspection> {
        authorize(actor, Capability::CancelInspection)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        check_transition(
            current,
            InspectionStatus::Cancelled,
            &TransitionFacts::default(),
        )?;

        let now = Utc::now();
        inspection.status = InspectionStatus::Cancelled;
        inspection.cancelled_at = Some(now);
        inspection.updated_at = now;

        save_if_status(self.store.as_ref(), &inspection, current).await?;
        log_transition(&inspection, current, actor);
        Ok(inspection)
    }

    /// Record a signature. Owners may sign at any point before cancellation;
    /// a tenant signature is the acknowledgment itself.
    pub async fn sign(
        &self,
        actor: &Actor,
        id: Uuid,
        role: SignatureRole,
        signature_url: &str,
    ) -> Result<Inspection> {
        if role == SignatureRole::Tenant {
            return self.acknowledge(actor, id, signature_url).await;
        }

        authorize(actor, Capability::SignAsOwner)?;
        let signature_url = require_text("signature_url", signature_url)?;
        let mut inspection = find_inspection(self.store.as_ref(), id).await?;
        let current = inspection.status;
        if current == InspectionStatus::Cancelled {
            return Err(AppError::invalid_transition(
                current,
                "sign",
                "a cancelled inspection cannot be signed",
            ));
        }

        let now = Utc::now();
        inspection.owner_signature_url = Some(signature_url);
        inspection.owner_signed_at = Some(now);
        inspection.updated_at = now;

        save_if_status(self.store.as_ref(), &inspection, current).await?;
        tracing::info!("Owner signed inspection {}: by={}", id, actor.id);
        Ok(inspection)
    }
}

fn log_transition(inspection: &Inspection, from: InspectionStatus, actor: &Actor) {
    tracing::info!(
        "Inspection {} transitioned {} -> {} by {} ({})",
        inspection.id,
        from,
        inspection.status,
        actor.id,
        actor.role
    );
}
