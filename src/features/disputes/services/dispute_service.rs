use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, Capability};
use crate::features::disputes::models::{
    DisputeStatus, ItemDispute, RaiseItemDispute,
};
use crate::features::inspections::models::{InspectionStatus, ItemCondition};
use crate::features::inspections::services::{find_inspection, InspectionService};
use crate::modules::store::InspectionStore;
use crate::shared::validation::require_text;

/// Per-item disputes: `open -> owner_responded -> resolved`
pub struct DisputeService {
    store: Arc<dyn InspectionStore>,
    inspections: Arc<InspectionService>,
}

impl DisputeService {
    pub fn new(store: Arc<dyn InspectionStore>, inspections: Arc<InspectionService>) -> Self {
        Self { store, inspections }
    }

    /// Add an item dispute to an inspection that is already disputed
    pub async fn raise(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        raised: RaiseItemDispute,
    ) -> Result<ItemDispute> {
        authorize(actor, Capability::DisputeInspection)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        if inspection.status != InspectionStatus::Disputed {
            return Err(AppError::invalid_transition(
                inspection.status,
                "raise item dispute",
                "the inspection must be disputed first",
            ));
        }
        let reason = require_text("reason", &raised.reason)?;
        self.inspections
            .item_in(inspection_id, raised.item_id)
            .await?;

        let dispute = ItemDispute::open(inspection_id, raised.item_id, &actor.id, reason, Utc::now());
        if !self.store.insert_dispute(&dispute).await? {
            tracing::warn!(
                "Item dispute on inspection {} rejected: no longer disputed",
                inspection_id
            );
            return Err(AppError::ConcurrencyAnomaly(format!(
                "Inspection {} changed while the dispute was being raised; reload and retry",
                inspection_id
            )));
        }

        tracing::info!(
            "Item dispute raised: id={}, inspection={}, item={}",
            dispute.id,
            inspection_id,
            dispute.item_id
        );
        Ok(dispute)
    }

    /// Record the owner's response. A `resolved_condition` also resolves the dispute
    /// and re-rates the item with that condition.
    pub async fn respond(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
        response: &str,
        resolved_condition: Option<ItemCondition>,
    ) -> Result<ItemDispute> {
        authorize(actor, Capability::RespondToDispute)?;
        let response = require_text("response", response)?;
        let mut dispute = self.find(dispute_id).await?;
        if dispute.is_resolved() {
            return Err(AppError::Conflict(format!(
                "Dispute {} is already resolved",
                dispute_id
            )));
        }

        let inspection = find_inspection(self.store.as_ref(), dispute.inspection_id).await?;
        if inspection.status.is_terminal() {
            return Err(AppError::invalid_transition(
                inspection.status,
                "respond to dispute",
                "the inspection is closed",
            ));
        }

        let now = Utc::now();
        dispute.owner_response = Some(response);
        dispute.responded_by = Some(actor.id.clone());
        dispute.responded_at = Some(now);
        dispute.updated_at = now;

        let item = match resolved_condition {
            Some(condition) => {
                dispute.status = DisputeStatus::Resolved;
                dispute.resolved_condition = Some(condition);
                dispute.resolved_at = Some(now);

                let mut item = self
                    .inspections
                    .item_in(dispute.inspection_id, dispute.item_id)
                    .await?;
                item.condition = Some(condition);
                item.checked_at = Some(now);
                item.updated_at = now;
                item.refresh_condition_changed();
                Some(item)
            }
            None => {
                dispute.status = DisputeStatus::OwnerResponded;
                None
            }
        };

        self.store
            .save_dispute_response(&dispute, item.as_ref())
            .await?;

        tracing::info!(
            "Dispute {}: id={}, inspection={}, by={}",
            dispute.status,
            dispute_id,
            dispute.inspection_id,
            actor.id
        );
        Ok(dispute)
    }

    pub async fn list(&self, actor: &Actor, inspection_id: Uuid) -> Result<Vec<ItemDispute>> {
        authorize(actor, Capability::ViewInspection)?;
        find_inspection(self.store.as_ref(), inspection_id).await?;
        self.store.list_disputes(inspection_id).await
    }

    pub async fn get(&self, actor: &Actor, dispute_id: Uuid) -> Result<ItemDispute> {
        authorize(actor, Capability::ViewInspection)?;
        self.find(dispute_id).await
    }

    async fn find(&self, id: Uuid) -> Result<ItemDispute> {
        self.store
            .get_dispute(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dispute {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{
        InspectionType, RateItem, RoomBlueprint, ScheduleInspection,
    };
    use crate::features::inspections::services::{CompleteInspection, LifecycleService};
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::test_helpers::{owner, store_with_property, tenant};

    struct Fixture {
        store: Arc<dyn InspectionStore>,
        disputes: DisputeService,
        inspections: Arc<InspectionService>,
        lifecycle: LifecycleService,
        inspection_id: Uuid,
        item_ids: Vec<Uuid>,
    }

    /// An inspection in tenant review with two rated items
    async fn in_review() -> Fixture {
        let (store, property_id) = store_with_property().await;
        let inspections = Arc::new(InspectionService::new(
            store.clone(),
            Arc::new(MemoryEvidenceStorage::new()),
        ));
        let lifecycle = LifecycleService::new(store.clone());

        let inspection = inspections
            .schedule(
                &owner(),
                ScheduleInspection {
                    property_id,
                    tenancy_id: Some(Uuid::new_v4()),
                    inspector_id: None,
                    inspection_type: InspectionType::Exit,
                    scheduled_date: "2026-06-30".to_string(),
                    scheduled_time: None,
                    compare_to_inspection_id: None,
                },
            )
            .await
            .unwrap();
        let rooms = inspections
            .expand_template(
                &owner(),
                inspection.id,
                &[RoomBlueprint {
                    name: "Bedroom".to_string(),
                    items: vec!["Carpet".to_string(), "Blind".to_string()],
                }],
            )
            .await
            .unwrap();
        lifecycle.start(&owner(), inspection.id).await.unwrap();
        let item_ids: Vec<Uuid> = rooms[0].items.iter().map(|i| i.id).collect();
        for id in &item_ids {
            inspections
                .rate_item(
                    &owner(),
                    inspection.id,
                    *id,
                    RateItem {
                        condition: ItemCondition::Damaged,
                        notes: None,
                        action_required: None,
                        action_description: None,
                        estimated_cost: None,
                    },
                )
                .await
                .unwrap();
        }
        lifecycle
            .complete(
                &owner(),
                inspection.id,
                CompleteInspection {
                    force: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        lifecycle
            .send_for_tenant_review(&owner(), inspection.id)
            .await
            .unwrap();

        Fixture {
            store: store.clone(),
            disputes: DisputeService::new(store, inspections.clone()),
            inspections,
            lifecycle,
            inspection_id: inspection.id,
            item_ids,
        }
    }

    #[tokio::test]
    async fn test_finalize_waits_for_resolution() {
        let f = in_review().await;
        let (_, opened) = f
            .lifecycle
            .dispute(
                &tenant(),
                f.inspection_id,
                "The carpet was already stained",
                vec![RaiseItemDispute {
                    item_id: f.item_ids[0],
                    reason: "Stain predates tenancy".to_string(),
                }],
            )
            .await
            .unwrap();

        let responded = f
            .disputes
            .respond(&owner(), opened[0].id, "We will check the entry photos", None)
            .await
            .unwrap();
        assert_eq!(responded.status, DisputeStatus::OwnerResponded);
        assert!(responded.resolved_at.is_none());

        let err = f.lifecycle.finalize(&owner(), f.inspection_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let resolved = f
            .disputes
            .respond(
                &owner(),
                opened[0].id,
                "Agreed, stain was pre-existing",
                Some(ItemCondition::Fair),
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, DisputeStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        let item = f
            .inspections
            .item_in(f.inspection_id, f.item_ids[0])
            .await
            .unwrap();
        assert_eq!(item.condition, Some(ItemCondition::Fair));

        let finalized = f.lifecycle.finalize(&owner(), f.inspection_id).await.unwrap();
        assert_eq!(finalized.status, InspectionStatus::Finalized);
    }

    #[tokio::test]
    async fn test_finalize_and_raise_do_not_interleave() {
        let f = in_review().await;
        f.lifecycle
            .dispute(&tenant(), f.inspection_id, "Several findings are wrong", vec![])
            .await
            .unwrap();

        // finalize decided with no open disputes, one is raised before it writes
        let mut finalized = f.inspections.get(&owner(), f.inspection_id).await.unwrap();
        finalized.status = InspectionStatus::Finalized;
        let late = ItemDispute::open(
            f.inspection_id,
            f.item_ids[0],
            "tenant-1",
            "Carpet stain predates tenancy".to_string(),
            Utc::now(),
        );
        assert!(f.store.insert_dispute(&late).await.unwrap());
        assert!(!f
            .store
            .update_inspection_if_settled(&finalized, InspectionStatus::Disputed)
            .await
            .unwrap());
        let stored = f.inspections.get(&owner(), f.inspection_id).await.unwrap();
        assert_eq!(stored.status, InspectionStatus::Disputed);

        // once finalized, a dispute raised from a stale read is refused
        f.disputes
            .respond(&owner(), late.id, "Agreed", Some(ItemCondition::Fair))
            .await
            .unwrap();
        f.lifecycle.finalize(&owner(), f.inspection_id).await.unwrap();
        let stale = ItemDispute::open(
            f.inspection_id,
            f.item_ids[1],
            "tenant-1",
            "Blind was broken at entry".to_string(),
            Utc::now(),
        );
        assert!(!f.store.insert_dispute(&stale).await.unwrap());
        let listed = f.disputes.list(&owner(), f.inspection_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_resolved());
    }

    #[tokio::test]
    async fn test_raise_more_disputes_while_disputed() {
        let f = in_review().await;
        let err = f
            .disputes
            .raise(
                &tenant(),
                f.inspection_id,
                RaiseItemDispute {
                    item_id: f.item_ids[1],
                    reason: "Blind was broken at entry".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        f.lifecycle
            .dispute(&tenant(), f.inspection_id, "Several findings are wrong", vec![])
            .await
            .unwrap();
        let raised = f
            .disputes
            .raise(
                &tenant(),
                f.inspection_id,
                RaiseItemDispute {
                    item_id: f.item_ids[1],
                    reason: "Blind was broken at entry".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(raised.status, DisputeStatus::Open);

        let listed = f.disputes.list(&owner(), f.inspection_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_response_rules() {
        let f = in_review().await;
        let (_, opened) = f
            .lifecycle
            .dispute(
                &tenant(),
                f.inspection_id,
                "Disagree",
                vec![RaiseItemDispute {
                    item_id: f.item_ids[1],
                    reason: "Blind works".to_string(),
                }],
            )
            .await
            .unwrap();

        let err = f
            .disputes
            .respond(&tenant(), opened[0].id, "I resolve it myself", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = f
            .disputes
            .respond(&owner(), opened[0].id, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        f.disputes
            .respond(&owner(), opened[0].id, "Conceded", Some(ItemCondition::Good))
            .await
            .unwrap();
        let err = f
            .disputes
            .respond(&owner(), opened[0].id, "Again", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
