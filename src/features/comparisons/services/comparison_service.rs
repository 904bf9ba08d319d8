use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use minijinja::context;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, Capability};
use crate::features::comparisons::classifier::VisionClassifier;
use crate::features::comparisons::engine::{aggregate, align, build_issue, issue_key, Aggregates};
use crate::features::comparisons::models::{
    AiComparison, AiIssue, ComparisonStatus, OwnerDecision, RunClaim,
};
use crate::features::inspections::models::{Inspection, InspectionStatus};
use crate::features::inspections::services::find_inspection;
use crate::modules::store::InspectionStore;
use crate::shared::constants::COMPARISON_STALE_AFTER_MINUTES;
use crate::shared::prompts::render_comparison_summary;

/// A comparison with its current issue set
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComparisonDetail {
    pub comparison: AiComparison,
    pub issues: Vec<AiIssue>,
}

/// A run this caller has claimed; hand it to [`ComparisonService::execute`]
#[derive(Debug, Clone)]
pub struct ClaimedRun {
    pub comparison: AiComparison,
    reset_overrides: bool,
}

pub struct ComparisonService {
    store: Arc<dyn InspectionStore>,
    classifier: Arc<dyn VisionClassifier>,
    max_concurrency: usize,
}

impl ComparisonService {
    pub fn new(
        store: Arc<dyn InspectionStore>,
        classifier: Arc<dyn VisionClassifier>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            classifier,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Claim and execute in one call
    pub async fn run(
        &self,
        actor: &Actor,
        exit_inspection_id: Uuid,
        reset_overrides: bool,
    ) -> Result<AiComparison> {
        let run = self
            .claim(actor, exit_inspection_id, reset_overrides)
            .await?;
        Ok(self.execute(run).await)
    }

    /// Validate the pair and take the single-flight slot for it.
    ///
    /// Fails with `Conflict` while another run for the pair is in flight and not stale.
    pub async fn claim(
        &self,
        actor: &Actor,
        exit_inspection_id: Uuid,
        reset_overrides: bool,
    ) -> Result<ClaimedRun> {
        authorize(actor, Capability::RunComparison)?;
        let exit = find_inspection(self.store.as_ref(), exit_inspection_id).await?;
        let entry_id = exit.compare_to_inspection_id.ok_or_else(|| {
            AppError::Validation(format!(
                "Inspection {} has no entry inspection to compare against",
                exit.id
            ))
        })?;
        let entry = find_inspection(self.store.as_ref(), entry_id).await?;

        if entry.property_id != exit.property_id {
            return Err(AppError::Validation(
                "Entry and exit inspections belong to different properties".to_string(),
            ));
        }
        ensure_comparable(&entry)?;
        ensure_comparable(&exit)?;

        let now = Utc::now();
        let candidate = AiComparison::new(entry.id, exit.id, exit.property_id, &actor.id, now);
        let stale_before = now - Duration::minutes(COMPARISON_STALE_AFTER_MINUTES);

        match self
            .store
            .claim_comparison_run(&candidate, stale_before, now)
            .await?
        {
            RunClaim::Claimed(comparison) => {
                tracing::info!(
                    "Comparison run claimed: id={}, entry={}, exit={}, run={}, by={}",
                    comparison.id,
                    entry.id,
                    exit.id,
                    comparison.run_count,
                    actor.id
                );
                Ok(ClaimedRun {
                    comparison,
                    reset_overrides,
                })
            }
            RunClaim::AlreadyRunning(comparison) => {
                tracing::warn!(
                    "Comparison {} already running since {:?}",
                    comparison.id,
                    comparison.started_at
                );
                Err(AppError::Conflict(format!(
                    "Comparison {} is already running",
                    comparison.id
                )))
            }
        }
    }

    /// Classify every changed item, then publish the issue set and aggregates at once.
    ///
    /// Failures are recorded on the comparison (`failed` + `error_message`) and the
    /// previously published issues stay untouched.
    pub async fn execute(&self, run: ClaimedRun) -> AiComparison {
        let mut comparison = run.comparison;
        match self.classify_and_publish(&mut comparison, run.reset_overrides).await {
            Ok(()) => comparison,
            Err(e) => {
                let now = Utc::now();
                comparison.status = ComparisonStatus::Failed;
                comparison.error_message = Some(e.to_string());
                comparison.completed_at = Some(now);
                comparison.updated_at = now;
                tracing::error!("Comparison {} failed: {}", comparison.id, e);
                if let Err(store_err) = self.store.fail_comparison(&comparison).await {
                    tracing::error!(
                        "Could not record failure of comparison {}: {}",
                        comparison.id,
                        store_err
                    );
                }
                comparison
            }
        }
    }

    async fn classify_and_publish(
        &self,
        comparison: &mut AiComparison,
        reset_overrides: bool,
    ) -> Result<()> {
        let entry_rooms = self.store.list_rooms(comparison.entry_inspection_id).await?;
        let exit_rooms = self.store.list_rooms(comparison.exit_inspection_id).await?;
        let entry_images = self.store.list_images(comparison.entry_inspection_id).await?;
        let exit_images = self.store.list_images(comparison.exit_inspection_id).await?;

        let changed = align(&entry_rooms, &exit_rooms, &entry_images, &exit_images);
        tracing::debug!(
            "Comparison {}: {} changed item(s) to classify",
            comparison.id,
            changed.len()
        );

        let shared = Arc::clone(&self.classifier);
        let mut results = stream::iter(changed.iter().cloned().enumerate())
            .map(move |(index, item)| {
                let classifier = Arc::clone(&shared);
                async move {
                    let result = classifier
                        .classify(&item.entry, &item.exit, &item.item_name)
                        .await;
                    (index, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let now = Utc::now();
        let mut issues = Vec::with_capacity(results.len());
        for (index, result) in results {
            let classification = result?;
            issues.push(build_issue(comparison.id, &changed[index], classification, now));
        }

        if !reset_overrides {
            let previous: HashMap<_, _> = self
                .store
                .list_issues(comparison.id)
                .await?
                .into_iter()
                .filter(AiIssue::has_owner_decision)
                .map(|issue| (issue_key(&issue), issue))
                .collect();
            for issue in issues.iter_mut() {
                if let Some(old) = previous.get(&issue_key(issue)) {
                    issue.inherit_decision(old);
                }
            }
        }

        let totals = aggregate(&issues);
        totals.apply_to(comparison);
        comparison.summary = summarize(&totals, &issues);
        comparison.status = ComparisonStatus::Completed;
        comparison.error_message = None;
        comparison.completed_at = Some(now);
        comparison.updated_at = now;

        self.store.publish_comparison(comparison, &issues).await?;

        tracing::info!(
            "Comparison completed: id={}, issues={}, bond_deduction={}, recommended={}",
            comparison.id,
            comparison.total_issues,
            comparison.bond_deduction_amount,
            comparison.bond_deduction_recommended
        );
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<ComparisonDetail> {
        authorize(actor, Capability::ViewInspection)?;
        let comparison = self.find(id).await?;
        let issues = self.store.list_issues(id).await?;
        Ok(ComparisonDetail { comparison, issues })
    }

    /// Comparisons where the inspection is either the entry or the exit side
    pub async fn list(&self, actor: &Actor, inspection_id: Uuid) -> Result<Vec<AiComparison>> {
        authorize(actor, Capability::ViewInspection)?;
        find_inspection(self.store.as_ref(), inspection_id).await?;
        self.store.list_comparisons(inspection_id).await
    }

    /// Record the owner's agreement or override and recompute the recommendation
    pub async fn decide_issue(
        &self,
        actor: &Actor,
        issue_id: Uuid,
        decision: OwnerDecision,
    ) -> Result<ComparisonDetail> {
        authorize(actor, Capability::OverrideIssue)?;
        if let OwnerDecision::Override {
            estimated_cost: Some(cost),
            ..
        } = &decision
        {
            if cost.is_sign_negative() {
                return Err(AppError::Validation(
                    "estimated_cost must not be negative".to_string(),
                ));
            }
        }

        let issue = self
            .store
            .get_issue(issue_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", issue_id)))?;
        let mut comparison = self.find(issue.comparison_id).await?;
        if comparison.status == ComparisonStatus::Processing {
            return Err(AppError::Conflict(
                "Comparison is being re-run; try again when it finishes".to_string(),
            ));
        }

        let now = Utc::now();
        let mut issues = self.store.list_issues(comparison.id).await?;
        let slot = issues
            .iter_mut()
            .find(|i| i.id == issue_id)
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", issue_id)))?;
        slot.apply_decision(decision, &actor.id, now);
        let updated = slot.clone();

        let totals = aggregate(&issues);
        totals.apply_to(&mut comparison);
        comparison.summary = summarize(&totals, &issues);
        comparison.updated_at = now;

        if !self.store.save_issue_decision(&updated, &comparison).await? {
            tracing::warn!(
                "Issue decision on {} not saved: comparison {} changed underneath it",
                issue_id,
                comparison.id
            );
            return Err(AppError::Conflict(
                "Comparison is being re-run; try again when it finishes".to_string(),
            ));
        }

        tracing::info!(
            "Issue decision recorded: issue={}, agreed={:?}, recommended={}, by={}",
            issue_id,
            updated.owner_agreed,
            comparison.bond_deduction_recommended,
            actor.id
        );

        Ok(ComparisonDetail { comparison, issues })
    }

    async fn find(&self, id: Uuid) -> Result<AiComparison> {
        self.store
            .get_comparison(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comparison {} not found", id)))
    }
}

fn ensure_comparable(inspection: &Inspection) -> Result<()> {
    match inspection.status {
        InspectionStatus::Completed
        | InspectionStatus::TenantReview
        | InspectionStatus::Disputed
        | InspectionStatus::Finalized => Ok(()),
        status => Err(AppError::invalid_transition(
            status,
            "compare",
            "both inspections must be completed",
        )),
    }
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    room_name: &'a str,
    item_name: &'a str,
    change_type: String,
    estimated_cost: String,
}

fn summarize(totals: &Aggregates, issues: &[AiIssue]) -> Option<String> {
    let mut ranked: Vec<&AiIssue> = issues.iter().collect();
    ranked.sort_by(|a, b| b.estimated_cost.cmp(&a.estimated_cost));
    let top_issues: Vec<SummaryLine<'_>> = ranked
        .into_iter()
        .take(5)
        .map(|issue| {
            let effective = issue.assessment().classification().clone();
            SummaryLine {
                room_name: &issue.room_name,
                item_name: &issue.item_name,
                change_type: effective.change_type.to_string(),
                estimated_cost: effective.estimated_cost.to_string(),
            }
        })
        .collect();

    let ctx = context! {
        total_issues => totals.total_issues,
        tenant_responsible_count => totals.tenant_responsible_count,
        wear_and_tear_count => totals.wear_and_tear_count,
        total_estimated_cost => totals.total_estimated_cost.to_string(),
        bond_deduction_amount => totals.bond_deduction_amount.to_string(),
        bond_deduction_recommended => totals.bond_deduction_recommended.to_string(),
        top_issues => top_issues,
    };
    match render_comparison_summary(ctx) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!("Comparison summary not rendered: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::comparisons::classifier::fake::FakeClassifier;
    use crate::features::comparisons::models::ChangeType;
    use crate::features::inspections::models::{
        ImageMetadata, InspectionType, ItemCondition, RateItem, RoomBlueprint,
        ScheduleInspection,
    };
    use crate::features::inspections::services::{
        CompleteInspection, InspectionService, LifecycleService,
    };
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::test_helpers::{inspector, owner, store_with_property, tenant};
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<dyn InspectionStore>,
        service: ComparisonService,
        classifier: Arc<FakeClassifier>,
        inspections: InspectionService,
        lifecycle: LifecycleService,
        property_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let (store, property_id) = store_with_property().await;
        let classifier = Arc::new(FakeClassifier::new());
        Fixture {
            store: store.clone(),
            service: ComparisonService::new(store.clone(), classifier.clone(), 2),
            classifier,
            inspections: InspectionService::new(
                store.clone(),
                Arc::new(MemoryEvidenceStorage::new()),
            ),
            lifecycle: LifecycleService::new(store),
            property_id,
        }
    }

    impl Fixture {
        /// Schedule, rate every item and complete an inspection
        async fn inspected(
            &self,
            inspection_type: InspectionType,
            compare_to: Option<Uuid>,
            ratings: &[(&str, &str, ItemCondition)],
            photograph: bool,
        ) -> Uuid {
            let actor = inspector();
            let inspection = self
                .inspections
                .schedule(
                    &actor,
                    ScheduleInspection {
                        property_id: self.property_id,
                        tenancy_id: None,
                        inspector_id: None,
                        inspection_type,
                        scheduled_date: "2026-03-14".to_string(),
                        scheduled_time: None,
                        compare_to_inspection_id: compare_to,
                    },
                )
                .await
                .unwrap();

            let mut blueprints: Vec<RoomBlueprint> = Vec::new();
            for (room, item, _) in ratings {
                match blueprints.iter_mut().find(|b| b.name == *room) {
                    Some(b) => b.items.push(item.to_string()),
                    None => blueprints.push(RoomBlueprint {
                        name: room.to_string(),
                        items: vec![item.to_string()],
                    }),
                }
            }
            let rooms = self
                .inspections
                .expand_template(&actor, inspection.id, &blueprints)
                .await
                .unwrap();
            self.lifecycle.start(&actor, inspection.id).await.unwrap();

            for room in &rooms {
                for item in &room.items {
                    let (_, _, condition) = ratings
                        .iter()
                        .find(|(r, i, _)| *r == room.room.name && *i == item.name)
                        .unwrap();
                    self.inspections
                        .rate_item(
                            &actor,
                            inspection.id,
                            item.id,
                            RateItem {
                                condition: *condition,
                                notes: None,
                                action_required: None,
                                action_description: None,
                                estimated_cost: None,
                            },
                        )
                        .await
                        .unwrap();
                    if photograph {
                        self.inspections
                            .upload_image(
                                &actor,
                                inspection.id,
                                vec![0xFF, 0xD8, 0xFF],
                                "image/jpeg",
                                ImageMetadata {
                                    room_id: Some(room.room.id),
                                    item_id: Some(item.id),
                                    ..Default::default()
                                },
                            )
                            .await
                            .unwrap();
                    }
                }
            }
            self.lifecycle
                .complete(
                    &actor,
                    inspection.id,
                    CompleteInspection {
                        force: true,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            inspection.id
        }

        async fn pair(
            &self,
            entry: &[(&str, &str, ItemCondition)],
            exit: &[(&str, &str, ItemCondition)],
            photograph: bool,
        ) -> Uuid {
            let entry_id = self
                .inspected(InspectionType::Entry, None, entry, photograph)
                .await;
            self.inspected(InspectionType::Exit, Some(entry_id), exit, photograph)
                .await
        }
    }

    #[tokio::test]
    async fn test_carpet_damage_without_photos() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[("Bedroom", "Carpet", ItemCondition::Good)],
                &[("Bedroom", "Carpet", ItemCondition::Damaged)],
                false,
            )
            .await;
        let bare = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(bare.status, ComparisonStatus::Completed);
        assert_eq!(bare.total_issues, 1);

        let detail = f.service.get(&owner(), bare.id).await.unwrap();
        let issue = &detail.issues[0];
        assert_eq!(issue.item_name, "Carpet");
        assert!(matches!(
            issue.change_type,
            ChangeType::MinorDamage | ChangeType::MajorDamage
        ));
        assert!(issue.is_tenant_responsible);
        assert_eq!(bare.bond_deduction_amount, issue.estimated_cost);

        let f2 = fixture().await;
        let exit_id = f2
            .pair(
                &[("Bedroom", "Carpet", ItemCondition::Good)],
                &[("Bedroom", "Carpet", ItemCondition::Damaged)],
                true,
            )
            .await;
        let photographed = f2.service.run(&owner(), exit_id, false).await.unwrap();
        let photographed = f2.service.get(&owner(), photographed.id).await.unwrap();
        assert!(issue.confidence < photographed.issues[0].confidence);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_and_keeps_overrides() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[
                    ("Lounge", "Carpet", ItemCondition::Good),
                    ("Lounge", "Walls", ItemCondition::Good),
                    ("Kitchen", "Oven", ItemCondition::Good),
                ],
                &[
                    ("Lounge", "Carpet", ItemCondition::Damaged),
                    ("Lounge", "Walls", ItemCondition::Fair),
                    ("Kitchen", "Oven", ItemCondition::Good),
                ],
                false,
            )
            .await;

        let first = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(first.total_issues, 2);
        assert_eq!(first.tenant_responsible_count, 1);
        assert_eq!(first.wear_and_tear_count, 1);
        assert_eq!(first.bond_deduction_amount, Decimal::new(450, 0));

        let detail = f.service.get(&owner(), first.id).await.unwrap();
        let carpet = detail
            .issues
            .iter()
            .find(|i| i.item_name == "Carpet")
            .unwrap();
        let decided = f
            .service
            .decide_issue(
                &owner(),
                carpet.id,
                OwnerDecision::Override {
                    change_type: None,
                    is_tenant_responsible: None,
                    estimated_cost: Some(Decimal::new(200, 0)),
                    notes: Some("carpet was already worn".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(decided.comparison.bond_deduction_amount, Decimal::new(450, 0));
        assert_eq!(
            decided.comparison.bond_deduction_recommended,
            Decimal::new(200, 0)
        );

        let second = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.run_count, 2);
        assert_eq!(second.total_issues, first.total_issues);
        assert_eq!(second.tenant_responsible_count, first.tenant_responsible_count);
        assert_eq!(second.bond_deduction_amount, first.bond_deduction_amount);
        assert_eq!(second.bond_deduction_recommended, Decimal::new(200, 0));

        let reset = f.service.run(&owner(), exit_id, true).await.unwrap();
        assert_eq!(reset.bond_deduction_recommended, Decimal::new(450, 0));
    }

    #[tokio::test]
    async fn test_rerun_keeps_decisions_per_item_with_duplicate_names() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[
                    ("Bedroom", "Window", ItemCondition::Good),
                    ("Bedroom", "Window", ItemCondition::Good),
                ],
                &[
                    ("Bedroom", "Window", ItemCondition::Damaged),
                    ("Bedroom", "Window", ItemCondition::Damaged),
                ],
                false,
            )
            .await;

        let first = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(first.total_issues, 2);
        assert_eq!(first.bond_deduction_recommended, Decimal::new(900, 0));

        let detail = f.service.get(&owner(), first.id).await.unwrap();
        let target_item = detail.issues[0].item_id;
        let decided = f
            .service
            .decide_issue(
                &owner(),
                detail.issues[0].id,
                OwnerDecision::Override {
                    change_type: None,
                    is_tenant_responsible: Some(false),
                    estimated_cost: None,
                    notes: Some("cracked before the tenancy".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            decided.comparison.bond_deduction_recommended,
            Decimal::new(450, 0)
        );

        let second = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(second.bond_deduction_amount, Decimal::new(900, 0));
        assert_eq!(second.bond_deduction_recommended, Decimal::new(450, 0));

        let detail = f.service.get(&owner(), second.id).await.unwrap();
        let decided: Vec<_> = detail
            .issues
            .iter()
            .filter(|i| i.has_owner_decision())
            .collect();
        assert_eq!(decided.len(), 1);
        assert_eq!(decided[0].item_id, target_item);
    }

    #[tokio::test]
    async fn test_decision_does_not_settle_a_claimed_run() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[("Hallway", "Carpet", ItemCondition::Good)],
                &[("Hallway", "Carpet", ItemCondition::Damaged)],
                false,
            )
            .await;
        let first = f.service.run(&owner(), exit_id, false).await.unwrap();
        let detail = f.service.get(&owner(), first.id).await.unwrap();

        // decision computed against the completed run, written after a new claim
        let _run = f.service.claim(&owner(), exit_id, false).await.unwrap();
        let mut issue = detail.issues[0].clone();
        issue.apply_decision(OwnerDecision::Agree { notes: None }, "owner-1", Utc::now());
        let saved = f
            .store
            .save_issue_decision(&issue, &detail.comparison)
            .await
            .unwrap();
        assert!(!saved);

        let current = f.store.get_comparison(first.id).await.unwrap().unwrap();
        assert_eq!(current.status, ComparisonStatus::Processing);
        assert!(f.store.list_issues(first.id).await.unwrap()[0]
            .owner_agreed
            .is_none());
        let err = f.service.claim(&owner(), exit_id, false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_claimed_run_executes_in_spawned_task() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[("Laundry", "Tub", ItemCondition::Good)],
                &[("Laundry", "Tub", ItemCondition::Missing)],
                false,
            )
            .await;
        let service = Arc::new(f.service);

        let run = service.claim(&owner(), exit_id, false).await.unwrap();
        let worker = Arc::clone(&service);
        let done = tokio::spawn(async move { worker.execute(run).await })
            .await
            .unwrap();
        assert_eq!(done.status, ComparisonStatus::Completed);
        assert_eq!(done.bond_deduction_amount, Decimal::new(300, 0));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_issues() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[("Bathroom", "Mirror", ItemCondition::Good)],
                &[("Bathroom", "Mirror", ItemCondition::Missing)],
                false,
            )
            .await;
        let ok = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(ok.total_issues, 1);

        f.classifier.fail_on("Mirror");
        let failed = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(failed.status, ComparisonStatus::Failed);
        assert!(failed.error_message.is_some());

        let detail = f.service.get(&owner(), ok.id).await.unwrap();
        assert_eq!(detail.comparison.status, ComparisonStatus::Failed);
        assert_eq!(detail.issues.len(), 1);

        f.classifier.clear_failures();
        let retried = f.service.run(&owner(), exit_id, false).await.unwrap();
        assert_eq!(retried.status, ComparisonStatus::Completed);
        assert!(retried.error_message.is_none());
    }

    #[tokio::test]
    async fn test_single_flight() {
        let f = fixture().await;
        let exit_id = f
            .pair(
                &[("Bedroom", "Blind", ItemCondition::Good)],
                &[("Bedroom", "Blind", ItemCondition::Poor)],
                false,
            )
            .await;

        let run = f.service.claim(&owner(), exit_id, false).await.unwrap();
        let err = f.service.claim(&owner(), exit_id, false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let done = f.service.execute(run).await;
        assert_eq!(done.status, ComparisonStatus::Completed);
        assert!(f.service.claim(&owner(), exit_id, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_pair_validation() {
        let f = fixture().await;
        let entry_id = f
            .inspected(
                InspectionType::Entry,
                None,
                &[("Bedroom", "Blind", ItemCondition::Good)],
                false,
            )
            .await;
        let err = f.service.run(&owner(), entry_id, false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f.service.run(&tenant(), entry_id, false).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(f.classifier.call_count(), 0);
    }
}
