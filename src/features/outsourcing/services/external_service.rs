use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{AccessTokenService, AssignmentService};
use crate::core::error::{AppError, Result};
use crate::features::auth::Actor;
use crate::features::inspections::models::{
    ImageMetadata, Inspection, InspectionImage, Item, OverallCondition, RateItem, Room,
    VoiceNote, VoiceNoteMetadata,
};
use crate::features::inspections::services::{
    find_inspection, CompleteInspection, InspectionDetail, InspectionService, LifecycleService,
};
use crate::features::outsourcing::models::{
    AccessToken, Assignment, AssignmentResponse, AssignmentState,
};
use crate::modules::store::InspectionStore;

/// Everything an external inspector can do, scoped by the presented access token
pub struct ExternalInspectionService {
    store: Arc<dyn InspectionStore>,
    tokens: Arc<AccessTokenService>,
    assignments: Arc<AssignmentService>,
    inspections: Arc<InspectionService>,
    lifecycle: Arc<LifecycleService>,
}

impl ExternalInspectionService {
    pub fn new(
        store: Arc<dyn InspectionStore>,
        tokens: Arc<AccessTokenService>,
        assignments: Arc<AssignmentService>,
        inspections: Arc<InspectionService>,
        lifecycle: Arc<LifecycleService>,
    ) -> Self {
        Self {
            store,
            tokens,
            assignments,
            inspections,
            lifecycle,
        }
    }

    async fn authenticate(&self, token: &str) -> Result<(AccessToken, Actor)> {
        let record = self.tokens.validate(token).await?;
        let actor = AccessTokenService::actor_for(&record);
        Ok((record, actor))
    }

    async fn accepted_assignment(&self, record: &AccessToken) -> Result<Assignment> {
        let assignment = self.assignments.get(record.assignment_id).await?;
        if assignment.state() != AssignmentState::Accepted {
            return Err(AppError::Conflict(
                "The assignment must be accepted before inspecting".to_string(),
            ));
        }
        Ok(assignment)
    }

    pub async fn view(&self, token: &str) -> Result<(Assignment, InspectionDetail)> {
        let (record, actor) = self.authenticate(token).await?;
        let assignment = self.assignments.get(record.assignment_id).await?;
        let detail = self
            .inspections
            .get_detail(&actor, record.inspection_id)
            .await?;
        Ok((assignment, detail))
    }

    pub async fn respond(&self, token: &str, response: AssignmentResponse) -> Result<Assignment> {
        let (record, actor) = self.authenticate(token).await?;
        self.assignments
            .respond(&actor, record.assignment_id, response)
            .await
    }

    pub async fn start(&self, token: &str) -> Result<Inspection> {
        let (record, actor) = self.authenticate(token).await?;
        self.accepted_assignment(&record).await?;
        self.lifecycle.start(&actor, record.inspection_id).await
    }

    pub async fn rate_item(&self, token: &str, item_id: Uuid, rating: RateItem) -> Result<Item> {
        let (record, actor) = self.authenticate(token).await?;
        self.accepted_assignment(&record).await?;
        self.inspections
            .rate_item(&actor, record.inspection_id, item_id, rating)
            .await
    }

    pub async fn complete_room(
        &self,
        token: &str,
        room_id: Uuid,
        overall_condition: Option<OverallCondition>,
        notes: Option<String>,
    ) -> Result<Room> {
        let (record, actor) = self.authenticate(token).await?;
        self.accepted_assignment(&record).await?;
        self.inspections
            .complete_room(
                &actor,
                record.inspection_id,
                room_id,
                overall_condition,
                notes,
            )
            .await
    }

    pub async fn upload_image(
        &self,
        token: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: ImageMetadata,
    ) -> Result<InspectionImage> {
        let (record, actor) = self.authenticate(token).await?;
        self.accepted_assignment(&record).await?;
        self.inspections
            .upload_image(&actor, record.inspection_id, data, content_type, metadata)
            .await
    }

    pub async fn upload_voice_note(
        &self,
        token: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: VoiceNoteMetadata,
    ) -> Result<VoiceNote> {
        let (record, actor) = self.authenticate(token).await?;
        self.accepted_assignment(&record).await?;
        self.inspections
            .upload_voice_note(&actor, record.inspection_id, data, content_type, metadata)
            .await
    }

    /// Complete the inspection, the assignment and the token in one unit.
    /// The token stops validating once this returns.
    pub async fn submit(&self, token: &str, data: CompleteInspection) -> Result<Inspection> {
        let (record, actor) = self.authenticate(token).await?;
        let mut assignment = self.accepted_assignment(&record).await?;

        let inspection = find_inspection(self.store.as_ref(), record.inspection_id).await?;
        let expected = inspection.status;
        let now = Utc::now();
        let completed = self
            .lifecycle
            .prepare_completion(&actor, inspection, data, now)
            .await?;

        assignment.completed_at = Some(now);
        assignment.updated_at = now;

        if !self
            .store
            .submit_outsourced_inspection(&completed, expected, &assignment, record.id, now)
            .await?
        {
            tracing::warn!(
                "Concurrent submission rejected: inspection={}, token={}",
                record.inspection_id,
                record.id
            );
            return Err(AppError::ConcurrencyAnomaly(format!(
                "Inspection {} was submitted concurrently",
                record.inspection_id
            )));
        }

        tracing::info!(
            "Outsourced inspection submitted: inspection={}, assignment={}, by={}",
            completed.id,
            assignment.id,
            actor.id
        );

        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{
        InspectionStatus, InspectionType, ItemCondition, RoomBlueprint, ScheduleInspection,
    };
    use crate::features::outsourcing::models::CreateAssignment;
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::test_helpers::{owner, store_with_property};
    use chrono::{NaiveDate, NaiveTime};

    struct Fixture {
        external: ExternalInspectionService,
        inspections: Arc<InspectionService>,
        lifecycle: Arc<LifecycleService>,
        token: String,
        inspection_id: Uuid,
    }

    async fn setup() -> Fixture {
        let (store, property_id) = store_with_property().await;
        let inspections = Arc::new(InspectionService::new(
            store.clone(),
            Arc::new(MemoryEvidenceStorage::new()),
        ));
        let lifecycle = Arc::new(LifecycleService::new(store.clone()));
        let assignments = Arc::new(AssignmentService::new(store.clone()));
        let tokens = Arc::new(AccessTokenService::new(
            store.clone(),
            "https://app.example.com",
        ));

        let inspection = inspections
            .schedule(
                &owner(),
                ScheduleInspection {
                    property_id,
                    tenancy_id: None,
                    inspector_id: None,
                    inspection_type: InspectionType::Routine,
                    scheduled_date: "2026-03-14".to_string(),
                    scheduled_time: None,
                    compare_to_inspection_id: None,
                },
            )
            .await
            .unwrap();
        inspections
            .expand_template(
                &owner(),
                inspection.id,
                &[RoomBlueprint {
                    name: "Kitchen".to_string(),
                    items: vec!["Benchtop".to_string()],
                }],
            )
            .await
            .unwrap();
        let assignment = assignments
            .create(
                &owner(),
                inspection.id,
                CreateAssignment {
                    inspector_id: "pro-1".to_string(),
                    inspector_email: "pro@example.com".to_string(),
                    proposed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                    proposed_time_start: None,
                    proposed_time_end: None,
                    fee_amount: None,
                },
            )
            .await
            .unwrap();
        let issued = tokens
            .issue(&owner(), inspection.id, assignment.id)
            .await
            .unwrap();

        Fixture {
            external: ExternalInspectionService::new(
                store,
                tokens,
                assignments,
                inspections.clone(),
                lifecycle.clone(),
            ),
            inspections,
            lifecycle,
            token: issued.token,
            inspection_id: inspection.id,
        }
    }

    fn accept() -> AssignmentResponse {
        AssignmentResponse::Accept {
            confirmed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            confirmed_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_cannot_start_before_accepting() {
        let f = setup().await;
        let err = f.external.start(&f.token).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    fn damaged() -> RateItem {
        RateItem {
            condition: ItemCondition::Damaged,
            notes: None,
            action_required: None,
            action_description: None,
            estimated_cost: None,
        }
    }

    #[tokio::test]
    async fn test_writes_require_accepted_assignment() {
        let f = setup().await;
        f.lifecycle.start(&owner(), f.inspection_id).await.unwrap();
        let (_, detail) = f.external.view(&f.token).await.unwrap();
        let room = &detail.rooms[0];

        let err = f
            .external
            .rate_item(&f.token, room.items[0].id, damaged())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = f
            .external
            .complete_room(&f.token, room.room.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = f
            .external
            .upload_image(
                &f.token,
                vec![0xFF, 0xD8, 0xFF],
                "image/jpeg",
                ImageMetadata::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = f.inspections.get_detail(&owner(), f.inspection_id).await.unwrap();
        assert!(stored.rooms[0].items[0].condition.is_none());
        assert!(stored.images.is_empty());
    }

    #[tokio::test]
    async fn test_declining_revokes_the_token() {
        let f = setup().await;
        f.external
            .respond(
                &f.token,
                AssignmentResponse::Decline {
                    reason: "busy".to_string(),
                },
            )
            .await
            .unwrap();
        f.lifecycle.start(&owner(), f.inspection_id).await.unwrap();

        assert!(matches!(
            f.external.view(&f.token).await,
            Err(AppError::InvalidToken)
        ));
        let items = f.inspections.get_detail(&owner(), f.inspection_id).await.unwrap();
        let err = f
            .external
            .rate_item(&f.token, items.rooms[0].items[0].id, damaged())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_full_outsourced_flow() {
        let f = setup().await;
        f.external.respond(&f.token, accept()).await.unwrap();
        f.external.start(&f.token).await.unwrap();

        let (_, detail) = f.external.view(&f.token).await.unwrap();
        let room = &detail.rooms[0];
        f.external
            .rate_item(
                &f.token,
                room.items[0].id,
                RateItem {
                    condition: ItemCondition::Good,
                    notes: None,
                    action_required: None,
                    action_description: None,
                    estimated_cost: None,
                },
            )
            .await
            .unwrap();
        f.external
            .complete_room(&f.token, room.room.id, None, None)
            .await
            .unwrap();

        let completed = f
            .external
            .submit(&f.token, CompleteInspection::default())
            .await
            .unwrap();
        assert_eq!(completed.status, InspectionStatus::Completed);

        assert!(matches!(
            f.external.view(&f.token).await,
            Err(AppError::InvalidToken)
        ));
        let stored = f.inspections.get(&owner(), f.inspection_id).await.unwrap();
        assert_eq!(stored.status, InspectionStatus::Completed);
    }

    #[tokio::test]
    async fn test_token_cannot_reach_other_inspections() {
        let f = setup().await;
        f.external.respond(&f.token, accept()).await.unwrap();
        f.external.start(&f.token).await.unwrap();

        let err = f
            .external
            .rate_item(
                &f.token,
                Uuid::new_v4(),
                RateItem {
                    condition: ItemCondition::Fair,
                    notes: None,
                    action_required: None,
                    action_description: None,
                    estimated_cost: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_submissions() {
        let f = setup().await;
        f.external.respond(&f.token, accept()).await.unwrap();
        f.external.start(&f.token).await.unwrap();

        let force = || CompleteInspection {
            force: true,
            ..Default::default()
        };
        let (a, b) = tokio::join!(
            f.external.submit(&f.token, force()),
            f.external.submit(&f.token, force())
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }
}
