use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, ActorRole, Capability};
use crate::features::inspections::models::InspectionStatus;
use crate::features::inspections::services::find_inspection;
use crate::features::outsourcing::models::{
    AssignedBy, Assignment, AssignmentResponse, AssignmentState, CreateAssignment,
};
use crate::modules::store::InspectionStore;
use crate::shared::validation::require_text;

/// Outsourcing of inspections to professional inspectors
pub struct AssignmentService {
    store: Arc<dyn InspectionStore>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn InspectionStore>) -> Self {
        Self { store }
    }

    /// Create the current assignment for an inspection. A new assignment may only
    /// replace a declined one; the replaced record is kept for audit.
    pub async fn create(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        data: CreateAssignment,
    ) -> Result<Assignment> {
        authorize(actor, Capability::ManageAssignments)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        if !matches!(
            inspection.status,
            InspectionStatus::Scheduled | InspectionStatus::InProgress
        ) {
            return Err(AppError::invalid_transition(
                inspection.status,
                "outsource",
                "only scheduled or in-progress inspections can be outsourced",
            ));
        }

        let replaces = match self.store.current_assignment(inspection_id).await? {
            Some(current) if current.state() != AssignmentState::Declined => {
                return Err(AppError::Conflict(format!(
                    "Inspection {} already has a {:?} assignment",
                    inspection_id,
                    current.state()
                )));
            }
            Some(current) => Some(current.id),
            None => None,
        };

        if let (Some(start), Some(end)) = (data.proposed_time_start, data.proposed_time_end) {
            if end <= start {
                return Err(AppError::Validation(
                    "proposed_time_end must be after proposed_time_start".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let assignment = Assignment {
            id: Uuid::new_v4(),
            inspection_id,
            inspector_id: require_text("inspector_id", &data.inspector_id)?,
            inspector_email: require_text("inspector_email", &data.inspector_email)?
                .to_lowercase(),
            assigned_by: match actor.role {
                ActorRole::Owner => AssignedBy::Owner,
                _ => AssignedBy::Agent,
            },
            assigned_by_id: actor.id.clone(),
            proposed_date: data.proposed_date,
            proposed_time_start: data.proposed_time_start,
            proposed_time_end: data.proposed_time_end,
            confirmed_date: None,
            confirmed_time: None,
            accepted: None,
            responded_at: None,
            decline_reason: None,
            completed_at: None,
            fee_amount: data.fee_amount,
            fee_paid: false,
            fee_paid_at: None,
            rating: None,
            review: None,
            is_current: true,
            superseded_at: None,
            created_at: now,
            updated_at: now,
        };

        if !self
            .store
            .create_assignment(&assignment, replaces, now)
            .await?
        {
            tracing::warn!(
                "Concurrent assignment of inspection {} rejected",
                inspection_id
            );
            return Err(AppError::Conflict(format!(
                "Inspection {} was assigned concurrently",
                inspection_id
            )));
        }

        tracing::info!(
            "Assignment created: id={}, inspection={}, inspector={}, by={}",
            assignment.id,
            inspection_id,
            assignment.inspector_id,
            actor.id
        );

        Ok(assignment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Assignment> {
        self.store
            .get_assignment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment {} not found", id)))
    }

    pub async fn list(&self, actor: &Actor, inspection_id: Uuid) -> Result<Vec<Assignment>> {
        authorize(actor, Capability::ViewInspection)?;
        find_inspection(self.store.as_ref(), inspection_id).await?;
        self.store.list_assignments(inspection_id).await
    }

    /// Accept or decline; the first answer wins
    pub async fn respond(
        &self,
        actor: &Actor,
        id: Uuid,
        response: AssignmentResponse,
    ) -> Result<Assignment> {
        authorize(actor, Capability::RespondToAssignment)?;
        let mut assignment = self.get(id).await?;
        self.ensure_assignee(actor, &assignment)?;

        if !assignment.is_current || assignment.state() != AssignmentState::Pending {
            return Err(AppError::Conflict(format!(
                "Assignment {} has already been answered",
                id
            )));
        }

        let now = Utc::now();
        match response {
            AssignmentResponse::Accept {
                confirmed_date,
                confirmed_time,
            } => {
                assignment.accepted = Some(true);
                assignment.confirmed_date = Some(confirmed_date);
                assignment.confirmed_time = Some(confirmed_time);
            }
            AssignmentResponse::Decline { reason } => {
                assignment.accepted = Some(false);
                assignment.decline_reason = Some(require_text("reason", &reason)?);
            }
        }
        assignment.responded_at = Some(now);
        assignment.updated_at = now;

        if !self.store.record_assignment_response(&assignment).await? {
            tracing::warn!("Concurrent response to assignment {} rejected", id);
            return Err(AppError::ConcurrencyAnomaly(format!(
                "Assignment {} was answered concurrently",
                id
            )));
        }

        tracing::info!(
            "Assignment {} {}: by={}",
            id,
            if assignment.accepted == Some(true) {
                "accepted"
            } else {
                "declined"
            },
            actor.id
        );

        Ok(assignment)
    }

    /// Record completion of accepted work and close its live access tokens
    pub async fn complete(&self, actor: &Actor, id: Uuid) -> Result<Assignment> {
        authorize(actor, Capability::CompleteAssignment)?;
        let mut assignment = self.get(id).await?;
        if actor.role == ActorRole::ExternalInspector {
            self.ensure_assignee(actor, &assignment)?;
        }
        if assignment.state() != AssignmentState::Accepted {
            return Err(AppError::Conflict(format!(
                "Assignment {} is {:?}, only accepted assignments can be completed",
                id,
                assignment.state()
            )));
        }

        let now = Utc::now();
        assignment.completed_at = Some(now);
        assignment.updated_at = now;
        self.store.update_assignment(&assignment).await?;

        for token in self.store.list_access_tokens(id).await? {
            if token.is_usable_at(now) {
                self.store.complete_access_token(token.id, now).await?;
            }
        }

        tracing::info!("Assignment completed: id={}, by={}", id, actor.id);
        Ok(assignment)
    }

    pub async fn mark_fee_paid(&self, actor: &Actor, id: Uuid) -> Result<Assignment> {
        authorize(actor, Capability::ManageAssignments)?;
        let mut assignment = self.get(id).await?;
        if assignment.fee_paid {
            return Ok(assignment);
        }

        let now = Utc::now();
        assignment.fee_paid = true;
        assignment.fee_paid_at = Some(now);
        assignment.updated_at = now;
        self.store.update_assignment(&assignment).await?;

        tracing::info!("Assignment fee paid: id={}", id);
        Ok(assignment)
    }

    /// Post-completion rating of the inspector, 1 to 5
    pub async fn rate_inspector(
        &self,
        actor: &Actor,
        id: Uuid,
        rating: i16,
        review: Option<String>,
    ) -> Result<Assignment> {
        authorize(actor, Capability::RateInspector)?;
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let mut assignment = self.get(id).await?;
        if assignment.state() != AssignmentState::Completed {
            return Err(AppError::Conflict(
                "Only completed assignments can be rated".to_string(),
            ));
        }

        assignment.rating = Some(rating);
        assignment.review = review
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        assignment.updated_at = Utc::now();
        self.store.update_assignment(&assignment).await?;

        tracing::info!("Inspector rated: assignment={}, rating={}", id, rating);
        Ok(assignment)
    }

    fn ensure_assignee(&self, actor: &Actor, assignment: &Assignment) -> Result<()> {
        let is_assignee = match actor.role {
            ActorRole::ExternalInspector => {
                actor.id.eq_ignore_ascii_case(&assignment.inspector_email)
            }
            _ => actor.id == assignment.inspector_id,
        };
        if is_assignee {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Assignment belongs to another inspector".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{
        Inspection, InspectionType, OutsourceMode, ScheduleInspection,
    };
    use crate::features::inspections::services::InspectionService;
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::modules::store::MemoryInspectionStore;
    use crate::shared::test_helpers::{owner, store_with_property};
    use chrono::{NaiveDate, NaiveTime};

    async fn setup() -> (AssignmentService, Arc<MemoryInspectionStore>, Inspection) {
        let (store, property_id) = store_with_property().await;
        let inspections =
            InspectionService::new(store.clone(), Arc::new(MemoryEvidenceStorage::new()));
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
        (AssignmentService::new(store.clone()), store, inspection)
    }

    fn proposal(inspector: &str) -> CreateAssignment {
        CreateAssignment {
            inspector_id: inspector.to_string(),
            inspector_email: format!("{}@example.com", inspector),
            proposed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            proposed_time_start: NaiveTime::from_hms_opt(9, 0, 0),
            proposed_time_end: NaiveTime::from_hms_opt(11, 0, 0),
            fee_amount: None,
        }
    }

    fn pro(name: &str) -> Actor {
        Actor::new(name, ActorRole::Inspector)
    }

    #[tokio::test]
    async fn test_create_marks_inspection_outsourced() {
        let (service, store, inspection) = setup().await;
        let assignment = service
            .create(&owner(), inspection.id, proposal("pro-1"))
            .await
            .unwrap();
        assert_eq!(assignment.assigned_by, AssignedBy::Owner);
        assert_eq!(assignment.state(), AssignmentState::Pending);

        let stored = store.get_inspection(inspection.id).await.unwrap().unwrap();
        assert!(stored.is_outsourced);
        assert_eq!(stored.outsource_mode, OutsourceMode::Professional);
    }

    #[tokio::test]
    async fn test_one_current_assignment() {
        let (service, store, inspection) = setup().await;
        let first = service
            .create(&owner(), inspection.id, proposal("pro-1"))
            .await
            .unwrap();

        let err = service
            .create(&owner(), inspection.id, proposal("pro-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service
            .respond(
                &pro("pro-1"),
                first.id,
                AssignmentResponse::Decline {
                    reason: "Fully booked".to_string(),
                },
            )
            .await
            .unwrap();

        let second = service
            .create(&owner(), inspection.id, proposal("pro-2"))
            .await
            .unwrap();

        let history = store.list_assignments(inspection.id).await.unwrap();
        assert_eq!(history.len(), 2);
        let old = history.iter().find(|a| a.id == first.id).unwrap();
        assert!(!old.is_current);
        assert!(old.superseded_at.is_some());
        assert_eq!(old.decline_reason.as_deref(), Some("Fully booked"));
        assert_eq!(
            store
                .current_assignment(inspection.id)
                .await
                .unwrap()
                .unwrap()
                .id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_replacement_must_match_current_assignment() {
        let (service, store, inspection) = setup().await;
        let first = service
            .create(&owner(), inspection.id, proposal("pro-1"))
            .await
            .unwrap();
        service
            .respond(
                &pro("pro-1"),
                first.id,
                AssignmentResponse::Decline {
                    reason: "Fully booked".to_string(),
                },
            )
            .await
            .unwrap();

        let (owner_a, owner_b) = (owner(), owner());
        let (a, b) = tokio::join!(
            service.create(&owner_a, inspection.id, proposal("pro-2")),
            service.create(&owner_b, inspection.id, proposal("pro-3"))
        );
        let winner = match (a, b) {
            (Ok(winner), Err(AppError::Conflict(_))) | (Err(AppError::Conflict(_)), Ok(winner)) => {
                winner
            }
            other => panic!("expected exactly one assignment, got {:?}", other),
        };

        // a writer that still believes the declined assignment is current
        let mut stale = winner.clone();
        stale.id = Uuid::new_v4();
        let now = Utc::now();
        assert!(!store
            .create_assignment(&stale, Some(first.id), now)
            .await
            .unwrap());
        assert!(!store.create_assignment(&stale, None, now).await.unwrap());

        let history = store.list_assignments(inspection.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            store
                .current_assignment(inspection.id)
                .await
                .unwrap()
                .unwrap()
                .id,
            winner.id
        );
    }

    #[tokio::test]
    async fn test_responses_are_exclusive() {
        let (service, _, inspection) = setup().await;
        let assignment = service
            .create(&owner(), inspection.id, proposal("pro-1"))
            .await
            .unwrap();

        let err = service
            .respond(
                &pro("pro-1"),
                assignment.id,
                AssignmentResponse::Decline {
                    reason: "  ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .respond(
                &pro("someone-else"),
                assignment.id,
                AssignmentResponse::Decline {
                    reason: "no".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let accepted = service
            .respond(
                &pro("pro-1"),
                assignment.id,
                AssignmentResponse::Accept {
                    confirmed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                    confirmed_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();
        assert_eq!(accepted.accepted, Some(true));

        let err = service
            .respond(
                &pro("pro-1"),
                assignment.id,
                AssignmentResponse::Decline {
                    reason: "changed my mind".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_then_rate() {
        let (service, _, inspection) = setup().await;
        let assignment = service
            .create(&owner(), inspection.id, proposal("pro-1"))
            .await
            .unwrap();

        let err = service
            .rate_inspector(&owner(), assignment.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service
            .respond(
                &pro("pro-1"),
                assignment.id,
                AssignmentResponse::Accept {
                    confirmed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                    confirmed_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();
        service.complete(&owner(), assignment.id).await.unwrap();

        let err = service
            .rate_inspector(&owner(), assignment.id, 6, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let rated = service
            .rate_inspector(&owner(), assignment.id, 4, Some("Thorough".to_string()))
            .await
            .unwrap();
        assert_eq!(rated.rating, Some(4));

        let paid = service.mark_fee_paid(&owner(), assignment.id).await.unwrap();
        assert!(paid.fee_paid);
        assert!(paid.fee_paid_at.is_some());
    }
}
