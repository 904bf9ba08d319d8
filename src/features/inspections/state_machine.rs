//! Inspection lifecycle graph.
//!
//! ```text
//! scheduled -> in_progress -> completed -> tenant_review -> finalized
//!                                                        \-> disputed -> finalized
//! any non-terminal -> cancelled
//! ```
//!
//! [`check_transition`] is pure: callers gather the facts the preconditions need and
//! the store applies the result with a compare-and-set on the current status.

use crate::core::error::{AppError, Result};
use crate::features::inspections::models::InspectionStatus;

use InspectionStatus::*;

/// Facts about an inspection that transition preconditions depend on
#[derive(Debug, Clone, Default)]
pub struct TransitionFacts {
    /// Rooms without `completed_at`
    pub incomplete_rooms: usize,
    /// Caller asked to complete despite incomplete rooms
    pub force_complete: bool,
    pub has_tenancy: bool,
    pub has_tenant_signature: bool,
    /// Trimmed dispute text, when disputing
    pub dispute_text: Option<String>,
    /// Per-item disputes not yet resolved
    pub unresolved_disputes: usize,
}

/// Statuses reachable from `from` in one step
pub fn successors(from: InspectionStatus) -> &'static [InspectionStatus] {
    match from {
        Scheduled => &[InProgress, Cancelled],
        InProgress => &[Completed, Cancelled],
        Completed => &[TenantReview, Cancelled],
        TenantReview => &[Finalized, Disputed, Cancelled],
        Disputed => &[Finalized, Cancelled],
        Finalized | Cancelled => &[],
    }
}

/// Validate `current -> requested` against the graph and its preconditions
pub fn check_transition(
    current: InspectionStatus,
    requested: InspectionStatus,
    facts: &TransitionFacts,
) -> Result<()> {
    if current.is_terminal() {
        return Err(AppError::invalid_transition(
            current,
            requested,
            format!("inspection is {} and can no longer change", current),
        ));
    }
    if !successors(current).contains(&requested) {
        return Err(AppError::invalid_transition(
            current,
            requested,
            format!("'{}' is not reachable from '{}'", requested, current),
        ));
    }

    match (current, requested) {
        (InProgress, Completed) if facts.incomplete_rooms > 0 && !facts.force_complete => {
            Err(AppError::invalid_transition(
                current,
                requested,
                format!(
                    "{} room(s) are not completed; complete them or force completion",
                    facts.incomplete_rooms
                ),
            ))
        }
        (Completed, TenantReview) if !facts.has_tenancy => Err(AppError::invalid_transition(
            current,
            requested,
            "no tenancy is linked, so there is no tenant to review",
        )),
        (TenantReview, Finalized) if !facts.has_tenant_signature => {
            Err(AppError::invalid_transition(
                current,
                requested,
                "tenant acknowledgment requires a signature",
            ))
        }
        (TenantReview, Disputed)
            if facts
                .dispute_text
                .as_deref()
                .map_or(true, |text| text.is_empty()) =>
        {
            Err(AppError::invalid_transition(
                current,
                requested,
                "dispute text must not be empty",
            ))
        }
        (Disputed, Finalized) if facts.unresolved_disputes > 0 => {
            Err(AppError::invalid_transition(
                current,
                requested,
                format!(
                    "{} item dispute(s) are not resolved",
                    facts.unresolved_disputes
                ),
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_of(err: AppError) -> String {
        match err {
            AppError::InvalidTransition { reason, .. } => reason,
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_happy_path_edges() {
        let facts = TransitionFacts {
            has_tenancy: true,
            has_tenant_signature: true,
            ..Default::default()
        };
        assert!(check_transition(Scheduled, InProgress, &facts).is_ok());
        assert!(check_transition(InProgress, Completed, &facts).is_ok());
        assert!(check_transition(Completed, TenantReview, &facts).is_ok());
        assert!(check_transition(TenantReview, Finalized, &facts).is_ok());
    }

    #[test]
    fn test_cannot_skip_states() {
        let facts = TransitionFacts::default();
        let err = check_transition(Scheduled, Completed, &facts).unwrap_err();
        match err {
            AppError::InvalidTransition {
                current, requested, ..
            } => {
                assert_eq!(current, "scheduled");
                assert_eq!(requested, "completed");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(check_transition(Completed, Finalized, &facts).is_err());
        assert!(check_transition(InProgress, TenantReview, &facts).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let facts = TransitionFacts::default();
        for terminal in [Finalized, Cancelled] {
            assert!(check_transition(terminal, Cancelled, &facts).is_err());
            assert!(check_transition(terminal, InProgress, &facts).is_err());
            assert!(successors(terminal).is_empty());
        }
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        let facts = TransitionFacts::default();
        for status in [Scheduled, InProgress, Completed, TenantReview, Disputed] {
            assert!(check_transition(status, Cancelled, &facts).is_ok());
        }
    }

    #[test]
    fn test_completion_requires_rooms_unless_forced() {
        let mut facts = TransitionFacts {
            incomplete_rooms: 2,
            ..Default::default()
        };
        let reason = reason_of(check_transition(InProgress, Completed, &facts).unwrap_err());
        assert!(reason.contains("2 room(s)"));

        facts.force_complete = true;
        assert!(check_transition(InProgress, Completed, &facts).is_ok());
    }

    #[test]
    fn test_tenant_review_needs_tenancy() {
        let facts = TransitionFacts::default();
        let reason = reason_of(check_transition(Completed, TenantReview, &facts).unwrap_err());
        assert!(reason.contains("tenancy"));
    }

    #[test]
    fn test_dispute_needs_text() {
        let mut facts = TransitionFacts::default();
        assert!(check_transition(TenantReview, Disputed, &facts).is_err());
        facts.dispute_text = Some(String::new());
        assert!(check_transition(TenantReview, Disputed, &facts).is_err());
        facts.dispute_text = Some("Carpet stain was there at entry".to_string());
        assert!(check_transition(TenantReview, Disputed, &facts).is_ok());
    }

    #[test]
    fn test_disputed_finalize_blocked_until_resolved() {
        let mut facts = TransitionFacts {
            unresolved_disputes: 1,
            ..Default::default()
        };
        let reason = reason_of(check_transition(Disputed, Finalized, &facts).unwrap_err());
        assert!(reason.contains("not resolved"));

        facts.unresolved_disputes = 0;
        assert!(check_transition(Disputed, Finalized, &facts).is_ok());
    }
}
