use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, ActorRole, Capability};
use crate::features::outsourcing::models::{AccessToken, AssignmentState, IssuedAccessToken};
use crate::features::outsourcing::token::{
    expiry_from, generate_token, hash_token, is_well_formed, validate_at,
};
use crate::modules::store::InspectionStore;

/// Issues and checks the bearer tokens that scope an external inspector to one inspection
pub struct AccessTokenService {
    store: Arc<dyn InspectionStore>,
    frontend_url: String,
}

impl AccessTokenService {
    pub fn new(store: Arc<dyn InspectionStore>, frontend_url: impl Into<String>) -> Self {
        Self {
            store,
            frontend_url: frontend_url.into(),
        }
    }

    /// Mint a 48-hour token for the current assignment's inspector.
    /// Any live token for the same inspection, assignment and email is revoked.
    pub async fn issue(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<IssuedAccessToken> {
        authorize(actor, Capability::ManageAccessTokens)?;
        let assignment = self
            .store
            .get_assignment(assignment_id)
            .await?
            .filter(|a| a.inspection_id == inspection_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Assignment {} not found", assignment_id))
            })?;

        if !assignment.is_current {
            return Err(AppError::Conflict(
                "Tokens can only be issued for the current assignment".to_string(),
            ));
        }
        if matches!(
            assignment.state(),
            AssignmentState::Declined | AssignmentState::Completed
        ) {
            return Err(AppError::Conflict(format!(
                "Assignment {} is {:?}",
                assignment_id,
                assignment.state()
            )));
        }

        let now = Utc::now();
        let token = generate_token();
        let record = AccessToken {
            id: Uuid::new_v4(),
            token_hash: hash_token(&token),
            inspection_id,
            assignment_id,
            email: assignment.inspector_email.clone(),
            expires_at: expiry_from(now),
            used_at: None,
            completed_at: None,
            revoked: false,
            revoked_at: None,
            created_at: now,
        };
        self.store.insert_access_token(&record, now).await?;

        tracing::info!(
            "Access token issued: id={}, inspection={}, assignment={}, expires_at={}",
            record.id,
            inspection_id,
            assignment_id,
            record.expires_at
        );

        Ok(IssuedAccessToken { token, record })
    }

    /// Link the external inspector opens; carries the plaintext token
    pub fn access_link(&self, token: &str) -> String {
        format!("{}/inspect/{}", self.frontend_url, token)
    }

    pub async fn validate(&self, token: &str) -> Result<AccessToken> {
        self.validate_at(token, Utc::now()).await
    }

    /// Resolve a presented token; every failure is the same generic `InvalidToken`
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessToken> {
        if !is_well_formed(token) {
            return Err(AppError::InvalidToken);
        }
        let record = self.store.find_access_token(&hash_token(token)).await?;
        let record = validate_at(record, now)?;
        if record.used_at.is_none() {
            self.store.touch_access_token(record.id, now).await?;
        }
        Ok(record)
    }

    /// Identity an external inspector acts under for the token's lifetime
    pub fn actor_for(record: &AccessToken) -> Actor {
        Actor::new(record.email.clone(), ActorRole::ExternalInspector)
    }

    pub async fn revoke(&self, actor: &Actor, token_id: Uuid) -> Result<AccessToken> {
        self.revoke_at(actor, token_id, Utc::now()).await
    }

    pub async fn revoke_at(
        &self,
        actor: &Actor,
        token_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AccessToken> {
        authorize(actor, Capability::ManageAccessTokens)?;
        let record = self
            .store
            .get_access_token(token_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access token {} not found", token_id)))?;

        if self.store.revoke_access_token(token_id, now).await? {
            tracing::info!("Access token revoked: id={}, by={}", token_id, actor.id);
        }

        Ok(AccessToken {
            revoked: true,
            revoked_at: record.revoked_at.or(Some(now)),
            ..record
        })
    }

    pub async fn list(&self, actor: &Actor, assignment_id: Uuid) -> Result<Vec<AccessToken>> {
        authorize(actor, Capability::ManageAccessTokens)?;
        self.store.list_access_tokens(assignment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{InspectionType, ScheduleInspection};
    use crate::features::inspections::services::InspectionService;
    use crate::features::outsourcing::models::CreateAssignment;
    use crate::features::outsourcing::services::AssignmentService;
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::test_helpers::{owner, store_with_property, tenant};
    use chrono::{Duration, NaiveDate};

    struct Fixture {
        tokens: AccessTokenService,
        inspection_id: Uuid,
        assignment_id: Uuid,
    }

    async fn setup() -> Fixture {
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
        let assignment = AssignmentService::new(store.clone())
            .create(
                &owner(),
                inspection.id,
                CreateAssignment {
                    inspector_id: "pro-1".to_string(),
                    inspector_email: "Pro@Example.com".to_string(),
                    proposed_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                    proposed_time_start: None,
                    proposed_time_end: None,
                    fee_amount: None,
                },
            )
            .await
            .unwrap();
        Fixture {
            tokens: AccessTokenService::new(store, "https://app.example.com"),
            inspection_id: inspection.id,
            assignment_id: assignment.id,
        }
    }

    #[tokio::test]
    async fn test_issue_and_validate() {
        let f = setup().await;
        let issued = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();
        assert_eq!(issued.record.email, "pro@example.com");
        assert_ne!(issued.record.token_hash, issued.token);
        assert_eq!(
            f.tokens.access_link(&issued.token),
            format!("https://app.example.com/inspect/{}", issued.token)
        );

        let record = f.tokens.validate(&issued.token).await.unwrap();
        assert_eq!(record.inspection_id, f.inspection_id);

        let actor = AccessTokenService::actor_for(&record);
        assert_eq!(actor.role, ActorRole::ExternalInspector);
        assert_eq!(actor.id, "pro@example.com");
    }

    #[tokio::test]
    async fn test_only_managers_issue() {
        let f = setup().await;
        let err = f
            .tokens
            .issue(&tenant(), f.inspection_id, f.assignment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let f = setup().await;
        let issued = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();
        let issued_at = issued.record.created_at;

        f.tokens
            .revoke_at(&owner(), issued.record.id, issued_at + Duration::hours(1))
            .await
            .unwrap();

        let err = f
            .tokens
            .validate_at(&issued.token, issued_at + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let f = setup().await;
        let issued = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();
        let issued_at = issued.record.created_at;

        assert!(f
            .tokens
            .validate_at(&issued.token, issued_at + Duration::hours(47))
            .await
            .is_ok());
        assert!(matches!(
            f.tokens
                .validate_at(&issued.token, issued_at + Duration::hours(49))
                .await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_reissue_revokes_previous() {
        let f = setup().await;
        let first = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();
        let second = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();

        assert!(matches!(
            f.tokens.validate(&first.token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(f.tokens.validate(&second.token).await.is_ok());

        let listed = f.tokens.list(&owner(), f.assignment_id).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_tokens_look_alike() {
        let f = setup().await;
        let malformed = f.tokens.validate("not-a-token").await.unwrap_err();
        let unknown = f
            .tokens
            .validate("0123456789abcdef0123456789abcdef")
            .await
            .unwrap_err();
        assert_eq!(malformed.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_concurrent_validation() {
        let f = setup().await;
        let issued = f
            .tokens
            .issue(&owner(), f.inspection_id, f.assignment_id)
            .await
            .unwrap();

        let (a, b, c) = tokio::join!(
            f.tokens.validate(&issued.token),
            f.tokens.validate(&issued.token),
            f.tokens.validate(&issued.token)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }
}
