use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored access-token record. The plaintext token is never persisted; only its SHA-256 digest.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub inspection_id: Uuid,
    pub assignment_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Usable iff not revoked, not completed and `now < expires_at`. Revocation is checked first.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.completed_at.is_none() && now < self.expires_at
    }
}

/// A freshly minted token: the plaintext is only available here
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub record: AccessToken,
}
