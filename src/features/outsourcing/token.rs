//! Access-token primitives for external inspectors.
//!
//! Tokens are 16 bytes from the OS CSPRNG, hex encoded. Only the SHA-256 digest is stored.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::core::error::{AppError, Result};
use crate::features::outsourcing::models::AccessToken;
use crate::shared::constants::{ACCESS_TOKEN_BYTES, ACCESS_TOKEN_TTL_HOURS};
use crate::shared::validation::ACCESS_TOKEN_REGEX;

/// Generate a fresh token using the OS RNG
pub fn generate_token() -> String {
    generate_token_with(&mut OsRng)
}

pub fn generate_token_with<R: RngCore>(rng: &mut R) -> String {
    let mut buf = [0u8; ACCESS_TOKEN_BYTES];
    rng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Hex SHA-256 digest, the only form a token is persisted in
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn expiry_from(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::hours(ACCESS_TOKEN_TTL_HOURS)
}

/// Cheap shape check before touching the store
pub fn is_well_formed(token: &str) -> bool {
    ACCESS_TOKEN_REGEX.is_match(token)
}

/// Usable iff not revoked, not completed and `now < expires_at`.
/// Every failure is the same generic error.
pub fn validate_at(record: Option<AccessToken>, now: DateTime<Utc>) -> Result<AccessToken> {
    match record {
        Some(token) if token.is_usable_at(now) => Ok(token),
        _ => Err(AppError::InvalidToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn record(issued_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            token_hash: hash_token("0123456789abcdef0123456789abcdef"),
            inspection_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            email: "pro@example.com".to_string(),
            expires_at: expiry_from(issued_at),
            used_at: None,
            completed_at: None,
            revoked: false,
            revoked_at: None,
            created_at: issued_at,
        }
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(is_well_formed(&token));
    }

    #[test]
    fn test_no_collisions() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = generate_token_with(&mut StdRng::seed_from_u64(7));
        let b = generate_token_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let h = hash_token("hello");
        assert_eq!(h, hash_token("hello"));
        assert_eq!(h.len(), 64);
        assert_ne!(h, hash_token("hello!"));
    }

    #[test]
    fn test_expiry_window() {
        let issued = Utc::now();
        let token = record(issued);

        let just_before = issued + Duration::hours(47) + Duration::minutes(59);
        assert!(validate_at(Some(token.clone()), just_before).is_ok());

        let just_after = issued + Duration::hours(48) + Duration::minutes(1);
        assert!(matches!(
            validate_at(Some(token.clone()), just_after),
            Err(AppError::InvalidToken)
        ));
        assert!(validate_at(Some(token), issued + Duration::hours(48)).is_err());
    }

    #[test]
    fn test_revocation_beats_expiry() {
        let issued = Utc::now();
        let mut token = record(issued);
        token.revoked = true;
        token.revoked_at = Some(issued + Duration::hours(1));
        assert!(validate_at(Some(token), issued + Duration::hours(2)).is_err());
    }

    #[test]
    fn test_completed_and_unknown_are_indistinguishable() {
        let issued = Utc::now();
        let mut token = record(issued);
        token.completed_at = Some(issued);

        let completed = validate_at(Some(token), issued).unwrap_err().to_string();
        let unknown = validate_at(None, issued).unwrap_err().to_string();
        assert_eq!(completed, unknown);
    }
}
