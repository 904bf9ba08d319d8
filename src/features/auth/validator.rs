use super::model::{AuthenticatedUser, CustomClaims};
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "accountId", default)]
    account_id: Option<String>,

    /// Roles may arrive namespaced or as a flat claim depending on the provider
    #[serde(rename = "https://inspections.app/claims", default)]
    custom_claims: Option<CustomClaims>,
    #[serde(default)]
    roles: Vec<String>,
}

impl Claims {
    /// Namespaced roles win when present and non-empty
    fn into_user(self) -> AuthenticatedUser {
        let roles = match self.custom_claims {
            Some(custom) if !custom.roles.is_empty() => custom.roles,
            _ => self.roles,
        };
        AuthenticatedUser {
            account_id: self.account_id.unwrap_or_else(|| self.sub.clone()),
            sub: self.sub,
            roles,
        }
    }
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?
            .claims;

        let user = claims.into_user();
        tracing::debug!("Validated token for {} with roles {:?}", user.sub, user.roles);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_roles_take_precedence() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "user-1",
            "roles": ["tenant"],
            "https://inspections.app/claims": { "roles": ["owner"] }
        }))
        .unwrap();
        let user = claims.into_user();
        assert_eq!(user.roles, vec!["owner".to_string()]);
        assert_eq!(user.account_id, "user-1");
    }

    #[test]
    fn test_flat_roles_used_when_namespace_empty() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "user-2",
            "accountId": "acc-2",
            "roles": ["inspector"],
            "https://inspections.app/claims": { "roles": [] }
        }))
        .unwrap();
        let user = claims.into_user();
        assert_eq!(user.roles, vec!["inspector".to_string()]);
        assert_eq!(user.account_id, "acc-2");
    }
}
