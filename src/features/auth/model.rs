use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::capabilities::{Actor, ActorRole};
use crate::core::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub account_id: String,
    pub sub: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Roles from the token that map onto platform actor roles, highest privilege first
    pub fn actor_roles(&self) -> Vec<ActorRole> {
        let mut roles: Vec<ActorRole> = self
            .roles
            .iter()
            .filter_map(|r| r.parse::<ActorRole>().ok())
            .filter(|r| *r != ActorRole::ExternalInspector)
            .collect();
        roles.sort_by_key(|r| r.precedence());
        roles.dedup();
        roles
    }

    /// Resolve the actor this request acts as.
    ///
    /// `requested` comes from the `x-acting-role` header and must be one of the user's roles;
    /// without it the highest-privilege role is used.
    pub fn actor(&self, requested: Option<&str>) -> Result<Actor> {
        let roles = self.actor_roles();

        let role = match requested {
            Some(name) => {
                let role = name
                    .parse::<ActorRole>()
                    .map_err(|_| AppError::BadRequest(format!("Unknown acting role '{}'", name)))?;
                if !roles.contains(&role) {
                    return Err(AppError::Forbidden(format!(
                        "User does not hold the '{}' role",
                        role
                    )));
                }
                role
            }
            None => *roles
                .first()
                .ok_or_else(|| AppError::Forbidden("User has no inspection role".to_string()))?,
        };

        Ok(Actor::new(self.sub.clone(), role))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            account_id: "acc-1".to_string(),
            sub: "user-1".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_actor_is_highest_privilege() {
        let actor = user(&["tenant", "owner"]).actor(None).unwrap();
        assert_eq!(actor.role, ActorRole::Owner);
        assert_eq!(actor.id, "user-1");
    }

    #[test]
    fn test_requested_role_must_be_held() {
        let u = user(&["tenant", "owner"]);
        assert_eq!(u.actor(Some("tenant")).unwrap().role, ActorRole::Tenant);
        assert!(matches!(
            u.actor(Some("admin")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_external_inspector_cannot_come_from_jwt() {
        let u = user(&["external_inspector"]);
        assert!(u.actor(None).is_err());
    }
}
