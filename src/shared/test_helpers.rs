#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;
#[cfg(test)]
use crate::features::auth::{Actor, ActorRole};
#[cfg(test)]
use crate::modules::store::MemoryInspectionStore;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use uuid::Uuid;

#[cfg(test)]
pub fn owner() -> Actor {
    Actor::new("owner-1", ActorRole::Owner)
}

#[cfg(test)]
pub fn tenant() -> Actor {
    Actor::new("tenant-1", ActorRole::Tenant)
}

#[cfg(test)]
pub fn inspector() -> Actor {
    Actor::new("inspector-1", ActorRole::Inspector)
}

#[cfg(test)]
pub fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Admin)
}

/// Memory store with one registered property
#[cfg(test)]
pub async fn store_with_property() -> (Arc<MemoryInspectionStore>, Uuid) {
    let store = Arc::new(MemoryInspectionStore::new());
    let property_id = Uuid::new_v4();
    store.register_property(property_id).await;
    (store, property_id)
}

#[cfg(test)]
pub fn create_user(sub: &str, roles: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        account_id: format!("account-{}", sub),
        sub: sub.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// Inject a fixed authenticated user in place of the JWT middleware
#[cfg(test)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                let response: Response = next.run(request).await;
                response
            }
        },
    ))
}
