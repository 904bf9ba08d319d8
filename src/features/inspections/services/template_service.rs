use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, Capability};
use crate::features::inspections::models::{
    RoomBlueprint, RoomWithItems, Template, TemplateRoom, TemplateWithRooms,
};
use crate::features::inspections::services::InspectionService;
use crate::modules::store::InspectionStore;
use crate::shared::validation::require_text;

/// Reusable room/item checklists
pub struct TemplateService {
    store: Arc<dyn InspectionStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn InspectionStore>) -> Self {
        Self { store }
    }

    /// Author an owner template
    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
        rooms: Vec<RoomBlueprint>,
    ) -> Result<TemplateWithRooms> {
        authorize(actor, Capability::ManageTemplates)?;
        let name = require_text("name", name)?;
        if rooms.is_empty() {
            return Err(AppError::Validation(
                "A template needs at least one room".to_string(),
            ));
        }

        let template_id = Uuid::new_v4();
        let rooms = rooms
            .into_iter()
            .enumerate()
            .map(|(i, room)| -> Result<TemplateRoom> {
                Ok(TemplateRoom {
                    id: Uuid::new_v4(),
                    template_id,
                    name: require_text("room name", &room.name)?,
                    display_order: i as i32,
                    items: room
                        .items
                        .iter()
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty())
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let template = TemplateWithRooms {
            template: Template {
                id: template_id,
                owner_id: Some(actor.id.clone()),
                name,
                description,
                is_default: false,
                created_at: Utc::now(),
            },
            rooms,
        };

        self.store.insert_template(&template).await?;

        tracing::info!(
            "Template created: id={}, owner={}, rooms={}",
            template.template.id,
            actor.id,
            template.rooms.len()
        );

        Ok(template)
    }

    /// System templates plus the actor's own
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Template>> {
        self.store.list_templates(&actor.id).await
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<TemplateWithRooms> {
        self.store
            .get_template(id)
            .await?
            .filter(|t| {
                t.template
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| owner == actor.id)
            })
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))
    }

    /// Expand a stored template into an inspection
    pub async fn apply(
        &self,
        actor: &Actor,
        inspections: &InspectionService,
        template_id: Uuid,
        inspection_id: Uuid,
    ) -> Result<Vec<RoomWithItems>> {
        let template = self.get(actor, template_id).await?;
        let blueprints: Vec<RoomBlueprint> =
            template.rooms.iter().map(RoomBlueprint::from).collect();
        inspections
            .expand_template(actor, inspection_id, &blueprints)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{InspectionType, ScheduleInspection};
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::shared::constants::DEFAULT_TEMPLATE_NAME;
    use crate::shared::test_helpers::{owner, store_with_property};
    use crate::features::auth::ActorRole;

    #[tokio::test]
    async fn test_owner_templates_are_private() {
        let (store, _) = store_with_property().await;
        let service = TemplateService::new(store.clone());

        let created = service
            .create(
                &owner(),
                "Studio",
                None,
                vec![RoomBlueprint {
                    name: "Main room".to_string(),
                    items: vec!["Walls".to_string(), "Floor".to_string()],
                }],
            )
            .await
            .unwrap();

        let listed = service.list(&owner()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, DEFAULT_TEMPLATE_NAME);

        let other = Actor::new("owner-2", ActorRole::Owner);
        assert_eq!(service.list(&other).await.unwrap().len(), 1);
        assert!(service.get(&other, created.template.id).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_default_template() {
        let (store, property_id) = store_with_property().await;
        let templates = TemplateService::new(store.clone());
        let inspections =
            InspectionService::new(store.clone(), Arc::new(MemoryEvidenceStorage::new()));

        let inspection = inspections
            .schedule(
                &owner(),
                ScheduleInspection {
                    property_id,
                    tenancy_id: None,
                    inspector_id: None,
                    inspection_type: InspectionType::Entry,
                    scheduled_date: "2026-03-14".to_string(),
                    scheduled_time: None,
                    compare_to_inspection_id: None,
                },
            )
            .await
            .unwrap();

        let default_id = templates.list(&owner()).await.unwrap()[0].id;
        let rooms = templates
            .apply(&owner(), &inspections, default_id, inspection.id)
            .await
            .unwrap();

        assert_eq!(rooms.len(), 7);
        assert_eq!(rooms[0].room.name, "Entry");
        assert!(rooms.iter().all(|r| !r.items.is_empty()));
    }

    #[tokio::test]
    async fn test_create_requires_rooms() {
        let (store, _) = store_with_property().await;
        let service = TemplateService::new(store);
        let err = service
            .create(&owner(), "Empty", None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
