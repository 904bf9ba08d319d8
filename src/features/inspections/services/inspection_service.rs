use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{find_inspection, save_if_status};
use crate::core::error::{AppError, Result};
use crate::features::auth::{authorize, Actor, Capability};
use crate::features::inspections::models::{
    ImageMetadata, Inspection, InspectionImage, InspectionStatus, Item, OutsourceMode,
    OverallCondition, RateItem, Room, RoomBlueprint, RoomWithItems, ScheduleInspection,
    VoiceNote, VoiceNoteMetadata,
};
use crate::modules::storage::{extension_for, EvidenceKind, EvidenceStorage};
use crate::modules::store::InspectionStore;
use crate::shared::constants::{ALLOWED_AUDIO_TYPES, ALLOWED_IMAGE_TYPES, MAX_EVIDENCE_SIZE};
use crate::shared::validation::{parse_calendar_date, require_text};

/// An inspection with its full room/item tree and evidence
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionDetail {
    pub inspection: Inspection,
    pub rooms: Vec<RoomWithItems>,
    pub images: Vec<InspectionImage>,
    pub voice_notes: Vec<VoiceNote>,
}

/// Inspection Store operations: scheduling, the room/item tree, ratings and evidence
pub struct InspectionService {
    store: Arc<dyn InspectionStore>,
    storage: Arc<dyn EvidenceStorage>,
}

impl InspectionService {
    pub fn new(store: Arc<dyn InspectionStore>, storage: Arc<dyn EvidenceStorage>) -> Self {
        Self { store, storage }
    }

    /// Create an inspection in `scheduled`
    pub async fn schedule(&self, actor: &Actor, data: ScheduleInspection) -> Result<Inspection> {
        authorize(actor, Capability::ScheduleInspection)?;

        if !self.store.property_exists(data.property_id).await? {
            return Err(AppError::NotFound(format!(
                "Property {} not found",
                data.property_id
            )));
        }
        let scheduled_date = parse_calendar_date(&data.scheduled_date)?;

        if let Some(compare_id) = data.compare_to_inspection_id {
            let baseline = find_inspection(self.store.as_ref(), compare_id).await?;
            if baseline.property_id != data.property_id {
                return Err(AppError::Validation(
                    "compare_to_inspection_id must belong to the same property".to_string(),
                ));
            }
        }

        let inspector_id = match data.inspector_id {
            Some(id) => require_text("inspector_id", &id)?,
            None => actor.id.clone(),
        };

        let now = Utc::now();
        let inspection = Inspection {
            id: Uuid::new_v4(),
            property_id: data.property_id,
            tenancy_id: data.tenancy_id,
            inspector_id,
            inspection_type: data.inspection_type,
            status: InspectionStatus::Scheduled,
            scheduled_date,
            scheduled_time: data.scheduled_time,
            actual_date: None,
            actual_time: None,
            duration_minutes: None,
            compare_to_inspection_id: data.compare_to_inspection_id,
            overall_condition: None,
            summary_notes: None,
            action_items: Vec::new(),
            tenant_acknowledged: false,
            tenant_acknowledged_at: None,
            tenant_disputes: None,
            owner_signature_url: None,
            owner_signed_at: None,
            tenant_signature_url: None,
            tenant_signed_at: None,
            report_url: None,
            report_generated_at: None,
            is_outsourced: false,
            outsource_mode: OutsourceMode::SelfManaged,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_inspection(&inspection).await?;

        tracing::info!(
            "Inspection scheduled: id={}, property={}, type={}, date={}",
            inspection.id,
            inspection.property_id,
            inspection.inspection_type,
            inspection.scheduled_date
        );

        Ok(inspection)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Inspection> {
        authorize(actor, Capability::ViewInspection)?;
        find_inspection(self.store.as_ref(), id).await
    }

    pub async fn get_detail(&self, actor: &Actor, id: Uuid) -> Result<InspectionDetail> {
        authorize(actor, Capability::ViewInspection)?;
        let inspection = find_inspection(self.store.as_ref(), id).await?;
        let rooms = self.store.list_rooms(id).await?;
        let images = self.store.list_images(id).await?;
        let voice_notes = self.store.list_voice_notes(id).await?;

        Ok(InspectionDetail {
            inspection,
            rooms,
            images,
            voice_notes,
        })
    }

    pub async fn list_by_property(
        &self,
        actor: &Actor,
        property_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Inspection>, i64)> {
        authorize(actor, Capability::ViewInspection)?;
        self.store
            .list_inspections_by_property(property_id, limit, offset)
            .await
    }

    /// Bulk-create rooms and items from blueprints, appended after existing rooms.
    /// Either every room and item is created or none is.
    pub async fn expand_template(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        blueprints: &[RoomBlueprint],
    ) -> Result<Vec<RoomWithItems>> {
        authorize(actor, Capability::ManageRooms)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(
            &inspection,
            &[InspectionStatus::Scheduled, InspectionStatus::InProgress],
            "expand template",
        )?;

        if blueprints.is_empty() {
            return Err(AppError::Validation(
                "Template has no rooms to expand".to_string(),
            ));
        }

        let existing = self.store.list_rooms(inspection_id).await?;
        let first_order = next_display_order(&existing);
        let now = Utc::now();

        let rooms = blueprints
            .iter()
            .enumerate()
            .map(|(i, blueprint)| -> Result<RoomWithItems> {
                let name = require_text("room name", &blueprint.name)?;
                let room = Room::new(inspection_id, &name, first_order + i as i32, now);
                let items = blueprint
                    .items
                    .iter()
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .enumerate()
                    .map(|(j, item_name)| Item::blank(room.id, item_name, j as i32, now))
                    .collect();
                Ok(RoomWithItems { room, items })
            })
            .collect::<Result<Vec<_>>>()?;

        self.store.insert_rooms(&rooms).await.map_err(|e| {
            tracing::error!(
                "Template expansion failed for inspection {}: {}",
                inspection_id,
                e
            );
            e
        })?;

        tracing::info!(
            "Template expanded: inspection={}, rooms={}, items={}",
            inspection_id,
            rooms.len(),
            rooms.iter().map(|r| r.items.len()).sum::<usize>()
        );

        Ok(rooms)
    }

    /// Append a single room with its items
    pub async fn add_room(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        blueprint: RoomBlueprint,
    ) -> Result<RoomWithItems> {
        let mut rooms = self
            .expand_template(actor, inspection_id, std::slice::from_ref(&blueprint))
            .await?;
        rooms
            .pop()
            .ok_or_else(|| AppError::Internal("Room was not created".to_string()))
    }

    /// Copy the room/item tree of the inspection this exit inspection compares against,
    /// snapshotting each entry rating into `entry_condition`
    pub async fn seed_from_compared(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
    ) -> Result<Vec<RoomWithItems>> {
        authorize(actor, Capability::ManageRooms)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(
            &inspection,
            &[InspectionStatus::Scheduled, InspectionStatus::InProgress],
            "seed from compared inspection",
        )?;

        let baseline_id = inspection.compare_to_inspection_id.ok_or_else(|| {
            AppError::Validation("Inspection has no compare_to_inspection_id".to_string())
        })?;
        if !self.store.list_rooms(inspection_id).await?.is_empty() {
            return Err(AppError::Conflict(
                "Inspection already has rooms; seeding needs an empty inspection".to_string(),
            ));
        }

        let baseline = self.store.list_rooms(baseline_id).await?;
        let now = Utc::now();
        let rooms: Vec<RoomWithItems> = baseline
            .iter()
            .map(|source| {
                let room = Room::new(
                    inspection_id,
                    &source.room.name,
                    source.room.display_order,
                    now,
                );
                let items = source
                    .items
                    .iter()
                    .map(|source_item| {
                        let mut item =
                            Item::blank(room.id, &source_item.name, source_item.display_order, now);
                        item.entry_condition = source_item.condition;
                        item.refresh_condition_changed();
                        item
                    })
                    .collect();
                RoomWithItems { room, items }
            })
            .collect();

        self.store.insert_rooms(&rooms).await?;

        tracing::info!(
            "Inspection {} seeded from {}: rooms={}",
            inspection_id,
            baseline_id,
            rooms.len()
        );

        Ok(rooms)
    }

    /// Rate an item; recomputes `condition_changed` when an entry rating is present
    pub async fn rate_item(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        item_id: Uuid,
        rating: RateItem,
    ) -> Result<Item> {
        authorize(actor, Capability::RateItem)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(&inspection, &[InspectionStatus::InProgress], "rate item")?;

        if rating.estimated_cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(AppError::Validation(
                "estimated_cost must not be negative".to_string(),
            ));
        }

        let mut item = self.item_in(inspection_id, item_id).await?;
        let now = Utc::now();

        item.condition = Some(rating.condition);
        item.notes = rating.notes.or(item.notes);
        if let Some(required) = rating.action_required {
            item.action_required = required;
        }
        item.action_description = rating.action_description.or(item.action_description);
        item.estimated_cost = rating.estimated_cost.or(item.estimated_cost);
        item.checked_at = Some(now);
        item.updated_at = now;
        item.refresh_condition_changed();

        self.store.update_item(&item).await?;

        tracing::info!(
            "Item rated: inspection={}, item={}, condition={}, by={}",
            inspection_id,
            item_id,
            rating.condition,
            actor.id
        );

        Ok(item)
    }

    pub async fn complete_room(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        room_id: Uuid,
        overall_condition: Option<OverallCondition>,
        notes: Option<String>,
    ) -> Result<Room> {
        authorize(actor, Capability::CompleteRoom)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(&inspection, &[InspectionStatus::InProgress], "complete room")?;

        let mut room = self.room_in(inspection_id, room_id).await?;
        let now = Utc::now();
        room.completed_at = Some(now);
        room.overall_condition = overall_condition.or(room.overall_condition);
        room.notes = notes.or(room.notes);
        room.updated_at = now;

        self.store.update_room(&room).await?;

        tracing::info!(
            "Room completed: inspection={}, room={}, by={}",
            inspection_id,
            room_id,
            actor.id
        );

        Ok(room)
    }

    /// Store a photo and record it against the inspection
    pub async fn upload_image(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
        metadata: ImageMetadata,
    ) -> Result<InspectionImage> {
        authorize(actor, Capability::AddEvidence)?;
        validate_upload(&data, content_type, ALLOWED_IMAGE_TYPES)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(
            &inspection,
            &[InspectionStatus::InProgress, InspectionStatus::Completed],
            "add evidence",
        )?;
        self.check_tags(inspection_id, metadata.room_id, metadata.item_id)
            .await?;

        let key = self.storage.evidence_key(
            inspection_id,
            EvidenceKind::Image,
            extension_for(content_type),
        );
        let stored = self.storage.upload(&key, data, content_type).await?;

        let image = InspectionImage {
            id: Uuid::new_v4(),
            inspection_id,
            room_id: metadata.room_id,
            item_id: metadata.item_id,
            storage_path: stored.key,
            url: stored.url,
            caption: metadata.caption,
            compass_bearing: metadata.compass_bearing,
            device_orientation: metadata.device_orientation,
            sequence_number: metadata.sequence_number,
            is_wide_shot: metadata.is_wide_shot,
            is_closeup: metadata.is_closeup,
            captured_at: metadata.captured_at,
            uploaded_by: actor.id.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_image(&image).await?;

        tracing::info!(
            "Image added: inspection={}, image={}, item={:?}",
            inspection_id,
            image.id,
            image.item_id
        );

        Ok(image)
    }

    pub async fn upload_voice_note(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
        metadata: VoiceNoteMetadata,
    ) -> Result<VoiceNote> {
        authorize(actor, Capability::AddEvidence)?;
        validate_upload(&data, content_type, ALLOWED_AUDIO_TYPES)?;
        let inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        ensure_status(
            &inspection,
            &[InspectionStatus::InProgress, InspectionStatus::Completed],
            "add evidence",
        )?;
        self.check_tags(inspection_id, metadata.room_id, metadata.item_id)
            .await?;

        let key = self.storage.evidence_key(
            inspection_id,
            EvidenceKind::Voice,
            extension_for(content_type),
        );
        let stored = self.storage.upload(&key, data, content_type).await?;

        let note = VoiceNote {
            id: Uuid::new_v4(),
            inspection_id,
            room_id: metadata.room_id,
            item_id: metadata.item_id,
            storage_path: stored.key,
            url: stored.url,
            duration_seconds: metadata.duration_seconds,
            transcript: metadata.transcript,
            uploaded_by: actor.id.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_voice_note(&note).await?;

        tracing::info!(
            "Voice note added: inspection={}, note={}",
            inspection_id,
            note.id
        );

        Ok(note)
    }

    pub async fn set_transcript(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        note_id: Uuid,
        transcript: &str,
    ) -> Result<VoiceNote> {
        authorize(actor, Capability::AddEvidence)?;
        let transcript = require_text("transcript", transcript)?;

        let note = self
            .store
            .get_voice_note(note_id)
            .await?
            .filter(|n| n.inspection_id == inspection_id)
            .ok_or_else(|| AppError::NotFound(format!("Voice note {} not found", note_id)))?;

        self.store.set_transcript(note.id, &transcript).await?;

        Ok(VoiceNote {
            transcript: Some(transcript),
            ..note
        })
    }

    /// Load an item, treating items of other inspections as absent
    pub async fn item_in(&self, inspection_id: Uuid, item_id: Uuid) -> Result<Item> {
        let not_found = || AppError::NotFound(format!("Item {} not found", item_id));
        let item = self.store.get_item(item_id).await?.ok_or_else(not_found)?;
        self.room_in(inspection_id, item.room_id)
            .await
            .map_err(|_| not_found())?;
        Ok(item)
    }

    async fn room_in(&self, inspection_id: Uuid, room_id: Uuid) -> Result<Room> {
        self.store
            .get_room(room_id)
            .await?
            .filter(|r| r.inspection_id == inspection_id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))
    }

    async fn check_tags(
        &self,
        inspection_id: Uuid,
        room_id: Option<Uuid>,
        item_id: Option<Uuid>,
    ) -> Result<()> {
        if let Some(room_id) = room_id {
            self.room_in(inspection_id, room_id).await?;
        }
        if let Some(item_id) = item_id {
            let item = self.item_in(inspection_id, item_id).await?;
            if room_id.is_some_and(|r| r != item.room_id) {
                return Err(AppError::Validation(
                    "item_id does not belong to room_id".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Write `report_url` for the external renderer
    pub async fn attach_report(
        &self,
        actor: &Actor,
        inspection_id: Uuid,
        report_url: &str,
    ) -> Result<Inspection> {
        authorize(actor, Capability::AttachReport)?;
        let report_url = require_text("report_url", report_url)?;
        let mut inspection = find_inspection(self.store.as_ref(), inspection_id).await?;
        if inspection.status == InspectionStatus::Cancelled {
            return Err(AppError::invalid_transition(
                inspection.status,
                "attach report",
                "inspection is cancelled",
            ));
        }

        let now = Utc::now();
        let expected = inspection.status;
        inspection.report_url = Some(report_url);
        inspection.report_generated_at = Some(now);
        inspection.updated_at = now;
        save_if_status(self.store.as_ref(), &inspection, expected).await?;

        tracing::info!("Report attached: inspection={}", inspection_id);
        Ok(inspection)
    }
}

fn next_display_order(rooms: &[RoomWithItems]) -> i32 {
    rooms
        .iter()
        .map(|r| r.room.display_order + 1)
        .max()
        .unwrap_or(0)
}

/// Reject work on the room/item tree outside the statuses that allow it
fn ensure_status(
    inspection: &Inspection,
    allowed: &[InspectionStatus],
    action: &str,
) -> Result<()> {
    if allowed.contains(&inspection.status) {
        return Ok(());
    }
    let allowed_names: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    Err(AppError::invalid_transition(
        inspection.status,
        action,
        format!(
            "only allowed while the inspection is {}",
            allowed_names.join(" or ")
        ),
    ))
}

fn validate_upload(data: &[u8], content_type: &str, allowed: &[&str]) -> Result<()> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_EVIDENCE_SIZE {
        return Err(AppError::Validation(format!(
            "File exceeds the {} byte limit",
            MAX_EVIDENCE_SIZE
        )));
    }
    if !allowed.contains(&content_type) {
        return Err(AppError::Validation(format!(
            "Content type '{}' is not allowed",
            content_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::inspections::models::{InspectionType, ItemCondition};
    use crate::modules::storage::MemoryEvidenceStorage;
    use crate::modules::store::MemoryInspectionStore;
    use crate::shared::test_helpers::{owner, store_with_property, tenant};

    async fn setup() -> (InspectionService, Arc<MemoryInspectionStore>, Uuid) {
        let (store, property_id) = store_with_property().await;
        let service = InspectionService::new(store.clone(), Arc::new(MemoryEvidenceStorage::new()));
        (service, store, property_id)
    }

    fn schedule_data(property_id: Uuid, date: &str) -> ScheduleInspection {
        ScheduleInspection {
            property_id,
            tenancy_id: None,
            inspector_id: None,
            inspection_type: InspectionType::Routine,
            scheduled_date: date.to_string(),
            scheduled_time: None,
            compare_to_inspection_id: None,
        }
    }

    fn blueprint(name: &str, items: &[&str]) -> RoomBlueprint {
        RoomBlueprint {
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn start(store: &MemoryInspectionStore, inspection: &Inspection) {
        let mut started = inspection.clone();
        started.status = InspectionStatus::InProgress;
        assert!(store
            .update_inspection_if_status(&started, InspectionStatus::Scheduled)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_schedule_creates_scheduled_inspection() {
        let (service, _, property_id) = setup().await;
        let inspection = service
            .schedule(&owner(), schedule_data(property_id, "14/03/2026"))
            .await
            .unwrap();

        assert_eq!(inspection.status, InspectionStatus::Scheduled);
        assert_eq!(inspection.inspector_id, "owner-1");
        assert_eq!(inspection.outsource_mode, OutsourceMode::SelfManaged);
        assert_eq!(inspection.scheduled_date.to_string(), "2026-03-14");
    }

    #[tokio::test]
    async fn test_schedule_rejects_unknown_property_and_bad_date() {
        let (service, _, property_id) = setup().await;

        let err = service
            .schedule(&owner(), schedule_data(Uuid::new_v4(), "2026-03-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .schedule(&owner(), schedule_data(property_id, "someday"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_tenant_cannot_schedule() {
        let (service, _, property_id) = setup().await;
        let err = service
            .schedule(&tenant(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_expand_template_preserves_order() {
        let (service, store, property_id) = setup().await;
        let inspection = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap();

        service
            .expand_template(
                &owner(),
                inspection.id,
                &[
                    blueprint("Kitchen", &["Oven", "Sink"]),
                    blueprint("Bedroom", &["Carpet", "  ", "Walls"]),
                ],
            )
            .await
            .unwrap();

        let rooms = store.list_rooms(inspection.id).await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room.name, "Kitchen");
        assert_eq!(rooms[0].room.display_order, 0);
        assert_eq!(rooms[1].room.display_order, 1);
        let names: Vec<&str> = rooms[1].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Carpet", "Walls"]);
        assert_eq!(rooms[1].items[1].display_order, 1);

        let added = service
            .add_room(&owner(), inspection.id, blueprint("Garage", &[]))
            .await
            .unwrap();
        assert_eq!(added.room.display_order, 2);
    }

    #[tokio::test]
    async fn test_expand_template_is_all_or_nothing() {
        let (service, store, property_id) = setup().await;
        let inspection = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap();

        let err = service
            .expand_template(
                &owner(),
                inspection.id,
                &[blueprint("Kitchen", &["Oven"]), blueprint("   ", &["Walls"])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_rooms(inspection.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_item_recomputes_condition_changed() {
        let (service, store, property_id) = setup().await;
        let entry = service
            .schedule(&owner(), schedule_data(property_id, "2025-01-10"))
            .await
            .unwrap();
        service
            .expand_template(&owner(), entry.id, &[blueprint("Bedroom", &["Carpet"])])
            .await
            .unwrap();
        start(&store, &entry).await;
        let carpet = store.list_rooms(entry.id).await.unwrap()[0].items[0].clone();
        service
            .rate_item(
                &owner(),
                entry.id,
                carpet.id,
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

        let mut exit_data = schedule_data(property_id, "2026-01-10");
        exit_data.inspection_type = InspectionType::Exit;
        exit_data.compare_to_inspection_id = Some(entry.id);
        let exit = service.schedule(&owner(), exit_data).await.unwrap();
        service.seed_from_compared(&owner(), exit.id).await.unwrap();
        start(&store, &exit).await;

        let exit_carpet = store.list_rooms(exit.id).await.unwrap()[0].items[0].clone();
        assert_eq!(exit_carpet.entry_condition, Some(ItemCondition::Good));
        assert!(!exit_carpet.condition_changed);

        let rated = service
            .rate_item(
                &owner(),
                exit.id,
                exit_carpet.id,
                RateItem {
                    condition: ItemCondition::Damaged,
                    notes: Some("Burn mark".to_string()),
                    action_required: Some(true),
                    action_description: Some("Patch".to_string()),
                    estimated_cost: Some(Decimal::new(250, 0)),
                },
            )
            .await
            .unwrap();
        assert!(rated.condition_changed);
        assert!(rated.checked_at.is_some());
        assert!(rated.action_required);
    }

    #[tokio::test]
    async fn test_items_are_scoped_to_their_inspection() {
        let (service, store, property_id) = setup().await;
        let a = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap();
        let b = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-15"))
            .await
            .unwrap();
        service
            .expand_template(&owner(), a.id, &[blueprint("Kitchen", &["Oven"])])
            .await
            .unwrap();
        start(&store, &b).await;
        let oven = store.list_rooms(a.id).await.unwrap()[0].items[0].clone();

        let err = service
            .rate_item(
                &owner(),
                b.id,
                oven.id,
                RateItem {
                    condition: ItemCondition::Poor,
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
    async fn test_rating_requires_in_progress() {
        let (service, store, property_id) = setup().await;
        let inspection = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap();
        service
            .expand_template(&owner(), inspection.id, &[blueprint("Kitchen", &["Oven"])])
            .await
            .unwrap();
        let oven = store.list_rooms(inspection.id).await.unwrap()[0].items[0].clone();

        let err = service
            .rate_item(
                &owner(),
                inspection.id,
                oven.id,
                RateItem {
                    condition: ItemCondition::Good,
                    notes: None,
                    action_required: None,
                    action_description: None,
                    estimated_cost: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_upload_image_checks_type_and_tags() {
        let (service, store, property_id) = setup().await;
        let inspection = service
            .schedule(&owner(), schedule_data(property_id, "2026-03-14"))
            .await
            .unwrap();
        service
            .expand_template(&owner(), inspection.id, &[blueprint("Kitchen", &["Oven"])])
            .await
            .unwrap();
        start(&store, &inspection).await;
        let tree = store.list_rooms(inspection.id).await.unwrap();
        let oven = tree[0].items[0].clone();

        let err = service
            .upload_image(
                &owner(),
                inspection.id,
                vec![1, 2, 3],
                "application/pdf",
                ImageMetadata::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let image = service
            .upload_image(
                &owner(),
                inspection.id,
                vec![1, 2, 3],
                "image/jpeg",
                ImageMetadata {
                    room_id: Some(tree[0].room.id),
                    item_id: Some(oven.id),
                    is_closeup: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(image
            .storage_path
            .starts_with(&format!("inspections/{}/images/", inspection.id)));
        assert!(image.storage_path.ends_with(".jpg"));
        assert_eq!(store.list_images(inspection.id).await.unwrap().len(), 1);
    }
}
