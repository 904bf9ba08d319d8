use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::InspectionStore;
use crate::core::error::{AppError, Result};
use crate::features::comparisons::models::{AiComparison, AiIssue, ComparisonStatus, RunClaim};
use crate::features::disputes::models::ItemDispute;
use crate::features::inspections::models::{
    default_template, Inspection, InspectionImage, InspectionStatus, Item, OutsourceMode, Room,
    RoomWithItems, Template, TemplateRoom, TemplateWithRooms, VoiceNote,
};
use crate::features::outsourcing::models::{AccessToken, Assignment};

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("Failed to {}: {:?}", operation, e);
        AppError::Database(e)
    }
}

/// Postgres-backed store
pub struct PgInspectionStore {
    pool: PgPool,
}

impl PgInspectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the system default template unless one already exists
    pub async fn ensure_default_template(&self) -> Result<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM inspection_templates WHERE is_default AND owner_id IS NULL)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check default template"))?;

        if !exists {
            let template = default_template(Utc::now());
            self.insert_template(&template).await?;
            tracing::info!("Seeded default template: id={}", template.template.id);
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(db_error("begin transaction"))
    }

    /// Row-lock the inspection until the transaction ends and return its status
    async fn lock_inspection_status(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<InspectionStatus>> {
        sqlx::query_scalar::<_, InspectionStatus>(
            "SELECT status FROM inspections WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("lock inspection"))
    }

    async fn write_inspection_if_status(
        tx: &mut Transaction<'_, Postgres>,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inspections SET
                tenancy_id = $3, inspector_id = $4, status = $5,
                scheduled_date = $6, scheduled_time = $7, actual_date = $8, actual_time = $9,
                duration_minutes = $10, compare_to_inspection_id = $11, overall_condition = $12,
                summary_notes = $13, action_items = $14, tenant_acknowledged = $15,
                tenant_acknowledged_at = $16, tenant_disputes = $17, owner_signature_url = $18,
                owner_signed_at = $19, tenant_signature_url = $20, tenant_signed_at = $21,
                report_url = $22, report_generated_at = $23, is_outsourced = $24,
                outsource_mode = $25, started_at = $26, completed_at = $27, cancelled_at = $28,
                updated_at = $29
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(inspection.id)
        .bind(expected)
        .bind(inspection.tenancy_id)
        .bind(&inspection.inspector_id)
        .bind(inspection.status)
        .bind(inspection.scheduled_date)
        .bind(inspection.scheduled_time)
        .bind(inspection.actual_date)
        .bind(inspection.actual_time)
        .bind(inspection.duration_minutes)
        .bind(inspection.compare_to_inspection_id)
        .bind(inspection.overall_condition)
        .bind(&inspection.summary_notes)
        .bind(&inspection.action_items)
        .bind(inspection.tenant_acknowledged)
        .bind(inspection.tenant_acknowledged_at)
        .bind(&inspection.tenant_disputes)
        .bind(&inspection.owner_signature_url)
        .bind(inspection.owner_signed_at)
        .bind(&inspection.tenant_signature_url)
        .bind(inspection.tenant_signed_at)
        .bind(&inspection.report_url)
        .bind(inspection.report_generated_at)
        .bind(inspection.is_outsourced)
        .bind(inspection.outsource_mode)
        .bind(inspection.started_at)
        .bind(inspection.completed_at)
        .bind(inspection.cancelled_at)
        .bind(inspection.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(db_error("update inspection"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn write_assignment(
        tx: &mut Transaction<'_, Postgres>,
        assignment: &Assignment,
        only_if_pending: bool,
    ) -> Result<bool> {
        let guard = if only_if_pending {
            " AND accepted IS NULL AND completed_at IS NULL AND is_current"
        } else {
            ""
        };
        let query = format!(
            r#"
            UPDATE inspection_assignments SET
                confirmed_date = $2, confirmed_time = $3, accepted = $4, responded_at = $5,
                decline_reason = $6, completed_at = $7, fee_amount = $8, fee_paid = $9,
                fee_paid_at = $10, rating = $11, review = $12, updated_at = $13
            WHERE id = $1{}
            "#,
            guard
        );

        let result = sqlx::query(&query)
            .bind(assignment.id)
            .bind(assignment.confirmed_date)
            .bind(assignment.confirmed_time)
            .bind(assignment.accepted)
            .bind(assignment.responded_at)
            .bind(&assignment.decline_reason)
            .bind(assignment.completed_at)
            .bind(assignment.fee_amount)
            .bind(assignment.fee_paid)
            .bind(assignment.fee_paid_at)
            .bind(assignment.rating)
            .bind(&assignment.review)
            .bind(assignment.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(db_error("update assignment"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn write_item(tx: &mut Transaction<'_, Postgres>, item: &Item) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE inspection_items SET
                name = $2, display_order = $3, condition = $4, notes = $5,
                action_required = $6, action_description = $7, estimated_cost = $8,
                entry_condition = $9, condition_changed = $10, checked_at = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.display_order)
        .bind(item.condition)
        .bind(&item.notes)
        .bind(item.action_required)
        .bind(&item.action_description)
        .bind(item.estimated_cost)
        .bind(item.entry_condition)
        .bind(item.condition_changed)
        .bind(item.checked_at)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(db_error("update item"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item {} not found", item.id)));
        }
        Ok(())
    }

    async fn write_comparison(
        tx: &mut Transaction<'_, Postgres>,
        comparison: &AiComparison,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ai_comparisons SET
                status = $2, total_issues = $3, tenant_responsible_count = $4,
                wear_and_tear_count = $5, total_estimated_cost = $6, bond_deduction_amount = $7,
                bond_deduction_recommended = $8, summary = $9, error_message = $10,
                completed_at = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(comparison.id)
        .bind(comparison.status)
        .bind(comparison.total_issues)
        .bind(comparison.tenant_responsible_count)
        .bind(comparison.wear_and_tear_count)
        .bind(comparison.total_estimated_cost)
        .bind(comparison.bond_deduction_amount)
        .bind(comparison.bond_deduction_recommended)
        .bind(&comparison.summary)
        .bind(&comparison.error_message)
        .bind(comparison.completed_at)
        .bind(comparison.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(db_error("update comparison"))?;
        Ok(())
    }
}

#[async_trait]
impl InspectionStore for PgInspectionStore {
    async fn property_exists(&self, property_id: Uuid) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM properties WHERE id = $1)")
            .bind(property_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("look up property"))
    }

    async fn insert_inspection(&self, inspection: &Inspection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inspections (
                id, property_id, tenancy_id, inspector_id, inspection_type, status,
                scheduled_date, scheduled_time, compare_to_inspection_id, action_items,
                is_outsourced, outsource_mode, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(inspection.id)
        .bind(inspection.property_id)
        .bind(inspection.tenancy_id)
        .bind(&inspection.inspector_id)
        .bind(inspection.inspection_type)
        .bind(inspection.status)
        .bind(inspection.scheduled_date)
        .bind(inspection.scheduled_time)
        .bind(inspection.compare_to_inspection_id)
        .bind(&inspection.action_items)
        .bind(inspection.is_outsourced)
        .bind(inspection.outsource_mode)
        .bind(&inspection.created_by)
        .bind(inspection.created_at)
        .bind(inspection.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert inspection"))?;
        Ok(())
    }

    async fn get_inspection(&self, id: Uuid) -> Result<Option<Inspection>> {
        sqlx::query_as::<_, Inspection>("SELECT * FROM inspections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get inspection"))
    }

    async fn list_inspections_by_property(
        &self,
        property_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Inspection>, i64)> {
        let inspections = sqlx::query_as::<_, Inspection>(
            r#"
            SELECT * FROM inspections
            WHERE property_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(property_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list inspections"))?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inspections WHERE property_id = $1")
                .bind(property_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("count inspections"))?;

        Ok((inspections, total))
    }

    async fn update_inspection_if_status(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;
        let written = Self::write_inspection_if_status(&mut tx, inspection, expected).await?;
        tx.commit().await.map_err(db_error("commit inspection"))?;
        Ok(written)
    }

    async fn update_inspection_if_settled(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;
        if Self::lock_inspection_status(&mut tx, inspection.id).await? != Some(expected) {
            tx.rollback().await.map_err(db_error("roll back inspection"))?;
            return Ok(false);
        }

        // new disputes are inserted under the same row lock, so this count is current
        let unresolved: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM inspection_item_disputes
            WHERE inspection_id = $1 AND status <> 'resolved'
            "#,
        )
        .bind(inspection.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("count unresolved disputes"))?;
        if unresolved > 0 {
            tx.rollback().await.map_err(db_error("roll back inspection"))?;
            return Ok(false);
        }

        let written = Self::write_inspection_if_status(&mut tx, inspection, expected).await?;
        tx.commit().await.map_err(db_error("commit inspection"))?;
        Ok(written)
    }

    async fn insert_rooms(&self, rooms: &[RoomWithItems]) -> Result<()> {
        let mut tx = self.begin().await?;

        for entry in rooms {
            let room = &entry.room;
            sqlx::query(
                r#"
                INSERT INTO inspection_rooms (
                    id, inspection_id, name, display_order, overall_condition, notes,
                    completed_at, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(room.id)
            .bind(room.inspection_id)
            .bind(&room.name)
            .bind(room.display_order)
            .bind(room.overall_condition)
            .bind(&room.notes)
            .bind(room.completed_at)
            .bind(room.created_at)
            .bind(room.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert room"))?;

            for item in &entry.items {
                sqlx::query(
                    r#"
                    INSERT INTO inspection_items (
                        id, room_id, name, display_order, condition, notes, action_required,
                        action_description, estimated_cost, entry_condition, condition_changed,
                        checked_at, created_at, updated_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                    "#,
                )
                .bind(item.id)
                .bind(item.room_id)
                .bind(&item.name)
                .bind(item.display_order)
                .bind(item.condition)
                .bind(&item.notes)
                .bind(item.action_required)
                .bind(&item.action_description)
                .bind(item.estimated_cost)
                .bind(item.entry_condition)
                .bind(item.condition_changed)
                .bind(item.checked_at)
                .bind(item.created_at)
                .bind(item.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(db_error("insert item"))?;
            }
        }

        tx.commit().await.map_err(db_error("commit rooms"))?;
        Ok(())
    }

    async fn list_rooms(&self, inspection_id: Uuid) -> Result<Vec<RoomWithItems>> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT * FROM inspection_rooms WHERE inspection_id = $1 ORDER BY display_order, created_at",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list rooms"))?;

        let room_ids: Vec<Uuid> = rooms.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, Item>(
            "SELECT * FROM inspection_items WHERE room_id = ANY($1) ORDER BY display_order, created_at",
        )
        .bind(&room_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list items"))?;

        Ok(rooms
            .into_iter()
            .map(|room| {
                let items = items
                    .iter()
                    .filter(|i| i.room_id == room.id)
                    .cloned()
                    .collect();
                RoomWithItems { room, items }
            })
            .collect())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>> {
        sqlx::query_as::<_, Room>("SELECT * FROM inspection_rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get room"))
    }

    async fn update_room(&self, room: &Room) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE inspection_rooms SET
                name = $2, display_order = $3, overall_condition = $4, notes = $5,
                completed_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(room.display_order)
        .bind(room.overall_condition)
        .bind(&room.notes)
        .bind(room.completed_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("update room"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Room {} not found", room.id)));
        }
        Ok(())
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM inspection_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get item"))
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let mut tx = self.begin().await?;
        Self::write_item(&mut tx, item).await?;
        tx.commit().await.map_err(db_error("commit item"))?;
        Ok(())
    }

    async fn insert_image(&self, image: &InspectionImage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inspection_images (
                id, inspection_id, room_id, item_id, storage_path, url, caption,
                compass_bearing, device_orientation, sequence_number, is_wide_shot, is_closeup,
                captured_at, uploaded_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(image.id)
        .bind(image.inspection_id)
        .bind(image.room_id)
        .bind(image.item_id)
        .bind(&image.storage_path)
        .bind(&image.url)
        .bind(&image.caption)
        .bind(image.compass_bearing)
        .bind(&image.device_orientation)
        .bind(image.sequence_number)
        .bind(image.is_wide_shot)
        .bind(image.is_closeup)
        .bind(image.captured_at)
        .bind(&image.uploaded_by)
        .bind(image.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert image"))?;
        Ok(())
    }

    async fn list_images(&self, inspection_id: Uuid) -> Result<Vec<InspectionImage>> {
        sqlx::query_as::<_, InspectionImage>(
            "SELECT * FROM inspection_images WHERE inspection_id = $1 ORDER BY created_at",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list images"))
    }

    async fn insert_voice_note(&self, note: &VoiceNote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inspection_voice_notes (
                id, inspection_id, room_id, item_id, storage_path, url, duration_seconds,
                transcript, uploaded_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(note.id)
        .bind(note.inspection_id)
        .bind(note.room_id)
        .bind(note.item_id)
        .bind(&note.storage_path)
        .bind(&note.url)
        .bind(note.duration_seconds)
        .bind(&note.transcript)
        .bind(&note.uploaded_by)
        .bind(note.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert voice note"))?;
        Ok(())
    }

    async fn get_voice_note(&self, id: Uuid) -> Result<Option<VoiceNote>> {
        sqlx::query_as::<_, VoiceNote>("SELECT * FROM inspection_voice_notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get voice note"))
    }

    async fn list_voice_notes(&self, inspection_id: Uuid) -> Result<Vec<VoiceNote>> {
        sqlx::query_as::<_, VoiceNote>(
            "SELECT * FROM inspection_voice_notes WHERE inspection_id = $1 ORDER BY created_at",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list voice notes"))
    }

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE inspection_voice_notes SET transcript = $2 WHERE id = $1")
                .bind(id)
                .bind(transcript)
                .execute(&self.pool)
                .await
                .map_err(db_error("set transcript"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Voice note {} not found", id)));
        }
        Ok(())
    }

    async fn insert_template(&self, template: &TemplateWithRooms) -> Result<()> {
        let mut tx = self.begin().await?;
        let t = &template.template;

        sqlx::query(
            r#"
            INSERT INTO inspection_templates (id, owner_id, name, description, is_default, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(t.id)
        .bind(&t.owner_id)
        .bind(&t.name)
        .bind(&t.description)
        .bind(t.is_default)
        .bind(t.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert template"))?;

        for room in &template.rooms {
            sqlx::query(
                r#"
                INSERT INTO inspection_template_rooms (id, template_id, name, display_order, items)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(room.id)
            .bind(room.template_id)
            .bind(&room.name)
            .bind(room.display_order)
            .bind(&room.items)
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert template room"))?;
        }

        tx.commit().await.map_err(db_error("commit template"))?;
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateWithRooms>> {
        let template =
            sqlx::query_as::<_, Template>("SELECT * FROM inspection_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("get template"))?;

        let Some(template) = template else {
            return Ok(None);
        };

        let rooms = sqlx::query_as::<_, TemplateRoom>(
            "SELECT * FROM inspection_template_rooms WHERE template_id = $1 ORDER BY display_order",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list template rooms"))?;

        Ok(Some(TemplateWithRooms { template, rooms }))
    }

    async fn list_templates(&self, owner_id: &str) -> Result<Vec<Template>> {
        sqlx::query_as::<_, Template>(
            r#"
            SELECT * FROM inspection_templates
            WHERE owner_id IS NULL OR owner_id = $1
            ORDER BY is_default DESC, name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list templates"))
    }

    async fn create_assignment(
        &self,
        assignment: &Assignment,
        replaces: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        if let Some(previous) = replaces {
            let superseded = sqlx::query(
                r#"
                UPDATE inspection_assignments
                SET is_current = FALSE, superseded_at = $3, updated_at = $3
                WHERE id = $1 AND inspection_id = $2 AND is_current
                    AND accepted = FALSE AND completed_at IS NULL
                "#,
            )
            .bind(previous)
            .bind(assignment.inspection_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error("supersede assignment"))?;

            if superseded.rows_affected() == 0 {
                tx.rollback().await.map_err(db_error("roll back assignment"))?;
                return Ok(false);
            }

            sqlx::query(
                r#"
                UPDATE inspection_access_tokens
                SET revoked = TRUE, revoked_at = $2
                WHERE assignment_id = $1 AND NOT revoked
                "#,
            )
            .bind(previous)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error("revoke superseded tokens"))?;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO inspection_assignments (
                id, inspection_id, inspector_id, inspector_email, assigned_by, assigned_by_id,
                proposed_date, proposed_time_start, proposed_time_end, fee_amount, fee_paid,
                is_current, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (inspection_id) WHERE is_current DO NOTHING
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.inspection_id)
        .bind(&assignment.inspector_id)
        .bind(&assignment.inspector_email)
        .bind(assignment.assigned_by)
        .bind(&assignment.assigned_by_id)
        .bind(assignment.proposed_date)
        .bind(assignment.proposed_time_start)
        .bind(assignment.proposed_time_end)
        .bind(assignment.fee_amount)
        .bind(assignment.fee_paid)
        .bind(assignment.is_current)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert assignment"))?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("roll back assignment"))?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE inspections
            SET is_outsourced = TRUE, outsource_mode = $2, inspector_id = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(assignment.inspection_id)
        .bind(OutsourceMode::Professional)
        .bind(&assignment.inspector_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("flag inspection outsourced"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Inspection {} not found",
                assignment.inspection_id
            )));
        }

        tx.commit().await.map_err(db_error("commit assignment"))?;
        Ok(true)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        sqlx::query_as::<_, Assignment>("SELECT * FROM inspection_assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get assignment"))
    }

    async fn current_assignment(&self, inspection_id: Uuid) -> Result<Option<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT * FROM inspection_assignments WHERE inspection_id = $1 AND is_current",
        )
        .bind(inspection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get current assignment"))
    }

    async fn list_assignments(&self, inspection_id: Uuid) -> Result<Vec<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT * FROM inspection_assignments WHERE inspection_id = $1 ORDER BY created_at",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list assignments"))
    }

    async fn record_assignment_response(&self, assignment: &Assignment) -> Result<bool> {
        let mut tx = self.begin().await?;
        if !Self::write_assignment(&mut tx, assignment, true).await? {
            tx.rollback().await.map_err(db_error("roll back assignment response"))?;
            return Ok(false);
        }

        if assignment.accepted == Some(false) {
            sqlx::query(
                r#"
                UPDATE inspection_access_tokens
                SET revoked = TRUE, revoked_at = $2
                WHERE assignment_id = $1 AND NOT revoked
                "#,
            )
            .bind(assignment.id)
            .bind(assignment.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("revoke declined assignment tokens"))?;
        }

        tx.commit().await.map_err(db_error("commit assignment"))?;
        Ok(true)
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<()> {
        let mut tx = self.begin().await?;
        if !Self::write_assignment(&mut tx, assignment, false).await? {
            return Err(AppError::NotFound(format!(
                "Assignment {} not found",
                assignment.id
            )));
        }
        tx.commit().await.map_err(db_error("commit assignment"))?;
        Ok(())
    }

    async fn insert_access_token(&self, token: &AccessToken, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            UPDATE inspection_access_tokens
            SET revoked = TRUE, revoked_at = $4
            WHERE inspection_id = $1 AND assignment_id = $2 AND email = $3 AND NOT revoked
            "#,
        )
        .bind(token.inspection_id)
        .bind(token.assignment_id)
        .bind(&token.email)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("revoke previous tokens"))?;

        sqlx::query(
            r#"
            INSERT INTO inspection_access_tokens (
                id, token_hash, inspection_id, assignment_id, email, expires_at, revoked, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.inspection_id)
        .bind(token.assignment_id)
        .bind(&token.email)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert access token"))?;

        tx.commit().await.map_err(db_error("commit access token"))?;
        Ok(())
    }

    async fn find_access_token(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        sqlx::query_as::<_, AccessToken>(
            "SELECT * FROM inspection_access_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find access token"))
    }

    async fn get_access_token(&self, id: Uuid) -> Result<Option<AccessToken>> {
        sqlx::query_as::<_, AccessToken>("SELECT * FROM inspection_access_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get access token"))
    }

    async fn list_access_tokens(&self, assignment_id: Uuid) -> Result<Vec<AccessToken>> {
        sqlx::query_as::<_, AccessToken>(
            "SELECT * FROM inspection_access_tokens WHERE assignment_id = $1 ORDER BY created_at",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list access tokens"))
    }

    async fn revoke_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inspection_access_tokens SET revoked = TRUE, revoked_at = $2
            WHERE id = $1 AND NOT revoked
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("revoke access token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inspection_access_tokens SET completed_at = $2
            WHERE id = $1 AND completed_at IS NULL AND NOT revoked
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("complete access token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn touch_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE inspection_access_tokens SET used_at = COALESCE(used_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("touch access token"))?;
        Ok(())
    }

    async fn submit_outsourced_inspection(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
        assignment: &Assignment,
        token_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        let token_closed = sqlx::query(
            r#"
            UPDATE inspection_access_tokens SET completed_at = $2
            WHERE id = $1 AND completed_at IS NULL AND NOT revoked
            "#,
        )
        .bind(token_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("complete access token"))?
        .rows_affected()
            == 1;

        if !token_closed || !Self::write_inspection_if_status(&mut tx, inspection, expected).await?
        {
            tx.rollback().await.map_err(db_error("roll back submission"))?;
            return Ok(false);
        }
        Self::write_assignment(&mut tx, assignment, false).await?;

        tx.commit().await.map_err(db_error("commit submission"))?;
        Ok(true)
    }

    async fn find_comparison(
        &self,
        entry_id: Uuid,
        exit_id: Uuid,
    ) -> Result<Option<AiComparison>> {
        sqlx::query_as::<_, AiComparison>(
            "SELECT * FROM ai_comparisons WHERE entry_inspection_id = $1 AND exit_inspection_id = $2",
        )
        .bind(entry_id)
        .bind(exit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find comparison"))
    }

    async fn get_comparison(&self, id: Uuid) -> Result<Option<AiComparison>> {
        sqlx::query_as::<_, AiComparison>("SELECT * FROM ai_comparisons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get comparison"))
    }

    async fn list_comparisons(&self, inspection_id: Uuid) -> Result<Vec<AiComparison>> {
        sqlx::query_as::<_, AiComparison>(
            r#"
            SELECT * FROM ai_comparisons
            WHERE entry_inspection_id = $1 OR exit_inspection_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list comparisons"))
    }

    async fn claim_comparison_run(
        &self,
        candidate: &AiComparison,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RunClaim> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ai_comparisons (
                id, entry_inspection_id, exit_inspection_id, property_id, status,
                requested_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entry_inspection_id, exit_inspection_id) DO NOTHING
            "#,
        )
        .bind(candidate.id)
        .bind(candidate.entry_inspection_id)
        .bind(candidate.exit_inspection_id)
        .bind(candidate.property_id)
        .bind(ComparisonStatus::Pending)
        .bind(&candidate.requested_by)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert comparison"))?;

        let claimed = sqlx::query_as::<_, AiComparison>(
            r#"
            UPDATE ai_comparisons SET
                status = $3, error_message = NULL, started_at = $4, run_count = run_count + 1,
                requested_by = $5, updated_at = $4
            WHERE entry_inspection_id = $1 AND exit_inspection_id = $2
              AND NOT (status = $3 AND started_at > $6)
            RETURNING *
            "#,
        )
        .bind(candidate.entry_inspection_id)
        .bind(candidate.exit_inspection_id)
        .bind(ComparisonStatus::Processing)
        .bind(now)
        .bind(&candidate.requested_by)
        .bind(stale_before)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("claim comparison"))?;

        let claim = match claimed {
            Some(comparison) => RunClaim::Claimed(comparison),
            None => {
                let running = sqlx::query_as::<_, AiComparison>(
                    "SELECT * FROM ai_comparisons WHERE entry_inspection_id = $1 AND exit_inspection_id = $2",
                )
                .bind(candidate.entry_inspection_id)
                .bind(candidate.exit_inspection_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("get running comparison"))?;
                RunClaim::AlreadyRunning(running)
            }
        };

        tx.commit().await.map_err(db_error("commit comparison claim"))?;
        Ok(claim)
    }

    async fn list_issues(&self, comparison_id: Uuid) -> Result<Vec<AiIssue>> {
        sqlx::query_as::<_, AiIssue>(
            "SELECT * FROM ai_issues WHERE comparison_id = $1 ORDER BY room_name, item_name",
        )
        .bind(comparison_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list issues"))
    }

    async fn get_issue(&self, id: Uuid) -> Result<Option<AiIssue>> {
        sqlx::query_as::<_, AiIssue>("SELECT * FROM ai_issues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get issue"))
    }

    async fn publish_comparison(
        &self,
        comparison: &AiComparison,
        issues: &[AiIssue],
    ) -> Result<()> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM ai_issues WHERE comparison_id = $1")
            .bind(comparison.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("clear issues"))?;

        for issue in issues {
            sqlx::query(
                r#"
                INSERT INTO ai_issues (
                    id, comparison_id, room_id, item_id, room_name, item_name, description,
                    severity, change_type, is_tenant_responsible, confidence, estimated_cost,
                    entry_condition, exit_condition, entry_image_ids, exit_image_ids,
                    evidence_notes, owner_agreed, owner_notes, override_change_type,
                    override_tenant_responsible, override_estimated_cost, overridden_by,
                    overridden_at, created_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25
                )
                "#,
            )
            .bind(issue.id)
            .bind(issue.comparison_id)
            .bind(issue.room_id)
            .bind(issue.item_id)
            .bind(&issue.room_name)
            .bind(&issue.item_name)
            .bind(&issue.description)
            .bind(issue.severity)
            .bind(issue.change_type)
            .bind(issue.is_tenant_responsible)
            .bind(issue.confidence)
            .bind(issue.estimated_cost)
            .bind(issue.entry_condition)
            .bind(issue.exit_condition)
            .bind(&issue.entry_image_ids)
            .bind(&issue.exit_image_ids)
            .bind(&issue.evidence_notes)
            .bind(issue.owner_agreed)
            .bind(&issue.owner_notes)
            .bind(issue.override_change_type)
            .bind(issue.override_tenant_responsible)
            .bind(issue.override_estimated_cost)
            .bind(&issue.overridden_by)
            .bind(issue.overridden_at)
            .bind(issue.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("insert issue"))?;
        }

        Self::write_comparison(&mut tx, comparison).await?;
        tx.commit().await.map_err(db_error("commit comparison"))?;
        Ok(())
    }

    async fn fail_comparison(&self, comparison: &AiComparison) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ai_comparisons SET status = $2, error_message = $3, completed_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(comparison.id)
        .bind(comparison.status)
        .bind(&comparison.error_message)
        .bind(comparison.completed_at)
        .bind(comparison.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("fail comparison"))?;
        Ok(())
    }

    async fn save_issue_decision(
        &self,
        issue: &AiIssue,
        comparison: &AiComparison,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        let settled = sqlx::query(
            r#"
            UPDATE ai_comparisons SET
                total_issues = $2, tenant_responsible_count = $3, wear_and_tear_count = $4,
                total_estimated_cost = $5, bond_deduction_amount = $6,
                bond_deduction_recommended = $7, summary = $8, updated_at = $9
            WHERE id = $1 AND status <> 'processing'
            "#,
        )
        .bind(comparison.id)
        .bind(comparison.total_issues)
        .bind(comparison.tenant_responsible_count)
        .bind(comparison.wear_and_tear_count)
        .bind(comparison.total_estimated_cost)
        .bind(comparison.bond_deduction_amount)
        .bind(comparison.bond_deduction_recommended)
        .bind(&comparison.summary)
        .bind(comparison.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update comparison aggregates"))?;

        if settled.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("roll back issue decision"))?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE ai_issues SET
                owner_agreed = $3, owner_notes = $4, override_change_type = $5,
                override_tenant_responsible = $6, override_estimated_cost = $7,
                overridden_by = $8, overridden_at = $9
            WHERE id = $1 AND comparison_id = $2
            "#,
        )
        .bind(issue.id)
        .bind(issue.comparison_id)
        .bind(issue.owner_agreed)
        .bind(&issue.owner_notes)
        .bind(issue.override_change_type)
        .bind(issue.override_tenant_responsible)
        .bind(issue.override_estimated_cost)
        .bind(&issue.overridden_by)
        .bind(issue.overridden_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("save issue decision"))?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("roll back issue decision"))?;
            return Ok(false);
        }

        tx.commit().await.map_err(db_error("commit issue decision"))?;
        Ok(true)
    }

    async fn open_disputes(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
        disputes: &[ItemDispute],
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        if !Self::write_inspection_if_status(&mut tx, inspection, expected).await? {
            tx.rollback().await.map_err(db_error("roll back dispute"))?;
            return Ok(false);
        }
        for dispute in disputes {
            insert_dispute_row(&mut tx, dispute).await?;
        }

        tx.commit().await.map_err(db_error("commit disputes"))?;
        Ok(true)
    }

    async fn insert_dispute(&self, dispute: &ItemDispute) -> Result<bool> {
        let mut tx = self.begin().await?;
        match Self::lock_inspection_status(&mut tx, dispute.inspection_id).await? {
            Some(InspectionStatus::Disputed) => {}
            Some(_) => {
                tx.rollback().await.map_err(db_error("roll back dispute"))?;
                return Ok(false);
            }
            None => {
                return Err(AppError::NotFound(format!(
                    "Inspection {} not found",
                    dispute.inspection_id
                )))
            }
        }
        insert_dispute_row(&mut tx, dispute).await?;
        tx.commit().await.map_err(db_error("commit dispute"))?;
        Ok(true)
    }

    async fn get_dispute(&self, id: Uuid) -> Result<Option<ItemDispute>> {
        sqlx::query_as::<_, ItemDispute>("SELECT * FROM inspection_item_disputes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get dispute"))
    }

    async fn list_disputes(&self, inspection_id: Uuid) -> Result<Vec<ItemDispute>> {
        sqlx::query_as::<_, ItemDispute>(
            "SELECT * FROM inspection_item_disputes WHERE inspection_id = $1 ORDER BY created_at",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list disputes"))
    }

    async fn save_dispute_response(
        &self,
        dispute: &ItemDispute,
        item: Option<&Item>,
    ) -> Result<()> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            UPDATE inspection_item_disputes SET
                status = $2, owner_response = $3, responded_by = $4, responded_at = $5,
                resolved_condition = $6, resolved_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(dispute.id)
        .bind(dispute.status)
        .bind(&dispute.owner_response)
        .bind(&dispute.responded_by)
        .bind(dispute.responded_at)
        .bind(dispute.resolved_condition)
        .bind(dispute.resolved_at)
        .bind(dispute.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("save dispute response"))?;

        if let Some(item) = item {
            Self::write_item(&mut tx, item).await?;
        }

        tx.commit().await.map_err(db_error("commit dispute response"))?;
        Ok(())
    }
}

async fn insert_dispute_row(
    tx: &mut Transaction<'_, Postgres>,
    dispute: &ItemDispute,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO inspection_item_disputes (
            id, inspection_id, item_id, raised_by, reason, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(dispute.id)
    .bind(dispute.inspection_id)
    .bind(dispute.item_id)
    .bind(&dispute.raised_by)
    .bind(&dispute.reason)
    .bind(dispute.status)
    .bind(dispute.created_at)
    .bind(dispute.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_error("insert dispute"))?;
    Ok(())
}
