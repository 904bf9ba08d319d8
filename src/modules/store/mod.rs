//! Inspection Store - persistence for inspections and everything hanging off them
//!
//! Every multi-row operation is all-or-nothing. Operations returning `bool` are
//! compare-and-set writes: `false` means the stored row no longer matched the
//! expected state and nothing was written.

mod memory;
mod postgres;

pub use memory::MemoryInspectionStore;
pub use postgres::PgInspectionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::comparisons::models::{AiComparison, AiIssue, RunClaim};
use crate::features::disputes::models::ItemDispute;
use crate::features::inspections::models::{
    Inspection, InspectionImage, InspectionStatus, Item, Room, RoomWithItems, Template,
    TemplateWithRooms, VoiceNote,
};
use crate::features::outsourcing::models::{AccessToken, Assignment};

#[async_trait]
pub trait InspectionStore: Send + Sync {
    // Properties are owned elsewhere; only presence is checked
    async fn property_exists(&self, property_id: Uuid) -> Result<bool>;

    // ---------------------------------------------------------------------
    // Inspections
    // ---------------------------------------------------------------------

    async fn insert_inspection(&self, inspection: &Inspection) -> Result<()>;

    async fn get_inspection(&self, id: Uuid) -> Result<Option<Inspection>>;

    /// Newest first, with the total count for the property
    async fn list_inspections_by_property(
        &self,
        property_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Inspection>, i64)>;

    /// Write all mutable fields of `inspection` if the stored status is still `expected`
    async fn update_inspection_if_status(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool>;

    /// Like `update_inspection_if_status`, but also requires every item dispute of the
    /// inspection to be resolved, checked in the same unit as the write
    async fn update_inspection_if_settled(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool>;

    // ---------------------------------------------------------------------
    // Rooms & items
    // ---------------------------------------------------------------------

    /// Insert rooms with their items in one unit
    async fn insert_rooms(&self, rooms: &[RoomWithItems]) -> Result<()>;

    /// Rooms by display order, items by display order within each room
    async fn list_rooms(&self, inspection_id: Uuid) -> Result<Vec<RoomWithItems>>;

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>>;

    async fn update_room(&self, room: &Room) -> Result<()>;

    async fn get_item(&self, item_id: Uuid) -> Result<Option<Item>>;

    async fn update_item(&self, item: &Item) -> Result<()>;

    // ---------------------------------------------------------------------
    // Evidence
    // ---------------------------------------------------------------------

    async fn insert_image(&self, image: &InspectionImage) -> Result<()>;

    async fn list_images(&self, inspection_id: Uuid) -> Result<Vec<InspectionImage>>;

    async fn insert_voice_note(&self, note: &VoiceNote) -> Result<()>;

    async fn get_voice_note(&self, id: Uuid) -> Result<Option<VoiceNote>>;

    async fn list_voice_notes(&self, inspection_id: Uuid) -> Result<Vec<VoiceNote>>;

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()>;

    // ---------------------------------------------------------------------
    // Templates
    // ---------------------------------------------------------------------

    async fn insert_template(&self, template: &TemplateWithRooms) -> Result<()>;

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateWithRooms>>;

    /// System templates plus those authored by `owner_id`
    async fn list_templates(&self, owner_id: &str) -> Result<Vec<Template>>;

    // ---------------------------------------------------------------------
    // Assignments
    // ---------------------------------------------------------------------

    /// Insert a new current assignment, supersede `replaces` (revoking its tokens) and flag
    /// the inspection as professionally outsourced, all in one unit.
    ///
    /// Returns false, writing nothing, unless the current assignment is still exactly
    /// `replaces`: none at all, or that declined assignment.
    async fn create_assignment(
        &self,
        assignment: &Assignment,
        replaces: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>>;

    async fn current_assignment(&self, inspection_id: Uuid) -> Result<Option<Assignment>>;

    /// Oldest first, superseded rows included
    async fn list_assignments(&self, inspection_id: Uuid) -> Result<Vec<Assignment>>;

    /// Record accept/decline if the assignment has not been answered yet. A decline
    /// revokes the assignment's live tokens in the same unit.
    async fn record_assignment_response(&self, assignment: &Assignment) -> Result<bool>;

    async fn update_assignment(&self, assignment: &Assignment) -> Result<()>;

    // ---------------------------------------------------------------------
    // Access tokens
    // ---------------------------------------------------------------------

    /// Insert a token, revoking any live token for the same inspection, assignment and email
    async fn insert_access_token(&self, token: &AccessToken, now: DateTime<Utc>) -> Result<()>;

    async fn find_access_token(&self, token_hash: &str) -> Result<Option<AccessToken>>;

    async fn get_access_token(&self, id: Uuid) -> Result<Option<AccessToken>>;

    async fn list_access_tokens(&self, assignment_id: Uuid) -> Result<Vec<AccessToken>>;

    /// Set `revoked` if not already revoked
    async fn revoke_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Set `completed_at` if unset and the token is not revoked
    async fn complete_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Stamp `used_at` on first use
    async fn touch_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Complete an outsourced inspection in one unit: status CAS on the inspection,
    /// assignment completion and the token's `completed_at` CAS
    async fn submit_outsourced_inspection(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
        assignment: &Assignment,
        token_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    // ---------------------------------------------------------------------
    // Comparisons
    // ---------------------------------------------------------------------

    async fn find_comparison(&self, entry_id: Uuid, exit_id: Uuid)
        -> Result<Option<AiComparison>>;

    async fn get_comparison(&self, id: Uuid) -> Result<Option<AiComparison>>;

    /// Comparisons where the inspection is either side
    async fn list_comparisons(&self, inspection_id: Uuid) -> Result<Vec<AiComparison>>;

    /// Create or take over the comparison for `candidate`'s pair and mark it processing,
    /// unless a run that started after `stale_before` is still in flight
    async fn claim_comparison_run(
        &self,
        candidate: &AiComparison,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RunClaim>;

    async fn list_issues(&self, comparison_id: Uuid) -> Result<Vec<AiIssue>>;

    async fn get_issue(&self, id: Uuid) -> Result<Option<AiIssue>>;

    /// Replace the comparison's issue set and write its aggregates in one unit
    async fn publish_comparison(&self, comparison: &AiComparison, issues: &[AiIssue])
        -> Result<()>;

    /// Mark a run failed; the previously published issue set is left alone
    async fn fail_comparison(&self, comparison: &AiComparison) -> Result<()>;

    /// Save an owner decision and the recomputed aggregates in one unit.
    ///
    /// Returns false, writing nothing, when the comparison is processing a run or the
    /// issue is no longer part of its published set.
    async fn save_issue_decision(&self, issue: &AiIssue, comparison: &AiComparison)
        -> Result<bool>;

    // ---------------------------------------------------------------------
    // Disputes
    // ---------------------------------------------------------------------

    /// Move the inspection to `disputed` (status CAS) and open the per-item disputes
    async fn open_disputes(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
        disputes: &[ItemDispute],
    ) -> Result<bool>;

    /// Open an item dispute if its inspection is still `disputed`; false otherwise
    async fn insert_dispute(&self, dispute: &ItemDispute) -> Result<bool>;

    async fn get_dispute(&self, id: Uuid) -> Result<Option<ItemDispute>>;

    async fn list_disputes(&self, inspection_id: Uuid) -> Result<Vec<ItemDispute>>;

    /// Save the owner's response, applying the resolved condition to the item when given
    async fn save_dispute_response(
        &self,
        dispute: &ItemDispute,
        item: Option<&Item>,
    ) -> Result<()>;
}
