use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::InspectionStore;
use crate::core::error::{AppError, Result};
use crate::features::comparisons::models::{AiComparison, AiIssue, ComparisonStatus, RunClaim};
use crate::features::disputes::models::ItemDispute;
use crate::features::inspections::models::{
    default_template, Inspection, InspectionImage, InspectionStatus, Item, OutsourceMode, Room,
    RoomWithItems, Template, TemplateWithRooms, VoiceNote,
};
use crate::features::outsourcing::models::{AccessToken, Assignment, AssignmentState};

#[derive(Default)]
struct State {
    properties: HashSet<Uuid>,
    inspections: HashMap<Uuid, Inspection>,
    rooms: HashMap<Uuid, Room>,
    items: HashMap<Uuid, Item>,
    images: Vec<InspectionImage>,
    voice_notes: HashMap<Uuid, VoiceNote>,
    templates: HashMap<Uuid, TemplateWithRooms>,
    assignments: HashMap<Uuid, Assignment>,
    tokens: HashMap<Uuid, AccessToken>,
    comparisons: HashMap<Uuid, AiComparison>,
    issues: HashMap<Uuid, Vec<AiIssue>>,
    disputes: HashMap<Uuid, ItemDispute>,
}

/// In-process store. Every operation runs under a single write guard, so
/// multi-row operations are trivially all-or-nothing.
pub struct MemoryInspectionStore {
    state: RwLock<State>,
}

impl Default for MemoryInspectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInspectionStore {
    pub fn new() -> Self {
        let mut state = State::default();
        let template = default_template(Utc::now());
        state.templates.insert(template.template.id, template);
        Self {
            state: RwLock::new(state),
        }
    }

    /// Make a property id known to the store
    pub async fn register_property(&self, property_id: Uuid) {
        self.state.write().await.properties.insert(property_id);
    }
}

fn missing(kind: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind, id))
}

#[async_trait]
impl InspectionStore for MemoryInspectionStore {
    async fn property_exists(&self, property_id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.properties.contains(&property_id))
    }

    async fn insert_inspection(&self, inspection: &Inspection) -> Result<()> {
        let mut state = self.state.write().await;
        state.inspections.insert(inspection.id, inspection.clone());
        Ok(())
    }

    async fn get_inspection(&self, id: Uuid) -> Result<Option<Inspection>> {
        Ok(self.state.read().await.inspections.get(&id).cloned())
    }

    async fn list_inspections_by_property(
        &self,
        property_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Inspection>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<Inspection> = state
            .inspections
            .values()
            .filter(|i| i.property_id == property_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_inspection_if_status(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .inspections
            .get_mut(&inspection.id)
            .ok_or_else(|| missing("Inspection", inspection.id))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = inspection.clone();
        Ok(true)
    }

    async fn update_inspection_if_settled(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let unresolved = state
            .disputes
            .values()
            .any(|d| d.inspection_id == inspection.id && !d.is_resolved());
        let stored = state
            .inspections
            .get_mut(&inspection.id)
            .ok_or_else(|| missing("Inspection", inspection.id))?;
        if stored.status != expected || unresolved {
            return Ok(false);
        }
        *stored = inspection.clone();
        Ok(true)
    }

    async fn insert_rooms(&self, rooms: &[RoomWithItems]) -> Result<()> {
        let mut state = self.state.write().await;
        for entry in rooms {
            if !state.inspections.contains_key(&entry.room.inspection_id) {
                return Err(missing("Inspection", entry.room.inspection_id));
            }
        }
        for entry in rooms {
            state.rooms.insert(entry.room.id, entry.room.clone());
            for item in &entry.items {
                state.items.insert(item.id, item.clone());
            }
        }
        Ok(())
    }

    async fn list_rooms(&self, inspection_id: Uuid) -> Result<Vec<RoomWithItems>> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|r| r.inspection_id == inspection_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| (r.display_order, r.created_at));

        Ok(rooms
            .into_iter()
            .map(|room| {
                let mut items: Vec<Item> = state
                    .items
                    .values()
                    .filter(|i| i.room_id == room.id)
                    .cloned()
                    .collect();
                items.sort_by_key(|i| (i.display_order, i.created_at));
                RoomWithItems { room, items }
            })
            .collect())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&room_id).cloned())
    }

    async fn update_room(&self, room: &Room) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .rooms
            .get_mut(&room.id)
            .ok_or_else(|| missing("Room", room.id))?;
        *stored = room.clone();
        Ok(())
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<Item>> {
        Ok(self.state.read().await.items.get(&item_id).cloned())
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .items
            .get_mut(&item.id)
            .ok_or_else(|| missing("Item", item.id))?;
        *stored = item.clone();
        Ok(())
    }

    async fn insert_image(&self, image: &InspectionImage) -> Result<()> {
        self.state.write().await.images.push(image.clone());
        Ok(())
    }

    async fn list_images(&self, inspection_id: Uuid) -> Result<Vec<InspectionImage>> {
        let state = self.state.read().await;
        Ok(state
            .images
            .iter()
            .filter(|i| i.inspection_id == inspection_id)
            .cloned()
            .collect())
    }

    async fn insert_voice_note(&self, note: &VoiceNote) -> Result<()> {
        let mut state = self.state.write().await;
        state.voice_notes.insert(note.id, note.clone());
        Ok(())
    }

    async fn get_voice_note(&self, id: Uuid) -> Result<Option<VoiceNote>> {
        Ok(self.state.read().await.voice_notes.get(&id).cloned())
    }

    async fn list_voice_notes(&self, inspection_id: Uuid) -> Result<Vec<VoiceNote>> {
        let state = self.state.read().await;
        let mut notes: Vec<VoiceNote> = state
            .voice_notes
            .values()
            .filter(|n| n.inspection_id == inspection_id)
            .cloned()
            .collect();
        notes.sort_by_key(|n| n.created_at);
        Ok(notes)
    }

    async fn set_transcript(&self, id: Uuid, transcript: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let note = state
            .voice_notes
            .get_mut(&id)
            .ok_or_else(|| missing("Voice note", id))?;
        note.transcript = Some(transcript.to_string());
        Ok(())
    }

    async fn insert_template(&self, template: &TemplateWithRooms) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .templates
            .insert(template.template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<TemplateWithRooms>> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn list_templates(&self, owner_id: &str) -> Result<Vec<Template>> {
        let state = self.state.read().await;
        let mut templates: Vec<Template> = state
            .templates
            .values()
            .filter(|t| match &t.template.owner_id {
                None => true,
                Some(owner) => owner == owner_id,
            })
            .map(|t| t.template.clone())
            .collect();
        templates.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(templates)
    }

    async fn create_assignment(
        &self,
        assignment: &Assignment,
        replaces: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.inspections.contains_key(&assignment.inspection_id) {
            return Err(missing("Inspection", assignment.inspection_id));
        }

        let current = state
            .assignments
            .values()
            .find(|a| a.inspection_id == assignment.inspection_id && a.is_current)
            .map(|a| (a.id, a.state()));
        let replaceable = match (current, replaces) {
            (None, None) => true,
            (Some((id, AssignmentState::Declined)), Some(expected)) => id == expected,
            _ => false,
        };
        if !replaceable {
            return Ok(false);
        }

        if let Some(previous) = replaces {
            if let Some(a) = state.assignments.get_mut(&previous) {
                a.is_current = false;
                a.superseded_at = Some(now);
                a.updated_at = now;
            }
            for token in state.tokens.values_mut() {
                if token.assignment_id == previous && !token.revoked {
                    token.revoked = true;
                    token.revoked_at = Some(now);
                }
            }
        }

        state.assignments.insert(assignment.id, assignment.clone());

        if let Some(inspection) = state.inspections.get_mut(&assignment.inspection_id) {
            inspection.is_outsourced = true;
            inspection.outsource_mode = OutsourceMode::Professional;
            inspection.inspector_id = assignment.inspector_id.clone();
            inspection.updated_at = now;
        }
        Ok(true)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        Ok(self.state.read().await.assignments.get(&id).cloned())
    }

    async fn current_assignment(&self, inspection_id: Uuid) -> Result<Option<Assignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .values()
            .find(|a| a.inspection_id == inspection_id && a.is_current)
            .cloned())
    }

    async fn list_assignments(&self, inspection_id: Uuid) -> Result<Vec<Assignment>> {
        let state = self.state.read().await;
        let mut assignments: Vec<Assignment> = state
            .assignments
            .values()
            .filter(|a| a.inspection_id == inspection_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.created_at);
        Ok(assignments)
    }

    async fn record_assignment_response(&self, assignment: &Assignment) -> Result<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .assignments
            .get_mut(&assignment.id)
            .ok_or_else(|| missing("Assignment", assignment.id))?;
        if stored.state() != AssignmentState::Pending || !stored.is_current {
            return Ok(false);
        }
        *stored = assignment.clone();

        if assignment.accepted == Some(false) {
            for token in state.tokens.values_mut() {
                if token.assignment_id == assignment.id && !token.revoked {
                    token.revoked = true;
                    token.revoked_at = Some(assignment.updated_at);
                }
            }
        }
        Ok(true)
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .assignments
            .get_mut(&assignment.id)
            .ok_or_else(|| missing("Assignment", assignment.id))?;
        *stored = assignment.clone();
        Ok(())
    }

    async fn insert_access_token(&self, token: &AccessToken, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        for previous in state.tokens.values_mut() {
            if previous.inspection_id == token.inspection_id
                && previous.assignment_id == token.assignment_id
                && previous.email == token.email
                && !previous.revoked
            {
                previous.revoked = true;
                previous.revoked_at = Some(now);
            }
        }
        state.tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_access_token(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn get_access_token(&self, id: Uuid) -> Result<Option<AccessToken>> {
        Ok(self.state.read().await.tokens.get(&id).cloned())
    }

    async fn list_access_tokens(&self, assignment_id: Uuid) -> Result<Vec<AccessToken>> {
        let state = self.state.read().await;
        let mut tokens: Vec<AccessToken> = state
            .tokens
            .values()
            .filter(|t| t.assignment_id == assignment_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    async fn revoke_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.write().await;
        let token = state
            .tokens
            .get_mut(&id)
            .ok_or_else(|| missing("Access token", id))?;
        if token.revoked {
            return Ok(false);
        }
        token.revoked = true;
        token.revoked_at = Some(now);
        Ok(true)
    }

    async fn complete_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.write().await;
        let token = state
            .tokens
            .get_mut(&id)
            .ok_or_else(|| missing("Access token", id))?;
        if token.revoked || token.completed_at.is_some() {
            return Ok(false);
        }
        token.completed_at = Some(now);
        Ok(true)
    }

    async fn touch_access_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(token) = state.tokens.get_mut(&id) {
            token.used_at.get_or_insert(now);
        }
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
        let mut state = self.state.write().await;

        let status_matches = state
            .inspections
            .get(&inspection.id)
            .map(|i| i.status == expected)
            .ok_or_else(|| missing("Inspection", inspection.id))?;
        let token_open = state
            .tokens
            .get(&token_id)
            .map(|t| !t.revoked && t.completed_at.is_none())
            .ok_or_else(|| missing("Access token", token_id))?;
        if !state.assignments.contains_key(&assignment.id) {
            return Err(missing("Assignment", assignment.id));
        }
        if !status_matches || !token_open {
            return Ok(false);
        }

        state.inspections.insert(inspection.id, inspection.clone());
        state.assignments.insert(assignment.id, assignment.clone());
        if let Some(token) = state.tokens.get_mut(&token_id) {
            token.completed_at = Some(now);
        }
        Ok(true)
    }

    async fn find_comparison(
        &self,
        entry_id: Uuid,
        exit_id: Uuid,
    ) -> Result<Option<AiComparison>> {
        let state = self.state.read().await;
        Ok(state
            .comparisons
            .values()
            .find(|c| c.entry_inspection_id == entry_id && c.exit_inspection_id == exit_id)
            .cloned())
    }

    async fn get_comparison(&self, id: Uuid) -> Result<Option<AiComparison>> {
        Ok(self.state.read().await.comparisons.get(&id).cloned())
    }

    async fn list_comparisons(&self, inspection_id: Uuid) -> Result<Vec<AiComparison>> {
        let state = self.state.read().await;
        let mut comparisons: Vec<AiComparison> = state
            .comparisons
            .values()
            .filter(|c| {
                c.entry_inspection_id == inspection_id || c.exit_inspection_id == inspection_id
            })
            .cloned()
            .collect();
        comparisons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comparisons)
    }

    async fn claim_comparison_run(
        &self,
        candidate: &AiComparison,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RunClaim> {
        let mut state = self.state.write().await;
        let existing = state.comparisons.values_mut().find(|c| {
            c.entry_inspection_id == candidate.entry_inspection_id
                && c.exit_inspection_id == candidate.exit_inspection_id
        });

        let claimed = match existing {
            Some(current) => {
                let in_flight = current.status == ComparisonStatus::Processing
                    && current.started_at.is_some_and(|s| s > stale_before);
                if in_flight {
                    return Ok(RunClaim::AlreadyRunning(current.clone()));
                }
                current.status = ComparisonStatus::Processing;
                current.error_message = None;
                current.started_at = Some(now);
                current.run_count += 1;
                current.requested_by = candidate.requested_by.clone();
                current.updated_at = now;
                current.clone()
            }
            None => {
                let mut fresh = candidate.clone();
                fresh.status = ComparisonStatus::Processing;
                fresh.started_at = Some(now);
                fresh.run_count = 1;
                fresh.updated_at = now;
                state.comparisons.insert(fresh.id, fresh.clone());
                fresh
            }
        };
        Ok(RunClaim::Claimed(claimed))
    }

    async fn list_issues(&self, comparison_id: Uuid) -> Result<Vec<AiIssue>> {
        let state = self.state.read().await;
        Ok(state
            .issues
            .get(&comparison_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_issue(&self, id: Uuid) -> Result<Option<AiIssue>> {
        let state = self.state.read().await;
        Ok(state
            .issues
            .values()
            .flatten()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn publish_comparison(
        &self,
        comparison: &AiComparison,
        issues: &[AiIssue],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.comparisons.contains_key(&comparison.id) {
            return Err(missing("Comparison", comparison.id));
        }
        state.issues.insert(comparison.id, issues.to_vec());
        state.comparisons.insert(comparison.id, comparison.clone());
        Ok(())
    }

    async fn fail_comparison(&self, comparison: &AiComparison) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .comparisons
            .get_mut(&comparison.id)
            .ok_or_else(|| missing("Comparison", comparison.id))?;
        stored.status = comparison.status;
        stored.error_message = comparison.error_message.clone();
        stored.completed_at = comparison.completed_at;
        stored.updated_at = comparison.updated_at;
        Ok(())
    }

    async fn save_issue_decision(
        &self,
        issue: &AiIssue,
        comparison: &AiComparison,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let settled = state
            .comparisons
            .get(&comparison.id)
            .map(|stored| stored.status != ComparisonStatus::Processing)
            .ok_or_else(|| missing("Comparison", comparison.id))?;
        if !settled {
            return Ok(false);
        }
        let slot = match state
            .issues
            .get_mut(&issue.comparison_id)
            .and_then(|issues| issues.iter_mut().find(|i| i.id == issue.id))
        {
            Some(slot) => slot,
            None => return Ok(false),
        };
        *slot = issue.clone();

        if let Some(stored) = state.comparisons.get_mut(&comparison.id) {
            stored.total_issues = comparison.total_issues;
            stored.tenant_responsible_count = comparison.tenant_responsible_count;
            stored.wear_and_tear_count = comparison.wear_and_tear_count;
            stored.total_estimated_cost = comparison.total_estimated_cost;
            stored.bond_deduction_amount = comparison.bond_deduction_amount;
            stored.bond_deduction_recommended = comparison.bond_deduction_recommended;
            stored.summary = comparison.summary.clone();
            stored.updated_at = comparison.updated_at;
        }
        Ok(true)
    }

    async fn open_disputes(
        &self,
        inspection: &Inspection,
        expected: InspectionStatus,
        disputes: &[ItemDispute],
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .inspections
            .get_mut(&inspection.id)
            .ok_or_else(|| missing("Inspection", inspection.id))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = inspection.clone();
        for dispute in disputes {
            state.disputes.insert(dispute.id, dispute.clone());
        }
        Ok(true)
    }

    async fn insert_dispute(&self, dispute: &ItemDispute) -> Result<bool> {
        let mut state = self.state.write().await;
        let status = state
            .inspections
            .get(&dispute.inspection_id)
            .map(|i| i.status)
            .ok_or_else(|| missing("Inspection", dispute.inspection_id))?;
        if status != InspectionStatus::Disputed {
            return Ok(false);
        }
        state.disputes.insert(dispute.id, dispute.clone());
        Ok(true)
    }

    async fn get_dispute(&self, id: Uuid) -> Result<Option<ItemDispute>> {
        Ok(self.state.read().await.disputes.get(&id).cloned())
    }

    async fn list_disputes(&self, inspection_id: Uuid) -> Result<Vec<ItemDispute>> {
        let state = self.state.read().await;
        let mut disputes: Vec<ItemDispute> = state
            .disputes
            .values()
            .filter(|d| d.inspection_id == inspection_id)
            .cloned()
            .collect();
        disputes.sort_by_key(|d| d.created_at);
        Ok(disputes)
    }

    async fn save_dispute_response(
        &self,
        dispute: &ItemDispute,
        item: Option<&Item>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.disputes.contains_key(&dispute.id) {
            return Err(missing("Dispute", dispute.id));
        }
        if let Some(item) = item {
            if !state.items.contains_key(&item.id) {
                return Err(missing("Item", item.id));
            }
            state.items.insert(item.id, item.clone());
        }
        state.disputes.insert(dispute.id, dispute.clone());
        Ok(())
    }
}
