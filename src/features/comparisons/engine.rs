//! Alignment of entry/exit room trees and issue aggregation.
//!
//! Everything here is pure; the service feeds it store data and classifier results.

use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use super::classifier::ItemEvidence;
use crate::features::comparisons::models::{AiComparison, AiIssue, Classification};
use crate::features::inspections::models::{
    InspectionImage, Item, ItemCondition, RoomWithItems,
};
use crate::shared::constants::{
    LABEL_ONLY_CONFIDENCE_FACTOR, ONE_SIDED_EVIDENCE_CONFIDENCE_FACTOR,
};
use crate::shared::validation::normalize_name;

/// An exit item whose condition differs from its entry counterpart
#[derive(Debug, Clone)]
pub struct ChangedItem {
    pub room_id: Uuid,
    pub item_id: Uuid,
    pub room_name: String,
    pub item_name: String,
    pub entry_condition: Option<ItemCondition>,
    pub exit_condition: ItemCondition,
    pub entry_image_ids: Vec<Uuid>,
    pub exit_image_ids: Vec<Uuid>,
    pub entry: ItemEvidence,
    pub exit: ItemEvidence,
}

/// Identity of an issue across runs, used to carry owner decisions forward
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IssueKey {
    Item(Uuid),
    Named(String, String),
}

/// The exit item id is stable across runs; names are only a fallback for legacy rows
pub fn issue_key(issue: &AiIssue) -> IssueKey {
    match issue.item_id {
        Some(item_id) => IssueKey::Item(item_id),
        None => IssueKey::Named(
            normalize_name(&issue.room_name),
            normalize_name(&issue.item_name),
        ),
    }
}

/// Multiplier applied to the classifier's confidence for the photo coverage of an item
pub fn confidence_factor(entry_has_images: bool, exit_has_images: bool) -> f64 {
    match (entry_has_images, exit_has_images) {
        (true, true) => 1.0,
        (false, false) => LABEL_ONLY_CONFIDENCE_FACTOR,
        _ => ONE_SIDED_EVIDENCE_CONFIDENCE_FACTOR,
    }
}

fn images_by_item(images: &[InspectionImage]) -> HashMap<Uuid, Vec<&InspectionImage>> {
    let mut by_item: HashMap<Uuid, Vec<&InspectionImage>> = HashMap::new();
    for image in images {
        if let Some(item_id) = image.item_id {
            by_item.entry(item_id).or_default().push(image);
        }
    }
    by_item
}

fn evidence(
    room_name: &str,
    item: Option<&Item>,
    condition: Option<ItemCondition>,
    images: &[&InspectionImage],
) -> ItemEvidence {
    ItemEvidence {
        room_name: room_name.to_string(),
        condition,
        notes: item.and_then(|i| i.notes.clone()),
        image_urls: images.iter().map(|i| i.url.clone()).collect(),
    }
}

/// Match rooms by normalised name, then items within matched rooms, and return the
/// exit items that need classifying, in exit display order.
///
/// Duplicate names pair up in display order. Exit-only items count when they carry a
/// condition other than `not_applicable`; entry-only items are ignored.
pub fn align(
    entry_rooms: &[RoomWithItems],
    exit_rooms: &[RoomWithItems],
    entry_images: &[InspectionImage],
    exit_images: &[InspectionImage],
) -> Vec<ChangedItem> {
    let entry_photos = images_by_item(entry_images);
    let exit_photos = images_by_item(exit_images);
    let no_photos: Vec<&InspectionImage> = Vec::new();

    let mut entry_by_room: HashMap<String, VecDeque<&RoomWithItems>> = HashMap::new();
    for room in entry_rooms {
        entry_by_room
            .entry(normalize_name(&room.room.name))
            .or_default()
            .push_back(room);
    }

    let mut changed = Vec::new();
    for exit_room in exit_rooms {
        let entry_room = entry_by_room
            .get_mut(&normalize_name(&exit_room.room.name))
            .and_then(|rooms| rooms.pop_front());

        let mut entry_items: HashMap<String, VecDeque<&Item>> = HashMap::new();
        if let Some(room) = entry_room {
            for item in &room.items {
                entry_items
                    .entry(normalize_name(&item.name))
                    .or_default()
                    .push_back(item);
            }
        }

        for exit_item in &exit_room.items {
            let exit_condition = match exit_item.condition {
                Some(c) if c != ItemCondition::NotApplicable => c,
                _ => continue,
            };
            let entry_item = entry_items
                .get_mut(&normalize_name(&exit_item.name))
                .and_then(|items| items.pop_front());
            let entry_condition = entry_item
                .and_then(|i| i.condition)
                .or(exit_item.entry_condition);

            if entry_condition == Some(exit_condition) {
                continue;
            }

            let entry_images = entry_item
                .and_then(|i| entry_photos.get(&i.id))
                .unwrap_or(&no_photos);
            let exit_images = exit_photos.get(&exit_item.id).unwrap_or(&no_photos);

            changed.push(ChangedItem {
                room_id: exit_room.room.id,
                item_id: exit_item.id,
                room_name: exit_room.room.name.clone(),
                item_name: exit_item.name.clone(),
                entry_condition,
                exit_condition,
                entry_image_ids: entry_images.iter().map(|i| i.id).collect(),
                exit_image_ids: exit_images.iter().map(|i| i.id).collect(),
                entry: evidence(
                    &exit_room.room.name,
                    entry_item,
                    entry_condition,
                    entry_images,
                ),
                exit: evidence(
                    &exit_room.room.name,
                    Some(exit_item),
                    Some(exit_condition),
                    exit_images,
                ),
            });
        }
    }
    changed
}

/// Turn a classified change into an issue row, scaling confidence by photo coverage
pub fn build_issue(
    comparison_id: Uuid,
    item: &ChangedItem,
    classification: Classification,
    now: chrono::DateTime<chrono::Utc>,
) -> AiIssue {
    let c = classification.normalized();
    let confidence =
        c.confidence * confidence_factor(item.entry.has_images(), item.exit.has_images());
    AiIssue {
        id: Uuid::new_v4(),
        comparison_id,
        room_id: Some(item.room_id),
        item_id: Some(item.item_id),
        room_name: item.room_name.clone(),
        item_name: item.item_name.clone(),
        description: c.description,
        severity: c.severity,
        change_type: c.change_type,
        is_tenant_responsible: c.is_tenant_responsible,
        confidence,
        estimated_cost: c.estimated_cost,
        entry_condition: item.entry_condition,
        exit_condition: Some(item.exit_condition),
        entry_image_ids: item.entry_image_ids.clone(),
        exit_image_ids: item.exit_image_ids.clone(),
        evidence_notes: c.evidence_notes,
        owner_agreed: None,
        owner_notes: None,
        override_change_type: None,
        override_tenant_responsible: None,
        override_estimated_cost: None,
        overridden_by: None,
        overridden_at: None,
        created_at: now,
    }
}

/// Aggregate fields of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregates {
    pub total_issues: i32,
    pub tenant_responsible_count: i32,
    pub wear_and_tear_count: i32,
    pub total_estimated_cost: Decimal,
    /// Machine classification only
    pub bond_deduction_amount: Decimal,
    /// Owner overrides applied
    pub bond_deduction_recommended: Decimal,
}

impl Aggregates {
    pub fn apply_to(&self, comparison: &mut AiComparison) {
        comparison.total_issues = self.total_issues;
        comparison.tenant_responsible_count = self.tenant_responsible_count;
        comparison.wear_and_tear_count = self.wear_and_tear_count;
        comparison.total_estimated_cost = self.total_estimated_cost;
        comparison.bond_deduction_amount = self.bond_deduction_amount;
        comparison.bond_deduction_recommended = self.bond_deduction_recommended;
    }
}

pub fn aggregate(issues: &[AiIssue]) -> Aggregates {
    let mut totals = Aggregates {
        total_issues: issues.len() as i32,
        tenant_responsible_count: 0,
        wear_and_tear_count: 0,
        total_estimated_cost: Decimal::ZERO,
        bond_deduction_amount: Decimal::ZERO,
        bond_deduction_recommended: Decimal::ZERO,
    };

    for issue in issues {
        let computed = issue.computed().normalized();
        if computed.is_tenant_responsible {
            totals.tenant_responsible_count += 1;
        } else {
            totals.wear_and_tear_count += 1;
        }
        totals.total_estimated_cost += computed.estimated_cost;
        totals.bond_deduction_amount += computed.deductible_cost();
        totals.bond_deduction_recommended += issue.assessment().classification().deductible_cost();
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::comparisons::models::{ChangeType, IssueSeverity, OwnerDecision};
    use crate::features::inspections::models::{Room, RoomWithItems};
    use chrono::Utc;

    fn room(name: &str, items: &[(&str, Option<ItemCondition>)]) -> RoomWithItems {
        let now = Utc::now();
        let room = Room::new(Uuid::new_v4(), name, 0, now);
        let items = items
            .iter()
            .enumerate()
            .map(|(i, (n, c))| {
                let mut item = Item::blank(room.id, n, i as i32, now);
                item.condition = *c;
                item
            })
            .collect();
        RoomWithItems { room, items }
    }

    fn photo(item_id: Uuid) -> InspectionImage {
        InspectionImage {
            id: Uuid::new_v4(),
            inspection_id: Uuid::new_v4(),
            room_id: None,
            item_id: Some(item_id),
            storage_path: "k".to_string(),
            url: "memory://k".to_string(),
            caption: None,
            compass_bearing: None,
            device_orientation: None,
            sequence_number: None,
            is_wide_shot: false,
            is_closeup: true,
            captured_at: None,
            uploaded_by: "inspector-1".to_string(),
            created_at: Utc::now(),
        }
    }

    fn classification(change_type: ChangeType, tenant: bool, cost: i64) -> Classification {
        Classification {
            change_type,
            severity: IssueSeverity::Moderate,
            is_tenant_responsible: tenant,
            confidence: 0.9,
            estimated_cost: Decimal::new(cost, 0),
            description: "change".to_string(),
            evidence_notes: None,
        }
    }

    #[test]
    fn test_alignment_rules() {
        use ItemCondition::*;
        let entry = vec![
            room("Main Bedroom", &[("Carpet", Some(Good)), ("Wardrobe", Some(Good))]),
            room("Garage", &[("Door", Some(Good))]),
        ];
        let exit = vec![
            room(
                "  main  bedroom ",
                &[
                    ("CARPET", Some(Damaged)),
                    ("Wardrobe", Some(Good)),
                    ("Blind", Some(Poor)),
                    ("Fan", Some(NotApplicable)),
                    ("Light", None),
                ],
            ),
            room("Study", &[("Desk", Some(Fair))]),
        ];

        let changed = align(&entry, &exit, &[], &[]);
        let names: Vec<_> = changed.iter().map(|c| c.item_name.as_str()).collect();
        assert_eq!(names, vec!["CARPET", "Blind", "Desk"]);
        assert_eq!(changed[0].entry_condition, Some(Good));
        assert_eq!(changed[1].entry_condition, None);
    }

    #[test]
    fn test_seeded_snapshot_used_when_entry_unrated() {
        let entry = vec![room("Kitchen", &[("Oven", None)])];
        let mut exit = vec![room("Kitchen", &[("Oven", Some(ItemCondition::Fair))])];
        exit[0].items[0].entry_condition = Some(ItemCondition::Fair);
        assert!(align(&entry, &exit, &[], &[]).is_empty());
    }

    #[test]
    fn test_missing_photos_lower_confidence() {
        let entry = vec![room("Bedroom", &[("Carpet", Some(ItemCondition::Good))])];
        let exit = vec![room("Bedroom", &[("Carpet", Some(ItemCondition::Damaged))])];

        let bare = &align(&entry, &exit, &[], &[])[0];
        let with_photos = &align(
            &entry,
            &exit,
            &[photo(entry[0].items[0].id)],
            &[photo(exit[0].items[0].id)],
        )[0];

        let comparison_id = Uuid::new_v4();
        let c = classification(ChangeType::MinorDamage, true, 200);
        let low = build_issue(comparison_id, bare, c.clone(), Utc::now());
        let high = build_issue(comparison_id, with_photos, c, Utc::now());
        assert!(low.confidence < high.confidence);
        assert!((low.confidence - 0.9 * LABEL_ONLY_CONFIDENCE_FACTOR).abs() < 1e-9);
        assert_eq!(high.exit_image_ids.len(), 1);
    }

    #[test]
    fn test_aggregation_excludes_wear_and_tear() {
        let entry = vec![room(
            "Lounge",
            &[("Carpet", Some(ItemCondition::Good)), ("Walls", Some(ItemCondition::Good))],
        )];
        let exit = vec![room(
            "Lounge",
            &[("Carpet", Some(ItemCondition::Damaged)), ("Walls", Some(ItemCondition::Fair))],
        )];
        let changed = align(&entry, &exit, &[], &[]);
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut issues = vec![
            build_issue(id, &changed[0], classification(ChangeType::MajorDamage, true, 450), now),
            build_issue(id, &changed[1], classification(ChangeType::WearAndTear, true, 80), now),
        ];

        let totals = aggregate(&issues);
        assert_eq!(totals.total_issues, 2);
        assert_eq!(totals.tenant_responsible_count, 1);
        assert_eq!(totals.wear_and_tear_count, 1);
        assert_eq!(totals.total_estimated_cost, Decimal::new(530, 0));
        assert_eq!(totals.bond_deduction_amount, Decimal::new(450, 0));
        assert_eq!(totals.bond_deduction_recommended, Decimal::new(450, 0));

        issues[0].apply_decision(
            OwnerDecision::Override {
                change_type: None,
                is_tenant_responsible: None,
                estimated_cost: Some(Decimal::new(300, 0)),
                notes: None,
            },
            "owner-1",
            now,
        );
        let totals = aggregate(&issues);
        assert_eq!(totals.bond_deduction_amount, Decimal::new(450, 0));
        assert_eq!(totals.bond_deduction_recommended, Decimal::new(300, 0));
    }
}
