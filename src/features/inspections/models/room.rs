use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use super::OverallCondition;

/// Condition rating of a checklist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "item_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
    Missing,
    NotApplicable,
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemCondition::Excellent => write!(f, "excellent"),
            ItemCondition::Good => write!(f, "good"),
            ItemCondition::Fair => write!(f, "fair"),
            ItemCondition::Poor => write!(f, "poor"),
            ItemCondition::Damaged => write!(f, "damaged"),
            ItemCondition::Missing => write!(f, "missing"),
            ItemCondition::NotApplicable => write!(f, "not_applicable"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Room {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub overall_condition: Option<OverallCondition>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub room_id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub condition: Option<ItemCondition>,
    pub notes: Option<String>,
    pub action_required: bool,
    pub action_description: Option<String>,
    pub estimated_cost: Option<Decimal>,
    /// Snapshot of the entry inspection's rating (exit inspections only)
    pub entry_condition: Option<ItemCondition>,
    pub condition_changed: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn blank(room_id: Uuid, name: &str, display_order: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            name: name.trim().to_string(),
            display_order,
            condition: None,
            notes: None,
            action_required: false,
            action_description: None,
            estimated_cost: None,
            entry_condition: None,
            condition_changed: false,
            checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute `condition_changed`; must run after any write to either condition field
    pub fn refresh_condition_changed(&mut self) {
        self.condition_changed = match (self.entry_condition, self.condition) {
            (Some(entry), Some(current)) => entry != current,
            _ => false,
        };
    }
}

impl Room {
    pub fn new(inspection_id: Uuid, name: &str, display_order: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            inspection_id,
            name: name.trim().to_string(),
            display_order,
            overall_condition: None,
            notes: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A room with its items, ordered by display_order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomWithItems {
    #[serde(flatten)]
    pub room: Room,
    pub items: Vec<Item>,
}

/// Rating written to an item by an inspector
#[derive(Debug, Clone)]
pub struct RateItem {
    pub condition: ItemCondition,
    pub notes: Option<String>,
    pub action_required: Option<bool>,
    pub action_description: Option<String>,
    pub estimated_cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_changed_requires_both_sides() {
        let mut item = Item::blank(Uuid::new_v4(), "Carpet", 0, Utc::now());
        item.condition = Some(ItemCondition::Damaged);
        item.refresh_condition_changed();
        assert!(!item.condition_changed);

        item.entry_condition = Some(ItemCondition::Good);
        item.refresh_condition_changed();
        assert!(item.condition_changed);

        item.condition = Some(ItemCondition::Good);
        item.refresh_condition_changed();
        assert!(!item.condition_changed);
    }
}
