use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::constants::DEFAULT_TEMPLATE_NAME;

/// Reusable room/item checklist. `owner_id` is `None` for system templates.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Template {
    pub id: Uuid,
    pub owner_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct TemplateRoom {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub display_order: i32,
    /// Ordered checklist item names
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateWithRooms {
    #[serde(flatten)]
    pub template: Template,
    pub rooms: Vec<TemplateRoom>,
}

/// Blueprint for one room when expanding or authoring a template
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomBlueprint {
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

impl From<&TemplateRoom> for RoomBlueprint {
    fn from(room: &TemplateRoom) -> Self {
        Self {
            name: room.name.clone(),
            items: room.items.clone(),
        }
    }
}

/// The system template present in every store
pub fn default_template(now: DateTime<Utc>) -> TemplateWithRooms {
    let template_id = Uuid::new_v4();
    let rooms: [(&str, &[&str]); 7] = [
        (
            "Entry",
            &["Front door", "Walls", "Ceiling", "Floor", "Light fittings"],
        ),
        (
            "Living room",
            &[
                "Walls",
                "Ceiling",
                "Floor",
                "Windows",
                "Window coverings",
                "Light fittings",
                "Power points",
            ],
        ),
        (
            "Kitchen",
            &[
                "Walls",
                "Floor",
                "Benchtops",
                "Cupboards",
                "Sink and taps",
                "Oven",
                "Cooktop",
                "Rangehood",
            ],
        ),
        (
            "Bathroom",
            &[
                "Walls",
                "Floor",
                "Shower",
                "Bath",
                "Vanity",
                "Toilet",
                "Mirror",
                "Exhaust fan",
            ],
        ),
        (
            "Bedroom",
            &[
                "Walls",
                "Ceiling",
                "Carpet",
                "Windows",
                "Wardrobe",
                "Light fittings",
            ],
        ),
        ("Laundry", &["Walls", "Floor", "Tub and taps", "Cupboards"]),
        (
            "Exterior",
            &["Garden", "Driveway", "Fencing", "Letterbox", "Garage"],
        ),
    ];

    TemplateWithRooms {
        template: Template {
            id: template_id,
            owner_id: None,
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            description: Some("Default checklist for a standard residential property".to_string()),
            is_default: true,
            created_at: now,
        },
        rooms: rooms
            .iter()
            .enumerate()
            .map(|(i, (name, items))| TemplateRoom {
                id: Uuid::new_v4(),
                template_id,
                name: name.to_string(),
                display_order: i as i32,
                items: items.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    }
}
