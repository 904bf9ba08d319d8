use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Photo evidence attached to an inspection, optionally tagged to a room and item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct InspectionImage {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub storage_path: String,
    pub url: String,
    pub caption: Option<String>,
    pub compass_bearing: Option<f64>,
    pub device_orientation: Option<String>,
    pub sequence_number: Option<i32>,
    pub is_wide_shot: bool,
    pub is_closeup: bool,
    pub captured_at: Option<DateTime<Utc>>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct VoiceNote {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub storage_path: String,
    pub url: String,
    pub duration_seconds: Option<i32>,
    pub transcript: Option<String>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Capture metadata sent alongside an uploaded photo
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub caption: Option<String>,
    pub compass_bearing: Option<f64>,
    pub device_orientation: Option<String>,
    pub sequence_number: Option<i32>,
    pub is_wide_shot: bool,
    pub is_closeup: bool,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct VoiceNoteMetadata {
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub duration_seconds: Option<i32>,
    pub transcript: Option<String>,
}
