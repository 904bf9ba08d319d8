use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::inspections::models::{ImageMetadata, VoiceNoteMetadata};

/// Multipart form for photo and voice note uploads.
/// Swagger documentation only; handlers read the form with [`EvidenceForm`].
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadEvidenceDto {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    pub room_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub caption: Option<String>,
    pub compass_bearing: Option<f64>,
    pub device_orientation: Option<String>,
    pub sequence_number: Option<i32>,
    pub is_wide_shot: Option<bool>,
    pub is_closeup: Option<bool>,
    pub captured_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub transcript: Option<String>,
}

/// A parsed evidence upload: the file plus its text fields
#[derive(Debug)]
pub struct EvidenceForm {
    pub data: Vec<u8>,
    pub content_type: String,
    fields: HashMap<String, String>,
}

impl EvidenceForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut file: Option<(Vec<u8>, String)> = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::debug!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read multipart data: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                file = Some((data.to_vec(), content_type));
            } else {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read field '{}': {}", name, e))
                })?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    fields.insert(name, text);
                }
            }
        }

        let (data, content_type) =
            file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
        Ok(Self {
            data,
            content_type,
            fields,
        })
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.fields
            .get(name)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| AppError::Validation(format!("Invalid value for {}", name)))
            })
            .transpose()
    }

    pub fn image_metadata(&self) -> Result<ImageMetadata> {
        Ok(ImageMetadata {
            room_id: self.parsed("room_id")?,
            item_id: self.parsed("item_id")?,
            caption: self.text("caption"),
            compass_bearing: self.parsed("compass_bearing")?,
            device_orientation: self.text("device_orientation"),
            sequence_number: self.parsed("sequence_number")?,
            is_wide_shot: self.parsed("is_wide_shot")?.unwrap_or(false),
            is_closeup: self.parsed("is_closeup")?.unwrap_or(false),
            captured_at: self.parsed("captured_at")?,
        })
    }

    pub fn voice_metadata(&self) -> Result<VoiceNoteMetadata> {
        Ok(VoiceNoteMetadata {
            room_id: self.parsed("room_id")?,
            item_id: self.parsed("item_id")?,
            duration_seconds: self.parsed("duration_seconds")?,
            transcript: self.text("transcript"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> EvidenceForm {
        EvidenceForm {
            data: vec![1],
            content_type: "image/jpeg".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_image_metadata() {
        let item_id = Uuid::new_v4();
        let f = form(&[
            ("item_id", &item_id.to_string()),
            ("compass_bearing", "182.5"),
            ("is_closeup", "true"),
            ("captured_at", "2026-03-14T09:30:00Z"),
        ]);
        let meta = f.image_metadata().unwrap();
        assert_eq!(meta.item_id, Some(item_id));
        assert_eq!(meta.compass_bearing, Some(182.5));
        assert!(meta.is_closeup);
        assert!(!meta.is_wide_shot);
        assert!(meta.captured_at.is_some());
    }

    #[test]
    fn test_invalid_field_rejected() {
        let f = form(&[("room_id", "kitchen")]);
        assert!(matches!(f.image_metadata(), Err(AppError::Validation(_))));
    }
}
