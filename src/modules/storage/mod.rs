//! Blob storage for inspection evidence (photos, voice notes, signatures)

mod minio_client;

pub use minio_client::MinIOClient;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::error::Result;

/// Where an uploaded object landed
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Kind of evidence, used to build the object key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Image,
    Voice,
}

impl EvidenceKind {
    fn folder(&self) -> &'static str {
        match self {
            EvidenceKind::Image => "images",
            EvidenceKind::Voice => "voice",
        }
    }
}

#[async_trait]
pub trait EvidenceStorage: Send + Sync {
    /// Key prefix under which all evidence lives
    fn prefix(&self) -> &str;

    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject>;

    /// Time-limited URL handed to the vision classifier
    async fn presigned_url(&self, key: &str) -> Result<String>;

    /// `{prefix}/{inspection_id}/{images|voice}/{uuid}.{ext}`
    fn evidence_key(&self, inspection_id: Uuid, kind: EvidenceKind, extension: &str) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            self.prefix(),
            inspection_id,
            kind.folder(),
            Uuid::new_v4(),
            extension.trim_start_matches('.').to_lowercase()
        )
    }
}

/// File extension for an allowed evidence content type
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/aac" => "aac",
        "audio/wav" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

/// Keeps uploads in memory; used by tests and local runs without MinIO
#[derive(Default)]
pub struct MemoryEvidenceStorage {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryEvidenceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl EvidenceStorage for MemoryEvidenceStorage {
    fn prefix(&self) -> &str {
        "inspections"
    }

    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("memory://{}", key),
        })
    }

    async fn presigned_url(&self, key: &str) -> Result<String> {
        Ok(format!("memory://{}", key))
    }
}
