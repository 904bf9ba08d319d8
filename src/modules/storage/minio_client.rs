//! MinIO/S3-compatible evidence storage
//!
//! Uses rust-s3 for lightweight S3 operations with path-style URLs.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::{EvidenceStorage, StoredObject};
use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};

/// Evidence blob store backed by a MinIO bucket
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    presigned_url_expiry_secs: u32,
    endpoint: String,
    public_endpoint: String,
    prefix: String,
}

impl MinIOClient {
    /// Connect to MinIO and make sure the evidence bucket exists
    pub async fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // http://endpoint/bucket instead of http://bucket.endpoint
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
            prefix: config.evidence_prefix,
        };

        client.ensure_bucket_exists().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.prefix
        );

        Ok(client)
    }

    async fn ensure_bucket_exists(&self) {
        let created = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[async_trait]
impl EvidenceStorage for MinIOClient {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        self.bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| {
                tracing::error!("Failed to upload evidence '{}': {}", key, e);
                AppError::ExternalCapabilityFailure(format!("Failed to upload '{}': {}", key, e))
            })?;

        debug!("Uploaded '{}' to bucket '{}'", key, self.bucket.name());
        Ok(StoredObject {
            key: key.to_string(),
            url: self.object_url(key),
        })
    }

    async fn presigned_url(&self, key: &str) -> Result<String> {
        self.bucket
            .presign_get(key, self.presigned_url_expiry_secs, None)
            .await
            .map_err(|e| {
                AppError::ExternalCapabilityFailure(format!(
                    "Failed to generate presigned URL for '{}': {}",
                    key, e
                ))
            })
    }
}
