// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Object storage capability used by the flusher.
//!
//! The flusher only needs a single operation, `put(key, body, content_type)`.
//! [`ObjectStoreStorage`] provides it on top of any [`ObjectStore`], with a
//! constructor for S3-compatible endpoints (path-style requests, static
//! credentials) and one for an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::{ConfigError, UploadError};

/// Namespace used for keys when no project id is configured.
pub const DEFAULT_PROJECT: &str = "default";

/// Region used when the storage configuration leaves it empty.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Stateless, concurrency-safe upload capability.
#[async_trait]
pub trait LogStorage: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), UploadError>;
}

/// Storage as seen by the batcher: either a configured adapter or nothing.
///
/// Decided once at construction. With [`Storage::Absent`] batches are still
/// drained on flush but never uploaded.
#[derive(Clone, Default)]
pub enum Storage {
    Configured(Arc<dyn LogStorage>),
    #[default]
    Absent,
}

impl Storage {
    pub fn configured(storage: impl LogStorage + 'static) -> Self {
        Self::Configured(Arc::new(storage))
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured(_) => write!(f, "Storage::Configured"),
            Self::Absent => write!(f, "Storage::Absent"),
        }
    }
}

/// [`LogStorage`] backed by an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct ObjectStoreStorage {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Builds an S3-compatible client from `config`.
    ///
    /// Returns `Ok(None)` when the endpoint or bucket is empty, meaning
    /// storage is not configured.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>, ConfigError> {
        if !config.is_enabled() {
            return Ok(None);
        }
        let region = if config.region.is_empty() {
            DEFAULT_REGION
        } else {
            config.region.as_str()
        };

        let s3 = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_region(region)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(true)
            .build()
            .map_err(ConfigError::Storage)?;

        debug!(
            "BATCHER | Object storage configured: endpoint={} bucket={}",
            config.endpoint, config.bucket
        );
        Ok(Some(Self::new(Arc::new(s3))))
    }

    /// Storage that keeps objects in process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl LogStorage for ObjectStoreStorage {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), UploadError> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&Path::from(key), PutPayload::from(body), opts)
            .await?;
        Ok(())
    }
}

/// Object key for a batch, dated with the current UTC day.
///
/// e.g. `logs/default/2024/02/17/0b7c….json.gz`
#[must_use]
pub fn key_for_batch(project_id: &str, batch_id: &str, ext: &str) -> String {
    key_for_batch_at(project_id, batch_id, ext, Utc::now())
}

#[must_use]
pub fn key_for_batch_at(project_id: &str, batch_id: &str, ext: &str, at: DateTime<Utc>) -> String {
    let project = if project_id.is_empty() {
        DEFAULT_PROJECT
    } else {
        project_id
    };
    format!("logs/{project}/{}/{batch_id}{ext}", at.format("%Y/%m/%d"))
}
