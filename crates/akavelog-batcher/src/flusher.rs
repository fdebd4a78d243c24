// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships one snapshot of the buffer to object storage.
//!
//! # Stages
//!
//! ```text
//!   snapshot (Vec<LogEntry>)
//!       │
//!       v
//!   ┌─────────────┐
//!   │  Serialize  │ (JSON array)
//!   └──────┬──────┘
//!          v
//!   ┌─────────────┐
//!   │  Compress   │ (gzip)
//!   └──────┬──────┘
//!          v
//!   ┌─────────────┐
//!   │    Name     │ logs/{project}/{yyyy}/{mm}/{dd}/{uuid}.json.gz
//!   └──────┬──────┘
//!          v
//!   ┌─────────────┐
//!   │   Upload    │ (single attempt)
//!   └─────────────┘
//! ```
//!
//! A failure at any stage drops the snapshot. Nothing is retried or put
//! back into the buffer: keys are random per attempt, so a retry would
//! produce a second object rather than overwrite the first.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::BatcherConfig;
use crate::errors::{FlushError, UploadError};
use crate::model::LogEntry;
use crate::storage::{key_for_batch, LogStorage, Storage};

pub const BATCH_EXTENSION: &str = ".json.gz";
pub const BATCH_CONTENT_TYPE: &str = "application/gzip";

/// What happened to one flush request.
#[derive(Debug)]
pub enum FlushOutcome {
    /// The buffer was empty; nothing was done.
    Empty,
    /// No storage is configured; the snapshot was dropped.
    Discarded { count: usize },
    /// The snapshot was stored under `key`.
    Uploaded { count: usize, key: String },
    /// The snapshot was lost at some stage.
    Failed { count: usize, error: FlushError },
}

#[derive(Debug, Clone)]
pub struct Flusher {
    storage: Storage,
    project_id: String,
    compression: Compression,
    upload_timeout: Option<Duration>,
}

impl Flusher {
    #[must_use]
    pub fn new(storage: Storage, config: &BatcherConfig) -> Self {
        Flusher {
            storage,
            project_id: config.project_id.clone(),
            compression: Compression::new(config.compression_level.min(9)),
            upload_timeout: config.upload_timeout,
        }
    }

    /// Serializes, compresses and uploads `batch`.
    pub async fn ship(&self, batch: Vec<LogEntry>) -> FlushOutcome {
        let count = batch.len();
        if count == 0 {
            return FlushOutcome::Empty;
        }

        let storage = match &self.storage {
            Storage::Configured(storage) => Arc::clone(storage),
            Storage::Absent => {
                debug!("BATCHER | No object storage configured, dropping {count} logs");
                return FlushOutcome::Discarded { count };
            }
        };

        match self.try_ship(storage.as_ref(), &batch).await {
            Ok(key) => {
                info!("BATCHER | Uploaded {count} logs to {key}");
                FlushOutcome::Uploaded { count, key }
            }
            Err(e) => {
                error!("BATCHER | Failed to flush {count} logs, batch dropped: {e}");
                FlushOutcome::Failed { count, error: e }
            }
        }
    }

    async fn try_ship(
        &self,
        storage: &dyn LogStorage,
        batch: &[LogEntry],
    ) -> Result<String, FlushError> {
        let payload = Self::encode(batch)?;
        let compressed = self.compress(&payload)?;
        debug!(
            "BATCHER | Compressed {} logs from {} to {} bytes",
            batch.len(),
            payload.len(),
            compressed.len()
        );

        let key = key_for_batch(&self.project_id, &Uuid::new_v4().to_string(), BATCH_EXTENSION);
        self.upload(storage, &key, compressed).await?;
        Ok(key)
    }

    fn encode(batch: &[LogEntry]) -> Result<Vec<u8>, FlushError> {
        serde_json::to_vec(batch).map_err(FlushError::Serialization)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, FlushError> {
        let mut encoder = GzEncoder::new(Vec::new(), self.compression);
        encoder.write_all(data).map_err(FlushError::Compression)?;
        encoder.finish().map_err(FlushError::Compression)
    }

    async fn upload(
        &self,
        storage: &dyn LogStorage,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), UploadError> {
        let put = storage.put(key, body, BATCH_CONTENT_TYPE);
        match self.upload_timeout {
            Some(limit) => tokio::time::timeout(limit, put)
                .await
                .map_err(|_| UploadError::Timeout(limit))?,
            None => put.await,
        }
    }
}
