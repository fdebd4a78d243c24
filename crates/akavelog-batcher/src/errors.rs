// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Why a single raw record was rejected. Only that record is dropped.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Why a flush was aborted. The whole in-flight batch is dropped.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("marshal batch: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("gzip: {0}")]
    Compression(#[source] std::io::Error),

    #[error("upload: {0}")]
    Upload(#[from] UploadError),
}

/// Failure reported by a storage adapter's `put`.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("object store: {0}")]
    Store(#[from] object_store::Error),

    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Invalid process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build object store client: {0}")]
    Storage(#[source] object_store::Error),
}
