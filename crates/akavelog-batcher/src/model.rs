// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Level assigned to records that arrive without one.
pub const DEFAULT_LEVEL: &str = "info";

/// Timestamp assigned to records that arrive without one.
///
/// This is a literal placeholder, not the ingestion time.
pub const MISSING_TIMESTAMP: &str = "0";

/// A validated, normalized log record.
///
/// `service` and `message` are never empty and `tags` is always present
/// once a record has passed [`crate::validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO8601 or Unix milliseconds, as supplied by the producer.
    pub timestamp: String,
    pub service: String,
    /// e.g. debug, info, warn, error
    pub level: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Tenant namespace; empty means the shared default namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
}

/// Wire form of an ingested record before normalization.
///
/// Every field is optional so that an explicit `null` and an absent key are
/// treated the same way.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawLogEntry {
    #[serde(default)]
    pub(crate) timestamp: Option<String>,
    #[serde(default)]
    pub(crate) service: Option<String>,
    #[serde(default)]
    pub(crate) level: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub(crate) project_id: Option<String>,
}
