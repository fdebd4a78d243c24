// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns raw ingest bytes into a normalized [`LogEntry`].
//!
//! Validation is pure: no I/O and no shared state, so it is safe to call
//! from any number of producers at once.

use serde_json::{Map, Value};

use crate::errors::ValidationError;
use crate::model::{LogEntry, RawLogEntry, DEFAULT_LEVEL, MISSING_TIMESTAMP};

/// Parses `raw` as a JSON log record and normalizes it.
///
/// `service` and `message` are required. A missing `level` becomes
/// [`DEFAULT_LEVEL`], a missing `timestamp` becomes [`MISSING_TIMESTAMP`] and
/// missing `tags` become an empty map. Field names match regardless of
/// case, so `Service` and `SERVICE` are read as `service`.
pub fn validate(raw: &[u8]) -> Result<LogEntry, ValidationError> {
    let object: Map<String, Value> = serde_json::from_slice(raw)?;
    let raw: RawLogEntry = serde_json::from_value(Value::Object(fold_keys(object)))?;

    let service = non_empty(raw.service).ok_or(ValidationError::MissingField("service"))?;
    let message = non_empty(raw.message).ok_or(ValidationError::MissingField("message"))?;

    Ok(LogEntry {
        timestamp: non_empty(raw.timestamp).unwrap_or_else(|| MISSING_TIMESTAMP.to_string()),
        service,
        level: non_empty(raw.level).unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
        message,
        tags: raw.tags.unwrap_or_default(),
        project_id: raw.project_id.unwrap_or_default(),
    })
}

/// Lowercases top-level keys. An exact lowercase key wins over a
/// differently-cased duplicate.
fn fold_keys(object: Map<String, Value>) -> Map<String, Value> {
    let mut folded = Map::with_capacity(object.len());
    for (key, value) in object {
        let lower = key.to_lowercase();
        if lower == key || !folded.contains_key(&lower) {
            folded.insert(lower, value);
        }
    }
    folded
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
