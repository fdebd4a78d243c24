// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process configuration read from `AKAVELOG_*` environment variables.
//!
//! Batching parameters are forgiving: non-positive or unparsable values fall
//! back to their defaults. The log level and compression level are strict and
//! fail [`Config::validate`].

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::errors::ConfigError;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Batch size and flush cadence, plus how batches are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherConfig {
    /// Flush as soon as the buffer holds this many entries.
    pub max_batch_size: usize,
    /// Flush at least this often.
    pub flush_interval: Duration,
    /// Key namespace for uploaded batches; empty means `default`.
    pub project_id: String,
    /// gzip level, 0 to 9.
    pub compression_level: u32,
    /// Deadline for a single upload. `None` waits indefinitely.
    pub upload_timeout: Option<Duration>,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            project_id: String::new(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            upload_timeout: None,
        }
    }
}

impl BatcherConfig {
    /// Zero values are replaced by the defaults rather than rejected.
    #[must_use]
    pub fn new(max_batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            max_batch_size,
            flush_interval,
            ..Default::default()
        }
        .normalized()
    }

    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = Some(timeout);
        self
    }

    /// Applies the defaulting rules to a config built field by field.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.max_batch_size == 0 {
            self.max_batch_size = DEFAULT_MAX_BATCH_SIZE;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        if self.upload_timeout.is_some_and(|t| t.is_zero()) {
            self.upload_timeout = None;
        }
        self
    }
}

/// S3-compatible object store settings (e.g. Akave O3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// e.g. https://o3-rc2.akave.xyz
    pub endpoint: String,
    pub bucket: String,
    /// e.g. us-east-1
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl StorageConfig {
    /// Uploads are enabled only with both an endpoint and a bucket.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub batcher: BatcherConfig,
    pub storage: StorageConfig,
    /// trace, debug, info, warn or error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batcher: BatcherConfig::default(),
            storage: StorageConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_batch_size = env_var("AKAVELOG_BATCHER_MAX_BATCH_SIZE")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(DEFAULT_MAX_BATCH_SIZE);
        let flush_interval = env_var("AKAVELOG_BATCHER_FLUSH_INTERVAL")
            .and_then(|v| parse_duration("AKAVELOG_BATCHER_FLUSH_INTERVAL", &v))
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);
        let project_id = env_var("AKAVELOG_BATCHER_PROJECT_ID").unwrap_or_default();
        let compression_level = match env_var("AKAVELOG_BATCHER_COMPRESSION_LEVEL") {
            Some(v) => v.parse::<u32>().map_err(|_| {
                ConfigError::Invalid(format!("compression level '{v}' is not a number"))
            })?,
            None => DEFAULT_COMPRESSION_LEVEL,
        };
        let upload_timeout = env_var("AKAVELOG_BATCHER_UPLOAD_TIMEOUT")
            .and_then(|v| parse_duration("AKAVELOG_BATCHER_UPLOAD_TIMEOUT", &v));

        let storage = StorageConfig {
            endpoint: env_var("AKAVELOG_STORAGE_O3_ENDPOINT").unwrap_or_default(),
            bucket: env_var("AKAVELOG_STORAGE_O3_BUCKET").unwrap_or_default(),
            region: env_var("AKAVELOG_STORAGE_O3_REGION").unwrap_or_default(),
            access_key: env_var("AKAVELOG_STORAGE_O3_ACCESS_KEY").unwrap_or_default(),
            secret_key: env_var("AKAVELOG_STORAGE_O3_SECRET_KEY").unwrap_or_default(),
        };

        let log_level = env_var("AKAVELOG_LOG_LEVEL")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let config = Self {
            batcher: BatcherConfig {
                max_batch_size,
                flush_interval,
                project_id,
                compression_level,
                upload_timeout,
            }
            .normalized(),
            storage,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        if self.batcher.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "Invalid compression level {}. Must be between 0 and 9",
                self.batcher.compression_level
            )));
        }

        if self.storage.endpoint.is_empty() != self.storage.bucket.is_empty() {
            warn!("BATCHER | Object storage needs both an endpoint and a bucket; uploads are disabled");
        }

        Ok(())
    }
}

/// Trimmed value of `key`, or `None` when unset or blank.
fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `humantime` strings (`30s`, `1h 30m`) and Go-style durations
/// with fractional parts (`1.5s`, `0.5m`, `1h2.5m`).
fn parse_duration(key: &str, value: &str) -> Option<Duration> {
    match humantime::parse_duration(value) {
        Ok(duration) => Some(duration),
        Err(e) => match parse_fractional_duration(value) {
            Some(duration) => Some(duration),
            None => {
                warn!("BATCHER | Ignoring {key}='{value}': {e}");
                None
            }
        },
    }
}

/// Sequence of `<decimal><unit>` pairs, units `ns`, `us`, `µs`, `ms`, `s`,
/// `m` and `h`.
fn parse_fractional_duration(value: &str) -> Option<Duration> {
    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = value;
    let mut seconds = 0f64;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let number: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        seconds += number * scale;
        rest = &rest[unit_end..];
    }

    Duration::try_from_secs_f64(seconds).ok()
}
