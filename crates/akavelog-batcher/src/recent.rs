// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Operator views over batcher activity.
//!
//! Both views are fed through [`StatusListener`] and are never read by the
//! pipeline itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::listener::BatchListener;
use crate::model::LogEntry;

pub const RECENT_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentEntry {
    pub entry: LogEntry,
    pub received_at: DateTime<Utc>,
}

/// Ring of the most recently accepted entries, oldest first.
#[derive(Debug)]
pub struct RecentEntries {
    entries: Mutex<VecDeque<RecentEntry>>,
    capacity: usize,
}

impl Default for RecentEntries {
    fn default() -> Self {
        Self::new(RECENT_CAPACITY)
    }
}

impl RecentEntries {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(RECENT_CAPACITY))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        self.push_at(entry, Utc::now());
    }

    fn push_at(&self, entry: LogEntry, received_at: DateTime<Utc>) {
        if self.capacity == 0 {
            return;
        }
        #[allow(clippy::expect_used)]
        let mut entries = self.entries.lock().expect("lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(RecentEntry { entry, received_at });
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<RecentEntry> {
        #[allow(clippy::expect_used)]
        let entries = self.entries.lock().expect("lock poisoned");
        entries.iter().cloned().collect()
    }
}

/// Point-in-time copy of the upload status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadStatusSnapshot {
    #[serde(rename = "batcher_enabled")]
    pub enabled: bool,
    pub last_upload_at: Option<DateTime<Utc>>,
    pub last_upload_key: Option<String>,
    pub last_upload_count: usize,
    /// Entries buffered and not yet flushed.
    #[serde(rename = "pending_count")]
    pub pending: usize,
}

/// Outcome of the most recent successful upload.
#[derive(Debug, Default)]
pub struct UploadStatus {
    inner: Mutex<UploadStatusSnapshot>,
}

impl UploadStatus {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Mutex::new(UploadStatusSnapshot {
                enabled,
                ..Default::default()
            }),
        }
    }

    fn record_upload(&self, count: usize, key: &str) {
        #[allow(clippy::expect_used)]
        let mut status = self.inner.lock().expect("lock poisoned");
        status.last_upload_at = Some(Utc::now());
        status.last_upload_key = Some(key.to_string());
        status.last_upload_count = count;
    }

    /// `pending` is the batcher's current buffer length, see
    /// [`crate::Batcher::pending`].
    #[must_use]
    pub fn snapshot(&self, pending: usize) -> UploadStatusSnapshot {
        #[allow(clippy::expect_used)]
        let status = self.inner.lock().expect("lock poisoned");
        UploadStatusSnapshot {
            pending,
            ..status.clone()
        }
    }
}

/// [`BatchListener`] that keeps [`RecentEntries`] and [`UploadStatus`] current.
#[derive(Debug, Clone)]
pub struct StatusListener {
    recent: Arc<RecentEntries>,
    status: Arc<UploadStatus>,
}

impl StatusListener {
    #[must_use]
    pub fn new(uploads_enabled: bool) -> Self {
        Self {
            recent: Arc::new(RecentEntries::default()),
            status: Arc::new(UploadStatus::new(uploads_enabled)),
        }
    }

    #[must_use]
    pub fn recent(&self) -> Arc<RecentEntries> {
        Arc::clone(&self.recent)
    }

    #[must_use]
    pub fn status(&self) -> Arc<UploadStatus> {
        Arc::clone(&self.status)
    }
}

impl BatchListener for StatusListener {
    fn on_accepted(&self, entry: &LogEntry) {
        self.recent.push(entry.clone());
    }

    fn on_flushed(&self, count: usize, key: &str) {
        self.status.record_upload(count, key);
    }
}
