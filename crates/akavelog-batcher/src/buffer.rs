// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lock-guarded buffer holding the batch currently being accumulated.
//!
//! The buffer is the only shared mutable state in the pipeline. Every
//! operation holds the lock for a constant amount of work and never across
//! an `.await`.
//!
//! # Snapshot and clear
//!
//! [`EntryBuffer::take`] swaps the live vector for a fresh empty allocation
//! inside a single critical section:
//!
//! ```text
//!   before:  live = [e1, e2, e3]
//!   take():  snapshot = [e1, e2, e3]   live = []
//!   insert:  live = [e4]               (never lands in the snapshot)
//! ```
//!
//! The returned snapshot is exclusively owned by the caller.

use std::sync::Mutex;

use crate::model::LogEntry;

/// Upper bound on the slots reserved up front for a fresh batch.
pub const MAX_PREALLOCATED_ENTRIES: usize = 1024;

#[derive(Debug)]
pub struct EntryBuffer {
    entries: Mutex<Vec<LogEntry>>,
    /// Capacity reserved for each fresh batch.
    capacity: usize,
}

impl EntryBuffer {
    /// `expected` is the batch size the buffer is sized for; at most
    /// [`MAX_PREALLOCATED_ENTRIES`] slots are reserved, the rest grow on demand.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        let capacity = expected.min(MAX_PREALLOCATED_ENTRIES);
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends `entry` and returns the buffer length right after the append.
    pub fn append(&self, entry: LogEntry) -> usize {
        #[allow(clippy::expect_used)]
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.push(entry);
        entries.len()
    }

    /// Atomically takes every buffered entry, leaving the buffer empty.
    ///
    /// Returns `None` when there was nothing to take.
    pub fn take(&self) -> Option<Vec<LogEntry>> {
        #[allow(clippy::expect_used)]
        let mut entries = self.entries.lock().expect("lock poisoned");
        if entries.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut *entries,
            Vec::with_capacity(self.capacity),
        ))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        #[allow(clippy::expect_used)]
        self.entries.lock().expect("lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
