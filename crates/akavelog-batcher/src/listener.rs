// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::model::LogEntry;

/// Observer for batcher activity.
///
/// Both hooks are invoked synchronously on the calling task, after the buffer
/// lock has been released. Implementations should return quickly since the
/// producer (or the flushing task) waits on them.
pub trait BatchListener: Send + Sync {
    /// Called once for every record that passed validation and was buffered.
    fn on_accepted(&self, _entry: &LogEntry) {}

    /// Called after a batch of `count` records was uploaded under `key`.
    /// Never called for failed or discarded batches.
    fn on_flushed(&self, _count: usize, _key: &str) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl BatchListener for NoopListener {}
