// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching front end shared by every producer.
//!
//! # Flush triggers
//!
//! ```text
//!    ┌──────────────┐
//!    │   Batcher    │ (Clone, one per producer)
//!    └──────┬───────┘
//!           │ insert(raw)
//!           v
//!    ┌──────────────┐   len >= max_batch_size   ┌──────────────┐
//!    │ EntryBuffer  │ ────────────────────────> │   Flusher    │
//!    └──────────────┘                           └──────────────┘
//!           ▲                                          ▲
//!           │ every flush_interval                     │
//!    ┌──────┴───────┐                                  │
//!    │  FlushTask   │ ─────────────────────────────────┘
//!    └──────────────┘
//! ```
//!
//! Size-triggered flushes run inline on the inserting task. The periodic
//! flush runs on a background task owned by [`FlushTask`]; stopping it waits
//! for any in-flight periodic flush and then drains the buffer one last time.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let (batcher, flush_task) = Batcher::start(
//!     BatcherConfig::new(1000, Duration::from_secs(30)),
//!     Storage::configured(ObjectStoreStorage::in_memory()),
//!     Arc::new(NoopListener),
//! );
//!
//! batcher.insert(br#"{"service":"api","message":"hello"}"#).await;
//!
//! flush_task.stop().await;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::buffer::EntryBuffer;
use crate::config::BatcherConfig;
use crate::flusher::{FlushOutcome, Flusher};
use crate::listener::BatchListener;
use crate::storage::Storage;
use crate::validator;

struct Shared {
    buffer: EntryBuffer,
    flusher: Flusher,
    listener: Arc<dyn BatchListener>,
    max_batch_size: usize,
}

/// Cloneable handle for inserting records and requesting flushes.
#[derive(Clone)]
pub struct Batcher {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("pending", &self.pending())
            .field("max_batch_size", &self.shared.max_batch_size)
            .finish_non_exhaustive()
    }
}

impl Batcher {
    /// Builds a batcher and spawns its periodic flush task.
    ///
    /// Zero values in `config` are replaced by their defaults. Must be called
    /// from within a Tokio runtime.
    #[must_use]
    pub fn start(
        config: BatcherConfig,
        storage: Storage,
        listener: Arc<dyn BatchListener>,
    ) -> (Self, FlushTask) {
        let config = config.normalized();
        if !storage.is_configured() {
            warn!("BATCHER | Object storage not configured, batches will be discarded");
        }

        let batcher = Batcher {
            shared: Arc::new(Shared {
                buffer: EntryBuffer::new(config.max_batch_size),
                flusher: Flusher::new(storage, &config),
                listener,
                max_batch_size: config.max_batch_size,
            }),
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            batcher.clone(),
            config.flush_interval,
            cancel.clone(),
        ));
        debug!(
            "BATCHER | Started with max_batch_size={} flush_interval={:?}",
            config.max_batch_size, config.flush_interval
        );

        let task = FlushTask {
            batcher: batcher.clone(),
            cancel,
            handle,
        };
        (batcher, task)
    }

    /// Validates and buffers one raw record.
    ///
    /// Invalid records are logged and dropped. When the append brings the
    /// buffer to `max_batch_size`, the flush runs before this returns.
    pub async fn insert(&self, raw: &[u8]) {
        let entry = match validator::validate(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("BATCHER | Dropping invalid log record: {e}");
                return;
            }
        };

        let len = self.shared.buffer.append(entry.clone());
        self.shared.listener.on_accepted(&entry);

        if len >= self.shared.max_batch_size {
            debug!("BATCHER | Buffer reached {len} entries, flushing");
            self.flush().await;
        }
    }

    /// Takes everything buffered and ships it as one batch.
    ///
    /// Records inserted while the upload is in progress go to the next batch.
    pub async fn flush(&self) -> FlushOutcome {
        let Some(batch) = self.shared.buffer.take() else {
            return FlushOutcome::Empty;
        };

        let outcome = self.shared.flusher.ship(batch).await;
        if let FlushOutcome::Uploaded { count, key } = &outcome {
            self.shared.listener.on_flushed(*count, key);
        }
        outcome
    }

    /// Number of records waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.buffer.len()
    }
}

/// Owner of the periodic flush task.
///
/// Dropping it without calling [`FlushTask::stop`] leaves the task running
/// until the runtime shuts down.
#[derive(Debug)]
pub struct FlushTask {
    batcher: Batcher,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushTask {
    /// Stops the periodic flush and drains what is left in the buffer.
    ///
    /// Waits for an in-flight periodic flush before the final one.
    pub async fn stop(self) -> FlushOutcome {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!("BATCHER | Flush task ended abnormally: {e}");
        }
        debug!("BATCHER | Final flush");
        self.batcher.flush().await
    }
}

async fn run_scheduler(batcher: Batcher, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // discard first tick

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("BATCHER | Flush task stopped");
                break;
            }
            _ = ticker.tick() => {
                batcher.flush().await;
            }
        }
    }
}
