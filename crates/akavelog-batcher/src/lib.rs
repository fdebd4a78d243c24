// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # akavelog batcher
//!
//! Accepts JSON log records from any number of concurrent producers, groups
//! them into bounded batches and ships each batch as a gzip-compressed JSON
//! array to an S3-compatible object store.
//!
//! ## Pipeline
//!
//! ```text
//!   producer ──> validator ──> buffer ──(size threshold)──┐
//!                                 ▲                       v
//!                                 │                   flusher ──> storage
//!                       scheduler ┘(every interval)──────┘
//! ```
//!
//! - [`validator`]: raw bytes to a normalized [`model::LogEntry`]
//! - [`buffer`]: lock-guarded entry buffer with atomic snapshot-and-clear
//! - [`batcher`]: insertion, size-triggered flushes, periodic scheduler, drain on stop
//! - [`flusher`]: serialize, compress, name and upload one snapshot
//! - [`storage`]: object store capability and key naming
//! - [`listener`] / [`recent`]: observer hooks and operator views

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod buffer;
pub mod config;
pub mod errors;
pub mod flusher;
pub mod listener;
pub mod logger;
pub mod model;
pub mod recent;
pub mod storage;
pub mod validator;

pub use batcher::{Batcher, FlushTask};
pub use config::BatcherConfig;
pub use flusher::FlushOutcome;
pub use listener::{BatchListener, NoopListener};
pub use model::LogEntry;
pub use storage::{LogStorage, ObjectStoreStorage, Storage};
