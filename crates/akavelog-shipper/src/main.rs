// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use akavelog_batcher::{
    config::Config,
    logger::Formatter,
    recent::StatusListener,
    Batcher, FlushOutcome, ObjectStoreStorage, Storage,
};

#[tokio::main]
pub async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("AKAVELOG | ERROR | {e}");
            return;
        }
    };

    let env_filter = format!("hyper=off,reqwest=off,rustls=off,{}", config.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let storage = match ObjectStoreStorage::from_config(&config.storage) {
        Ok(Some(storage)) => Storage::configured(storage),
        Ok(None) => Storage::Absent,
        Err(e) => {
            error!("Could not set up object storage: {e}");
            return;
        }
    };

    let listener = StatusListener::new(storage.is_configured());
    let (batcher, flush_task) =
        Batcher::start(config.batcher.clone(), storage, Arc::new(listener.clone()));
    info!(
        "Shipping logs from stdin, max_batch_size={} flush_interval={:?}",
        config.batcher.max_batch_size, config.batcher.flush_interval
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        batcher.insert(line.as_bytes()).await;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Interrupted, draining");
                break;
            }
        }
    }

    match flush_task.stop().await {
        FlushOutcome::Failed { count, .. } => error!("Lost {count} logs on shutdown"),
        FlushOutcome::Discarded { count } => info!("Discarded {count} logs, no storage"),
        FlushOutcome::Uploaded { .. } | FlushOutcome::Empty => {}
    }

    let status = listener.status().snapshot(batcher.pending());
    info!(
        "Stopped, last upload {} ({} logs)",
        status.last_upload_key.as_deref().unwrap_or("none"),
        status.last_upload_count
    );
}
