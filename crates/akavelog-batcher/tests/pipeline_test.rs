// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use akavelog_batcher::{
    config::StorageConfig,
    errors::UploadError,
    recent::StatusListener,
    BatchListener, Batcher, BatcherConfig, FlushOutcome, LogEntry, LogStorage, NoopListener,
    ObjectStoreStorage, Storage,
};
use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use mockito::{Matcher, Server};
use object_store::path::Path;
use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct RecordingStorage {
    puts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingStorage {
    fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, body)| decode(body))
            .collect()
    }
}

#[async_trait]
impl LogStorage for RecordingStorage {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), UploadError> {
        self.puts.lock().unwrap().push((key.to_string(), body));
        Ok(())
    }
}

struct FailingStorage;

#[async_trait]
impl LogStorage for FailingStorage {
    async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), UploadError> {
        Err(UploadError::Rejected("service unavailable".to_string()))
    }
}

#[derive(Default)]
struct FlushedKeys {
    flushed: Mutex<Vec<(usize, String)>>,
}

impl BatchListener for FlushedKeys {
    fn on_flushed(&self, count: usize, key: &str) {
        self.flushed.lock().unwrap().push((count, key.to_string()));
    }
}

fn decode(body: &[u8]) -> Vec<LogEntry> {
    let mut json = Vec::new();
    GzDecoder::new(body).read_to_end(&mut json).unwrap();
    serde_json::from_slice(&json).unwrap()
}

fn record(service: &str, message: &str) -> Vec<u8> {
    format!(r#"{{"service":"{service}","message":"{message}"}}"#).into_bytes()
}

fn is_batch_key(key: &str, project: &str) -> bool {
    let prefix = format!("logs/{project}/{}/", Utc::now().format("%Y/%m/%d"));
    key.strip_prefix(&prefix)
        .and_then(|rest| rest.strip_suffix(".json.gz"))
        .is_some_and(|id| uuid::Uuid::parse_str(id).is_ok())
}

#[tokio::test]
async fn size_threshold_uploads_one_batch() {
    let storage = Arc::new(RecordingStorage::default());
    let listener = Arc::new(FlushedKeys::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(3, HOUR),
        Storage::Configured(storage.clone()),
        listener.clone(),
    );

    batcher.insert(&record("a", "1")).await;
    batcher.insert(&record("a", "2")).await;
    batcher.insert(&record("a", "3")).await;

    let keys = storage.keys();
    assert_eq!(keys.len(), 1);
    assert!(is_batch_key(&keys[0], "default"), "unexpected key {}", keys[0]);

    let messages: Vec<_> = storage.entries().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["1", "2", "3"]);
    assert_eq!(*listener.flushed.lock().unwrap(), vec![(3, keys[0].clone())]);
    assert_eq!(batcher.pending(), 0);

    task.stop().await;
}

#[tokio::test]
async fn batch_entries_are_normalized() {
    let storage = Arc::new(RecordingStorage::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(1, HOUR),
        Storage::Configured(storage.clone()),
        Arc::new(NoopListener),
    );

    batcher.insert(br#"{"service":"api","message":"hi"}"#).await;

    let entries = storage.entries();
    assert_eq!(entries[0].level, "info");
    assert_eq!(entries[0].timestamp, "0");
    assert!(entries[0].tags.is_empty());

    task.stop().await;
}

#[tokio::test]
async fn invalid_records_never_reach_storage() {
    let storage = Arc::new(RecordingStorage::default());
    let listener = StatusListener::new(true);
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(1, HOUR),
        Storage::Configured(storage.clone()),
        Arc::new(listener.clone()),
    );

    batcher.insert(b"not json").await;
    batcher.insert(br#"{"service":"","message":"x"}"#).await;
    batcher.insert(br#"{"service":"api"}"#).await;

    assert_eq!(batcher.pending(), 0);
    assert!(storage.keys().is_empty());
    assert!(listener.recent().snapshot().is_empty());

    assert!(matches!(task.stop().await, FlushOutcome::Empty));
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn status_listener_reports_last_upload() {
    let listener = StatusListener::new(true);
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(2, HOUR),
        Storage::configured(RecordingStorage::default()),
        Arc::new(listener.clone()),
    );

    for i in 0..3 {
        batcher.insert(&record("api", &i.to_string())).await;
    }

    let status = listener.status().snapshot(batcher.pending());
    assert!(status.enabled);
    assert_eq!(status.pending, 1);
    assert_eq!(status.last_upload_count, 2);
    assert!(is_batch_key(status.last_upload_key.as_deref().unwrap(), "default"));

    let recent = listener.recent().snapshot();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[2].entry.message, "2");

    task.stop().await;
}

#[tokio::test]
async fn failed_upload_drops_batch() {
    let listener = Arc::new(FlushedKeys::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(2, HOUR),
        Storage::configured(FailingStorage),
        listener.clone(),
    );

    batcher.insert(&record("a", "1")).await;
    batcher.insert(&record("a", "2")).await;

    assert_eq!(batcher.pending(), 0);
    assert!(listener.flushed.lock().unwrap().is_empty());

    batcher.insert(&record("a", "3")).await;
    assert_eq!(batcher.pending(), 1);
    assert!(matches!(
        task.stop().await,
        FlushOutcome::Failed { count: 1, .. }
    ));
    assert!(listener.flushed.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interval_flush_ships_partial_batch() {
    let storage = Arc::new(RecordingStorage::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(100, Duration::from_secs(1)),
        Storage::Configured(storage.clone()),
        Arc::new(NoopListener),
    );

    batcher.insert(&record("a", "1")).await;
    batcher.insert(&record("a", "2")).await;
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(storage.keys().len(), 1);
    assert_eq!(storage.entries().len(), 2);
    assert_eq!(batcher.pending(), 0);

    task.stop().await;
}

#[tokio::test(start_paused = true)]
async fn interval_flush_skips_empty_buffer() {
    let storage = Arc::new(RecordingStorage::default());
    let (_batcher, task) = Batcher::start(
        BatcherConfig::new(100, Duration::from_secs(1)),
        Storage::Configured(storage.clone()),
        Arc::new(NoopListener),
    );

    sleep(Duration::from_secs(5)).await;
    assert!(storage.keys().is_empty());

    assert!(matches!(task.stop().await, FlushOutcome::Empty));
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn stop_drains_remaining_entries() {
    let storage = Arc::new(RecordingStorage::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(1000, HOUR),
        Storage::Configured(storage.clone()),
        Arc::new(NoopListener),
    );

    for i in 0..10 {
        batcher.insert(&record("a", &i.to_string())).await;
    }
    assert!(storage.keys().is_empty());

    let outcome = task.stop().await;
    assert!(matches!(outcome, FlushOutcome::Uploaded { count: 10, .. }));
    assert_eq!(storage.entries().len(), 10);
}

#[tokio::test]
async fn stop_without_storage_discards() {
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(1000, HOUR),
        Storage::Absent,
        Arc::new(NoopListener),
    );
    batcher.insert(&record("a", "1")).await;

    assert!(matches!(
        task.stop().await,
        FlushOutcome::Discarded { count: 1 }
    ));
    assert_eq!(batcher.pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_nothing() {
    let storage = Arc::new(RecordingStorage::default());
    let listener = Arc::new(FlushedKeys::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(64, Duration::from_millis(5)),
        Storage::Configured(storage.clone()),
        listener.clone(),
    );

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let batcher = batcher.clone();
            tokio::spawn(async move {
                for i in 0..250 {
                    batcher.insert(&record("api", &format!("{p}-{i}"))).await;
                    if i % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }
    task.stop().await;

    let entries = storage.entries();
    let unique: HashSet<_> = entries.iter().map(|e| e.message.clone()).collect();
    assert_eq!(entries.len(), 2000);
    assert_eq!(unique.len(), 2000);

    let flushed: usize = listener.flushed.lock().unwrap().iter().map(|(n, _)| n).sum();
    assert_eq!(flushed, 2000);
    assert_eq!(storage.keys().len(), listener.flushed.lock().unwrap().len());
}

#[tokio::test]
async fn in_memory_store_holds_gzipped_batch() {
    let storage = ObjectStoreStorage::in_memory();
    let store = storage.store();
    let listener = Arc::new(FlushedKeys::default());
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(2, HOUR).with_project_id("acme"),
        Storage::configured(storage),
        listener.clone(),
    );

    batcher
        .insert(br#"{"service":"api","message":"a","tags":{"env":"prod"}}"#)
        .await;
    batcher.insert(&record("api", "b")).await;

    let (count, key) = listener.flushed.lock().unwrap()[0].clone();
    assert_eq!(count, 2);
    assert!(is_batch_key(&key, "acme"));

    let body = store.get(&Path::from(key)).await.unwrap().bytes().await.unwrap();
    let entries = decode(&body);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].tags.get("env").map(String::as_str), Some("prod"));

    task.stop().await;
}

#[tokio::test]
async fn s3_endpoint_receives_batch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock(
            "PUT",
            Matcher::Regex(r"^/akavelog/logs/default/\d{4}/\d{2}/\d{2}/[0-9a-f-]{36}\.json\.gz$".to_string()),
        )
        .match_header("content-type", "application/gzip")
        .with_status(200)
        .with_header("ETag", "\"9b2cf535f27731c974343645a3985328\"")
        .expect(1)
        .create_async()
        .await;

    let config = StorageConfig {
        endpoint: server.url(),
        bucket: "akavelog".to_string(),
        region: "us-east-1".to_string(),
        access_key: "access".to_string(),
        secret_key: "secret".to_string(),
    };
    let storage = ObjectStoreStorage::from_config(&config).unwrap().unwrap();
    let (batcher, task) = Batcher::start(
        BatcherConfig::new(1, HOUR),
        Storage::configured(storage),
        Arc::new(NoopListener),
    );

    batcher.insert(&record("api", "hello")).await;

    mock.assert_async().await;
    task.stop().await;
}
