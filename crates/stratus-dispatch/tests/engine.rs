//! End-to-end storage engine tests: blob writes fan out to queue subscribers.

use std::sync::Arc;
use std::time::Duration;

use stratus_core::QueueMap;
use stratus_core::config::DispatchConfig;
use stratus_dispatch::{DeliveryFuture, QueueMessage, StorageEngine, Subscriber};
use tokio::sync::mpsc;

struct Handler {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl Subscriber for Handler {
    fn name(&self) -> &str {
        "H"
    }

    fn deliver(&self, message: QueueMessage) -> DeliveryFuture {
        let tx = self.tx.clone();
        Box::pin(async move {
            let _ = tx.send(message);
            Ok(())
        })
    }
}

fn engine(dir: &std::path::Path) -> StorageEngine {
    let queues: QueueMap = [("todo", "Q")].into_iter().collect();
    StorageEngine::with_queues(
        dir,
        queues,
        &DispatchConfig {
            workers: 10,
            poll_interval_ms: 100,
        },
    )
    .unwrap()
}

fn subscribe(engine: &StorageEngine) -> mpsc::UnboundedReceiver<QueueMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    engine.dispatcher().subscribe("Q", Arc::new(Handler { tx }));
    rx
}

#[tokio::test]
async fn put_into_mapped_container_invokes_subscriber_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut rx = subscribe(&engine);
    engine.start();
    assert!(engine.is_running());

    engine.blobs().put("todo", "a.txt", b"12345").unwrap();

    let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("delivery within 1s")
        .unwrap();
    let event = message.blob_event().unwrap();
    assert_eq!(event.data.content_length, 5);
    assert_eq!(event.blob(), Some(("todo", "a.txt")));

    engine.shutdown().await;
    assert!(!engine.is_running());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn put_into_unmapped_container_invokes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut rx = subscribe(&engine);
    engine.start();

    engine.blobs().put("elsewhere", "a.txt", b"12345").unwrap();
    assert_eq!(engine.dispatcher().pending(), 0);

    engine.shutdown().await;
    assert!(rx.try_recv().is_err());
    assert!(engine.blobs().exists("elsewhere", "a.txt"));
}

#[tokio::test]
async fn subscriber_reads_blob_and_tags_from_event() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut rx = subscribe(&engine);
    engine.start();

    let tags = [("tts".to_string(), "100".to_string())].into();
    engine
        .blobs()
        .container("todo")
        .get_blob_client("note.txt")
        .upload_blob(b"hello", Some(tags))
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let event = message.blob_event().unwrap();
    let (container, name) = event.blob().unwrap();
    assert_eq!(engine.blobs().get(container, name).unwrap(), b"hello");
    assert_eq!(engine.blobs().get_tags(container, name)["tts"], "100");

    engine.shutdown().await;
}

#[tokio::test]
async fn writes_before_start_are_delivered_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let mut rx = subscribe(&engine);

    engine.blobs().put("todo", "early.txt", b"x").unwrap();
    assert_eq!(engine.dispatcher().pending(), 1);

    engine.start();
    engine.shutdown().await;
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn shutdown_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    engine.shutdown().await;
    engine.start();
    assert!(!engine.is_running());
}
