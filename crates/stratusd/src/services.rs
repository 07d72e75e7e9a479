//! Built-in demo functions.
//!
//! Matched by name against the manifests under `demos/services`.

use axum::http::StatusCode;
use chrono::Utc;
use tracing::info;

use stratus_storage::{BlobStore, Tags};
use stratus_functions::{Handler, HandlerOutput, HandlerRegistry, HttpResponse, Invocation};

const TODO_CONTAINER: &str = "todo";

/// Seconds to wait before each retry of a due blob.
const BACKOFF: [i64; 3] = [5, 10, 15];

pub fn registry(store: BlobStore) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    let create_store = store.clone();
    let read_store = store.clone();
    let check_store = store;

    registry
        .register("hello_function", Handler::new(hello))
        .register(
            "create_file_function",
            Handler::new(move |invocation| create_file(create_store.clone(), invocation)),
        )
        .register(
            "hello2_function",
            Handler::new(move |invocation| hello2(read_store.clone(), invocation)),
        )
        .register("timed_hello_function", Handler::new(timed_hello).with_context())
        .register(
            "timed_check_function",
            Handler::new(move |invocation| timed_check(check_store.clone(), invocation)),
        );
    registry
}

async fn hello(invocation: Invocation) -> anyhow::Result<HandlerOutput> {
    let name = invocation.http().and_then(|r| r.param("name"));
    info!(name = ?name, "hello");
    Ok(match name {
        Some(name) if !name.is_empty() => format!("Hello, {name}.\n").into(),
        _ => "Hello.\n".into(),
    })
}

/// Upload `content` as `filename` into the todo container, due in 10s.
async fn create_file(store: BlobStore, invocation: Invocation) -> anyhow::Result<HandlerOutput> {
    let request = invocation
        .http()
        .ok_or_else(|| anyhow::anyhow!("create_file_function expects an http trigger"))?;
    let Some(filename) = request.param("filename").filter(|f| !f.is_empty()) else {
        return Ok(HttpResponse::text("missing filename\n")
            .status(StatusCode::BAD_REQUEST)
            .into());
    };
    let content = request.param("content").unwrap_or_default();

    let tts = (Utc::now().timestamp() + 10).to_string();
    let tags = Tags::from([("tts".to_string(), tts)]);
    store
        .container(TODO_CONTAINER)
        .get_blob_client(filename)
        .upload_blob(content.as_bytes(), Some(tags))?;
    info!(blob = %filename, "created blob due in 10s");
    Ok("ok".into())
}

/// Read the blob a creation event points at.
async fn hello2(store: BlobStore, invocation: Invocation) -> anyhow::Result<HandlerOutput> {
    let message = invocation
        .queue()
        .ok_or_else(|| anyhow::anyhow!("hello2_function expects a queue trigger"))?;
    let event = message.blob_event()?;
    let (container, name) = event
        .blob()
        .ok_or_else(|| anyhow::anyhow!("unexpected event subject {}", event.subject))?;
    let content = store.container(container).download_blob(name)?;
    info!(%container, blob = %name, "someone said hello");
    info!(content = %String::from_utf8_lossy(&content), "blob content");
    Ok(HandlerOutput::None)
}

async fn timed_hello(invocation: Invocation) -> anyhow::Result<HandlerOutput> {
    if invocation.timer().is_some_and(|t| t.past_due()) {
        info!("the timer is past due");
    }
    info!(
        invocation_id = invocation.context().map(|c| c.invocation_id()).unwrap_or_default(),
        at = %Utc::now().to_rfc3339(),
        "timer function ran"
    );
    Ok(HandlerOutput::None)
}

/// Re-schedule every due blob in the todo container with backoff.
async fn timed_check(store: BlobStore, _invocation: Invocation) -> anyhow::Result<HandlerOutput> {
    let now = Utc::now().timestamp();
    let due = store.find_blobs_by_tags(&format!(
        "@container = '{TODO_CONTAINER}' AND \"tts\" <= '{now}'"
    ))?;
    let container = store.container(TODO_CONTAINER);
    for blob in due {
        info!(blob = %blob.name, tags = ?blob.tags, "blob is due");
        let tags = next_attempt(blob.tags, now);
        container.get_blob_client(blob.name).set_blob_tags(tags)?;
    }
    Ok(HandlerOutput::None)
}

/// Tags after one more attempt: schedule the next retry, or mark the blob
/// done once the backoff is exhausted.
fn next_attempt(mut tags: Tags, now: i64) -> Tags {
    let retries = tags.get("retries").map(|r| r.parse::<usize>().unwrap_or(0) + 1);
    match retries {
        None => {
            info!("first attempt");
            tags.insert("retries".to_string(), "0".to_string());
            tags.insert("tts".to_string(), (now + BACKOFF[0]).to_string());
        }
        Some(retries) => match BACKOFF.get(retries) {
            Some(delay) => {
                let next = now + delay;
                info!(retries, next, "retrying");
                tags.insert("retries".to_string(), retries.to_string());
                tags.insert("tts".to_string(), next.to_string());
            }
            None => {
                info!(retries, "out of retries, done");
                tags.insert("tts".to_string(), "no".to_string());
                tags.insert("status".to_string(), "done".to_string());
            }
        },
    }
    tags
}
