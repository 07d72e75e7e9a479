//! Queue message handed to queue-triggered functions.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::envelope::BlobCreatedEvent;

/// A JSON-bodied message as seen by a queue subscriber.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    message_id: String,
    body: Bytes,
}

impl QueueMessage {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            body: body.into(),
        }
    }

    pub fn from_json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::to_vec(value)?))
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn content_type(&self) -> &'static str {
        "application/json"
    }

    pub fn get_body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Decode the body as a blob-created event.
    pub fn blob_event(&self) -> serde_json::Result<BlobCreatedEvent> {
        self.json()
    }
}

impl From<&BlobCreatedEvent> for QueueMessage {
    fn from(event: &BlobCreatedEvent) -> Self {
        // Serializing plain strings and integers cannot fail.
        Self::from_json(event).unwrap_or_else(|_| Self::new(Bytes::new()))
    }
}
