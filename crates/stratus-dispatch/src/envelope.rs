//! The "blob created" event envelope delivered to queue subscribers.
//!
//! Field names and shapes follow the cloud event schema handler code
//! already parses; values that have no local meaning are filled with a
//! placeholder.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stratus_storage::blob_url;

pub const BLOB_CREATED: &str = "Microsoft.Storage.BlobCreated";

const PLACEHOLDER: &str = "...";
const SUBJECT_PREFIX: &str = "/blobServices/default/containers/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobCreatedEvent {
    pub topic: String,
    /// `/blobServices/default/containers/{container}/blobs/{name}`
    pub subject: String,
    pub event_type: String,
    pub id: String,
    pub data: BlobCreatedData,
    pub data_version: String,
    pub metadata_version: String,
    /// ISO-8601 UTC timestamp without offset suffix.
    pub event_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobCreatedData {
    pub api: String,
    pub client_request_id: String,
    pub request_id: String,
    pub e_tag: String,
    pub content_type: String,
    pub content_length: u64,
    pub blob_type: String,
    pub url: String,
    pub sequencer: String,
    pub storage_diagnostics: StorageDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDiagnostics {
    pub batch_id: String,
}

impl BlobCreatedEvent {
    pub fn new(container: &str, name: &str, size: u64) -> Self {
        Self {
            topic: PLACEHOLDER.to_string(),
            subject: format!("{SUBJECT_PREFIX}{container}/blobs/{name}"),
            event_type: BLOB_CREATED.to_string(),
            id: Uuid::new_v4().to_string(),
            data: BlobCreatedData {
                api: "PutBlockList".to_string(),
                client_request_id: Uuid::new_v4().to_string(),
                request_id: Uuid::new_v4().to_string(),
                e_tag: PLACEHOLDER.to_string(),
                content_type: "application/octet-stream".to_string(),
                content_length: size,
                blob_type: "BlockBlob".to_string(),
                url: blob_url(container, name),
                sequencer: PLACEHOLDER.to_string(),
                storage_diagnostics: StorageDiagnostics {
                    batch_id: PLACEHOLDER.to_string(),
                },
            },
            data_version: String::new(),
            metadata_version: "1".to_string(),
            event_time: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }

    /// Recover `(container, name)` from the subject path.
    pub fn blob(&self) -> Option<(&str, &str)> {
        self.subject
            .strip_prefix(SUBJECT_PREFIX)?
            .split_once("/blobs/")
    }
}
