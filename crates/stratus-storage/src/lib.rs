//! stratus-storage — local emulation of a tagged blob storage account.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   tags.json            container → blob name → tag map
//!   <container>/<name>   raw payloads
//! ```
//!
//! Tags live in a single catalog next to (not inside) the payloads and are
//! rewritten in full on every tag update. Every payload write is reported
//! to an optional [`WriteObserver`], which is how blob events reach queue
//! subscribers.
//!
//! `BlobStore` is `Clone` + `Send` + `Sync` and can be shared across
//! request handlers and worker tasks.

pub mod client;
pub mod error;
pub mod query;
pub mod store;
pub mod tags;
pub mod types;

pub use client::{BLOB_ENDPOINT, BlobClient, BlobPermissions, ContainerClient, blob_url};
pub use error::{QueryError, StorageError, StorageResult};
pub use query::{Comparison, TagQuery};
pub use store::{BlobStore, WriteObserver};
pub use tags::TagCatalog;
pub use types::{BlobDescriptor, Tags};
