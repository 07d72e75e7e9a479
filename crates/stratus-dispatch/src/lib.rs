//! stratus-dispatch — asynchronous delivery of blob events to queue subscribers.
//!
//! # Architecture
//!
//! ```text
//! BlobStore::put
//!   │  WriteObserver::blob_created
//!   ▼
//! Dispatcher::notify ── container → queue → subscribers
//!   │  one outbox entry per subscriber
//!   ▼
//! outbox (Mutex<VecDeque>)
//!   │  drained by the dispatch loop every poll interval
//!   ▼
//! worker pool (semaphore-bounded tokio tasks)
//!   │  Subscriber::deliver, failures and panics logged
//!   ▼
//! handler
//! ```
//!
//! Delivery is best-effort: the outbox lives in memory, nothing is
//! redelivered, and there is no ordering between subscribers of the same
//! event. `StorageEngine` owns the store, the dispatcher, and the loop's
//! lifecycle.

pub mod dispatcher;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod message;

pub use dispatcher::{DeliveryFuture, Dispatcher, Subscriber};
pub use engine::StorageEngine;
pub use envelope::{BlobCreatedData, BlobCreatedEvent};
pub use error::{EngineError, EngineResult};
pub use message::QueueMessage;
