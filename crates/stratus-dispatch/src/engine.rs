//! StorageEngine — the blob store wired to the event dispatcher.
//!
//! Constructed once at startup and shared (by reference or `Arc`) with
//! the function router and the HTTP layer. The dispatch loop is started
//! explicitly with [`StorageEngine::start`] and stopped with
//! [`StorageEngine::shutdown`], which drains pending deliveries.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use stratus_core::QueueMap;
use stratus_core::config::{DispatchConfig, StorageConfig};
use stratus_storage::BlobStore;

use crate::dispatcher::Dispatcher;
use crate::error::EngineResult;

pub struct StorageEngine {
    blobs: BlobStore,
    dispatcher: Arc<Dispatcher>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StorageEngine {
    /// Open the store and read the queue map as configured.
    pub fn open(storage: &StorageConfig, dispatch: &DispatchConfig) -> EngineResult<Self> {
        let queues = QueueMap::load(&storage.queues)?;
        Self::with_queues(&storage.root, queues, dispatch)
    }

    pub fn with_queues(
        root: &Path,
        queues: QueueMap,
        dispatch: &DispatchConfig,
    ) -> EngineResult<Self> {
        let dispatcher = Arc::new(Dispatcher::new(queues, dispatch));
        let blobs = BlobStore::open(root)?.with_observer(dispatcher.clone());
        let (shutdown_tx, _) = watch::channel(false);
        info!(?root, queues = dispatcher.queues().len(), "storage engine ready");
        Ok(Self {
            blobs,
            dispatcher,
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Spawn the dispatch loop on the current tokio runtime.
    ///
    /// Calling it again while running is a no-op; an engine that has been
    /// shut down stays stopped.
    pub fn start(&self) {
        if *self.shutdown_tx.borrow() {
            warn!("storage engine already shut down, not restarting dispatcher");
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let shutdown = self.shutdown_tx.subscribe();
        *task = Some(tokio::spawn(self.dispatcher.clone().run(shutdown)));
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stop the dispatch loop after delivering everything still queued.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "dispatcher task ended abnormally");
            }
        }
    }
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
