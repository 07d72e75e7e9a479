//! Dispatcher — outbox plus worker pool for queue deliveries.
//!
//! `notify` runs on the writer's thread and only appends to the outbox.
//! `run` is the background loop that drains the outbox and hands each
//! entry to a semaphore-bounded pool of tokio tasks. A failing or
//! panicking subscriber is logged and never affects the loop or other
//! deliveries.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use stratus_core::QueueMap;
use stratus_core::config::DispatchConfig;
use stratus_storage::WriteObserver;

use crate::envelope::BlobCreatedEvent;
use crate::message::QueueMessage;

pub type DeliveryFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A handler subscribed to a logical queue.
pub trait Subscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Handle one message. The returned future runs on a pool worker.
    fn deliver(&self, message: QueueMessage) -> DeliveryFuture;
}

/// One pending (subscriber, message) pair.
struct Delivery {
    subscriber: Arc<dyn Subscriber>,
    message: QueueMessage,
}

pub struct Dispatcher {
    queues: QueueMap,
    /// queue name → subscribers, in subscription order.
    subscriptions: RwLock<HashMap<String, Vec<Arc<dyn Subscriber>>>>,
    outbox: Mutex<VecDeque<Delivery>>,
    workers: Arc<Semaphore>,
    worker_count: usize,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(queues: QueueMap, config: &DispatchConfig) -> Self {
        let worker_count = config.workers.max(1);
        Self {
            queues,
            subscriptions: RwLock::new(HashMap::new()),
            outbox: Mutex::new(VecDeque::new()),
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
            poll_interval: config.poll_interval(),
        }
    }

    pub fn queues(&self) -> &QueueMap {
        &self.queues
    }

    /// Add a subscriber to a queue. Subscriptions are never removed.
    pub fn subscribe(&self, queue: &str, subscriber: Arc<dyn Subscriber>) {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        info!(%queue, function = subscriber.name(), "subscription added");
        subscriptions
            .entry(queue.to_string())
            .or_default()
            .push(subscriber);
    }

    pub fn subscriber_count(&self, queue: &str) -> usize {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        subscriptions.get(queue).map_or(0, Vec::len)
    }

    /// Queue one delivery per subscriber of the container's queue.
    ///
    /// An unmapped container or a queue without subscribers is logged
    /// and ignored.
    pub fn notify(&self, container: &str, name: &str, size: u64) {
        let Some(queue) = self.queues.queue_for(container) else {
            warn!(%container, blob = %name, "no queue mapped for container");
            return;
        };
        let subscribers = {
            let subscriptions = self
                .subscriptions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscriptions.get(queue).cloned().unwrap_or_default()
        };
        if subscribers.is_empty() {
            warn!(%queue, %container, blob = %name, "no subscription on queue");
            return;
        }

        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers {
            debug!(%queue, function = subscriber.name(), blob = %name, "queueing blob event");
            let event = BlobCreatedEvent::new(container, name, size);
            outbox.push_back(Delivery {
                subscriber,
                message: QueueMessage::from(&event),
            });
        }
    }

    /// Number of deliveries waiting in the outbox.
    pub fn pending(&self) -> usize {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn take_pending(&self) -> Vec<Delivery> {
        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        outbox.drain(..).collect()
    }

    /// Drain the outbox until shutdown is signalled, then drain it one
    /// last time and wait for in-flight deliveries.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            workers = self.worker_count,
            poll_ms = self.poll_interval.as_millis() as u64,
            "blob event dispatcher started"
        );
        let mut in_flight = JoinSet::new();

        loop {
            let batch = self.take_pending();
            let idle = batch.is_empty();
            for delivery in batch {
                self.submit(&mut in_flight, delivery);
            }
            reap(&mut in_flight);

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = shutdown.changed() => break,
                }
            } else if shutdown.has_changed().unwrap_or(true) {
                break;
            }
        }

        for delivery in self.take_pending() {
            self.submit(&mut in_flight, delivery);
        }
        let remaining = in_flight.len();
        while let Some(result) = in_flight.join_next().await {
            log_join_error(result);
        }
        info!(drained = remaining, "blob event dispatcher stopped");
    }

    fn submit(&self, in_flight: &mut JoinSet<()>, delivery: Delivery) {
        let permits = self.workers.clone();
        in_flight.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            deliver(delivery).await;
        });
    }
}

impl WriteObserver for Dispatcher {
    fn blob_created(&self, container: &str, name: &str, size: u64) {
        self.notify(container, name, size);
    }
}

/// Run one delivery on its own task so a panic is contained and logged.
async fn deliver(delivery: Delivery) {
    let Delivery {
        subscriber,
        message,
    } = delivery;
    let function = subscriber.name().to_string();
    let started = Instant::now();

    match tokio::spawn(subscriber.deliver(message)).await {
        Ok(Ok(())) => {
            debug!(%function, elapsed_ms = started.elapsed().as_millis() as u64, "queue message handled");
        }
        Ok(Err(e)) => {
            error!(%function, error = ?e, "function failed while handling queue message");
        }
        Err(e) => {
            error!(%function, error = %e, "function panicked while handling queue message");
        }
    }
}

fn reap(in_flight: &mut JoinSet<()>) {
    while let Some(result) = in_flight.try_join_next() {
        log_join_error(result);
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "delivery task failed");
    }
}
