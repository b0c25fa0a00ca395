//! Durable named task queues with manual acknowledgment.
//!
//! One point-to-point queue per enabled model carries that model's work
//! packages. Delivery is at-least-once: a delivery dropped without
//! acknowledgment (worker crash, fatal store error) goes back to the front
//! of its queue and is redelivered. Consumers are safe against that because
//! the vector store's upsert path is idempotent.
//!
//! [`MemoryQueueBroker`] is the in-process implementation; a broker-backed
//! implementation substitutes behind [`TaskQueue`] without touching the
//! workers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use fantasia_core::types::WorkPackage;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Queue interface consumed by the partitioner (producer side) and the
/// worker pools (consumer side).
pub trait TaskQueue: Send + Sync {
    /// Declare a named queue. Idempotent.
    fn declare_queue(&self, name: &str) -> EmbeddingResult<()>;

    /// Enqueue a package.
    ///
    /// # Errors
    ///
    /// `EmbeddingError::Transport` if the queue was never declared or has
    /// been closed.
    fn publish(&self, queue: &str, package: WorkPackage) -> EmbeddingResult<()>;

    /// Open a consumer on a queue. Each package is delivered to exactly one
    /// consumer; deliveries require explicit [`PackageDelivery::ack`].
    fn consume(&self, queue: &str) -> EmbeddingResult<Box<dyn PackageConsumer>>;

    /// Mark a queue as complete: consumers drain what remains, then their
    /// `next()` returns `None`.
    fn close_queue(&self, name: &str) -> EmbeddingResult<()>;

    /// Drop all pending packages. Used at run end when `delete_queues` is
    /// set; otherwise queues are retained for diagnostics.
    fn purge_queue(&self, name: &str) -> EmbeddingResult<()>;

    /// Outstanding work: pending packages plus unacknowledged deliveries.
    fn depth(&self, name: &str) -> EmbeddingResult<usize>;
}

/// A lazy, restartable stream of deliveries from one queue.
#[async_trait]
pub trait PackageConsumer: Send {
    /// Next delivery, or `None` once the queue is closed and fully drained.
    async fn next(&mut self) -> Option<PackageDelivery>;
}

/// One in-flight package delivery.
///
/// Dropping a delivery without calling [`ack`](Self::ack) requeues the
/// package for redelivery — that is the at-least-once contract.
pub struct PackageDelivery {
    package: Option<WorkPackage>,
    state: Arc<QueueState>,
}

impl PackageDelivery {
    /// The delivered package.
    #[must_use]
    pub fn package(&self) -> &WorkPackage {
        self.package
            .as_ref()
            .expect("package taken only on ack or drop")
    }

    /// Acknowledge the delivery: the package is done and will not be
    /// redelivered. Call only after every record in it has been attempted.
    pub fn ack(mut self) {
        self.package = None;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }
}

impl Drop for PackageDelivery {
    fn drop(&mut self) {
        if let Some(package) = self.package.take() {
            tracing::warn!(
                package_id = package.package_id,
                model = %package.model_id,
                "delivery dropped without ack, requeueing"
            );
            self.state.pending.lock().push_front(package);
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.state.notify.notify_waiters();
        }
    }
}

#[derive(Default)]
struct QueueState {
    pending: Mutex<VecDeque<WorkPackage>>,
    notify: Notify,
    closed: AtomicBool,
    in_flight: AtomicUsize,
}

/// In-process [`TaskQueue`] implementation.
#[derive(Default)]
pub struct MemoryQueueBroker {
    queues: Mutex<HashMap<String, Arc<QueueState>>>,
}

impl MemoryQueueBroker {
    /// Create a broker with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, name: &str) -> EmbeddingResult<Arc<QueueState>> {
        self.queues
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EmbeddingError::Transport(format!("queue {name} not declared")))
    }
}

impl TaskQueue for MemoryQueueBroker {
    fn declare_queue(&self, name: &str) -> EmbeddingResult<()> {
        self.queues
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(QueueState::default()));
        tracing::debug!(queue = name, "queue declared");
        Ok(())
    }

    fn publish(&self, queue: &str, package: WorkPackage) -> EmbeddingResult<()> {
        let state = self.state(queue)?;
        if state.closed.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Transport(format!(
                "queue {queue} is closed"
            )));
        }
        state.pending.lock().push_back(package);
        state.notify.notify_waiters();
        Ok(())
    }

    fn consume(&self, queue: &str) -> EmbeddingResult<Box<dyn PackageConsumer>> {
        Ok(Box::new(MemoryConsumer {
            state: self.state(queue)?,
        }))
    }

    fn close_queue(&self, name: &str) -> EmbeddingResult<()> {
        let state = self.state(name)?;
        state.closed.store(true, Ordering::SeqCst);
        state.notify.notify_waiters();
        Ok(())
    }

    fn purge_queue(&self, name: &str) -> EmbeddingResult<()> {
        let state = self.state(name)?;
        let dropped = {
            let mut pending = state.pending.lock();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            tracing::info!(queue = name, dropped, "queue purged");
        }
        state.notify.notify_waiters();
        Ok(())
    }

    fn depth(&self, name: &str) -> EmbeddingResult<usize> {
        let state = self.state(name)?;
        let depth = state.pending.lock().len() + state.in_flight.load(Ordering::SeqCst);
        Ok(depth)
    }
}

struct MemoryConsumer {
    state: Arc<QueueState>,
}

#[async_trait]
impl PackageConsumer for MemoryConsumer {
    async fn next(&mut self) -> Option<PackageDelivery> {
        loop {
            if let Some(package) = self.state.pending.lock().pop_front() {
                self.state.in_flight.fetch_add(1, Ordering::SeqCst);
                return Some(PackageDelivery {
                    package: Some(package),
                    state: self.state.clone(),
                });
            }

            // Drained only counts once nothing can be requeued by a dropped
            // delivery.
            if self.state.closed.load(Ordering::SeqCst)
                && self.state.in_flight.load(Ordering::SeqCst) == 0
            {
                return None;
            }

            // Poll fallback guards against wakeups lost between the pending
            // check and the notified() registration.
            tokio::select! {
                _ = self.state.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }
    }
}
