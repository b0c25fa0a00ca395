//! Per-model embedding worker pool.
//!
//! One pool per enabled model consumes that model's queue with bounded
//! concurrency (`max_workers` in-flight packages), embeds in `batch_size`
//! chunks, persists successful vectors, and acknowledges a package only after
//! every record in it has been attempted.
//!
//! # Failure semantics
//!
//! - Per-sequence embedding failure: recorded with accession context,
//!   absorbed, the package continues.
//! - Store write failure: fatal. The delivery is dropped unacknowledged
//!   (requeued by the broker) and the pool surfaces the error.
//! - A package addressed to another model: fatal routing bug.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use fantasia_core::types::{EmbeddingFailure, EmbeddingVector, ModelId, WorkPackage};
use fantasia_store::VectorStore;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::provider::SequenceEmbedder;
use crate::queue::PackageConsumer;

/// What one pool accomplished over a run.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Accessions successfully embedded and persisted
    pub embedded: BTreeSet<String>,
    /// Per-sequence failures, with reasons
    pub failures: Vec<EmbeddingFailure>,
    /// Packages fully processed and acknowledged
    pub packages_processed: u64,
}

/// Bounded-concurrency consumer for one model's queue.
pub struct ModelWorkerPool {
    model_id: ModelId,
    embedder: Arc<dyn SequenceEmbedder>,
    store: Arc<dyn VectorStore>,
    max_workers: usize,
    batch_size: usize,
}

impl ModelWorkerPool {
    /// Create a pool for `model_id`.
    ///
    /// `max_workers` bounds concurrent in-flight packages; `batch_size` is
    /// the number of sequences per embedder call (throughput knob, not a
    /// correctness one).
    pub fn new(
        model_id: ModelId,
        embedder: Arc<dyn SequenceEmbedder>,
        store: Arc<dyn VectorStore>,
        max_workers: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            model_id,
            embedder,
            store,
            max_workers: max_workers.max(1),
            batch_size: batch_size.max(1),
        }
    }

    /// Consume deliveries until the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// The first fatal error ([`EmbeddingError::Store`],
    /// [`EmbeddingError::MixedPackage`]) observed by any worker; remaining
    /// deliveries stay on the queue for diagnostics or recovery.
    pub async fn run(&self, mut consumer: Box<dyn PackageConsumer>) -> EmbeddingResult<PoolReport> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let report = Arc::new(Mutex::new(PoolReport::default()));
        let fatal: Arc<Mutex<Option<EmbeddingError>>> = Arc::new(Mutex::new(None));
        let mut tasks = JoinSet::new();

        while let Some(delivery) = consumer.next().await {
            if fatal.lock().is_some() {
                // Delivery drops unacked and goes back to the queue.
                drop(delivery);
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EmbeddingError::Transport(format!("worker semaphore closed: {e}")))?;

            let model_id = self.model_id;
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let batch_size = self.batch_size;
            let report = Arc::clone(&report);
            let fatal = Arc::clone(&fatal);

            tasks.spawn(async move {
                let _permit = permit;
                match process_package(model_id, &*embedder, &*store, batch_size, delivery.package())
                    .await
                {
                    Ok((embedded, failures)) => {
                        let mut guard = report.lock();
                        guard.embedded.extend(embedded);
                        guard.failures.extend(failures);
                        guard.packages_processed += 1;
                        drop(guard);
                        delivery.ack();
                    }
                    Err(e) => {
                        tracing::error!(
                            model = %model_id,
                            package_id = delivery.package().package_id,
                            error = %e,
                            "fatal error processing package"
                        );
                        fatal.lock().get_or_insert(e);
                        // No ack: the broker requeues the package.
                        drop(delivery);
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}

        if let Some(e) = fatal.lock().take() {
            return Err(e);
        }
        let report = Arc::try_unwrap(report)
            .map_err(|_| EmbeddingError::Transport("worker task leaked report handle".into()))?
            .into_inner();
        tracing::info!(
            model = %self.model_id,
            packages = report.packages_processed,
            embedded = report.embedded.len(),
            failed = report.failures.len(),
            "worker pool drained queue"
        );
        Ok(report)
    }
}

/// Embed and persist every record of one package.
///
/// Returns the accessions persisted and the per-sequence failures. All
/// records are attempted even when some fail; only transport-class errors
/// abort the package.
async fn process_package(
    model_id: ModelId,
    embedder: &dyn SequenceEmbedder,
    store: &dyn VectorStore,
    batch_size: usize,
    package: &WorkPackage,
) -> EmbeddingResult<(Vec<String>, Vec<EmbeddingFailure>)> {
    if package.model_id != model_id {
        return Err(EmbeddingError::MixedPackage {
            package_id: package.package_id,
            expected: package.model_id,
            found: model_id,
        });
    }

    let mut embedded = Vec::new();
    let mut failures = Vec::new();

    for chunk in package.records.chunks(batch_size) {
        let sequences: Vec<String> = chunk.iter().map(|r| r.sequence.clone()).collect();
        let results = embedder.embed_batch(&sequences).await;

        for (record, result) in chunk.iter().zip(results) {
            match result {
                Ok(vector) => match EmbeddingVector::new(&record.accession, model_id, vector) {
                    Ok(embedding) => {
                        store.upsert_vector(&embedding)?;
                        embedded.push(record.accession.clone());
                    }
                    Err(e) => {
                        // Dimension contract violated by the model output;
                        // treated like any other per-sequence model failure.
                        failures.push(EmbeddingFailure {
                            accession: record.accession.clone(),
                            model_id,
                            reason: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    let reason = match e {
                        EmbeddingError::SequenceFailed { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    tracing::warn!(
                        accession = %record.accession,
                        model = %model_id,
                        reason = %reason,
                        "embedding failed for sequence"
                    );
                    failures.push(EmbeddingFailure {
                        accession: record.accession.clone(),
                        model_id,
                        reason,
                    });
                }
            }
        }
    }

    Ok((embedded, failures))
}

#[cfg(test)]
mod tests {
    use fantasia_core::types::SequenceRecord;
    use fantasia_store::MemoryVectorStore;

    use crate::hash::HashEmbedder;
    use crate::queue::{MemoryQueueBroker, TaskQueue};

    use super::*;

    fn records(n: usize) -> Vec<SequenceRecord> {
        (0..n)
            .map(|i| SequenceRecord::new(format!("Q{i}"), &format!("MKTAYIAK{}", "G".repeat(i))).unwrap())
            .collect()
    }

    async fn run_pool(
        embedder: HashEmbedder,
        packages: Vec<WorkPackage>,
    ) -> (PoolReport, Arc<MemoryVectorStore>) {
        let broker = MemoryQueueBroker::new();
        let queue = ModelId::ProtT5.queue_name();
        broker.declare_queue(&queue).unwrap();
        for package in packages {
            broker.publish(&queue, package).unwrap();
        }
        broker.close_queue(&queue).unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        let pool = ModelWorkerPool::new(
            ModelId::ProtT5,
            Arc::new(embedder),
            store.clone(),
            2,
            4,
        );
        let report = pool.run(broker.consume(&queue).unwrap()).await.unwrap();
        (report, store)
    }

    #[tokio::test]
    async fn pool_embeds_and_persists_every_record() {
        let package = WorkPackage::new(0, ModelId::ProtT5, records(10));
        let (report, store) = run_pool(HashEmbedder::new(ModelId::ProtT5), vec![package]).await;
        assert_eq!(report.embedded.len(), 10);
        assert!(report.failures.is_empty());
        assert_eq!(report.packages_processed, 1);
        assert_eq!(store.vector_count(ModelId::ProtT5).unwrap(), 10);
    }

    #[tokio::test]
    async fn per_sequence_failure_does_not_abort_package() {
        let mut recs = records(3);
        recs.push(SequenceRecord::new("Q_BAD", "MWWWWK").unwrap());
        let package = WorkPackage::new(0, ModelId::ProtT5, recs);
        let (report, store) =
            run_pool(HashEmbedder::failing_on(ModelId::ProtT5, "WWWW"), vec![package]).await;
        assert_eq!(report.embedded.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].accession, "Q_BAD");
        assert_eq!(report.packages_processed, 1);
        assert_eq!(store.vector_count(ModelId::ProtT5).unwrap(), 3);
    }

    #[tokio::test]
    async fn mixed_package_is_fatal() {
        let broker = MemoryQueueBroker::new();
        let queue = ModelId::ProtT5.queue_name();
        broker.declare_queue(&queue).unwrap();
        broker
            .publish(&queue, WorkPackage::new(0, ModelId::Esm2, records(1)))
            .unwrap();
        broker.close_queue(&queue).unwrap();

        let pool = ModelWorkerPool::new(
            ModelId::ProtT5,
            Arc::new(HashEmbedder::new(ModelId::ProtT5)),
            Arc::new(MemoryVectorStore::new()),
            1,
            4,
        );
        let err = pool.run(broker.consume(&queue).unwrap()).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::MixedPackage { .. }));
    }

    #[tokio::test]
    async fn many_packages_drain_with_bounded_concurrency() {
        let packages: Vec<WorkPackage> = (0..8)
            .map(|i| {
                WorkPackage::new(
                    i,
                    ModelId::ProtT5,
                    vec![SequenceRecord::new(format!("P{i}"), "MKTAYIAK").unwrap()],
                )
            })
            .collect();
        let (report, store) = run_pool(HashEmbedder::new(ModelId::ProtT5), packages).await;
        assert_eq!(report.packages_processed, 8);
        assert_eq!(store.vector_count(ModelId::ProtT5).unwrap(), 8);
    }
}
