//! End-to-end run coordinator.
//!
//! Drives the stages in order — load, redundancy filter, partition, embed,
//! search, aggregate, write — owning the queue lifecycle and the run
//! summary. Components are injected: the coordinator composes, it does not
//! construct embedders, stores, or clustering tools.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use fantasia_core::config::JoinPolicy;
use fantasia_core::types::{AnnotationCall, ExclusionReason, ModelId, RunSummary, SequenceRecord};
use fantasia_core::{CoreError, RunConfig};
use fantasia_embeddings::{ModelWorkerPool, PoolReport, SequenceEmbedder, TaskQueue};
use fantasia_store::VectorStore;

use crate::aggregate::{Aggregator, SearchJoin};
use crate::error::{PipelineError, PipelineResult};
use crate::fasta::load_fasta_file;
use crate::partition::partition_for_model;
use crate::redundancy::RedundancyClusterer;
use crate::search::{AnnotatedHit, SimilaritySearcher};
use crate::writer::{ResultWriter, WrittenFiles};

/// What one complete run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Ranked annotation calls, ordered by accession, then score, then term
    pub calls: Vec<AnnotationCall>,
    /// Full accounting for the run
    pub summary: RunSummary,
    /// Output files, when writing was requested
    pub files: Option<WrittenFiles>,
}

/// Composes the pipeline stages over injected components.
pub struct PipelineCoordinator {
    config: Arc<RunConfig>,
    store: Arc<dyn VectorStore>,
    broker: Arc<dyn TaskQueue>,
    embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>>,
    clusterer: Option<Arc<dyn RedundancyClusterer>>,
}

impl PipelineCoordinator {
    /// Create a coordinator over the given components.
    ///
    /// `embedders` must cover every enabled model; that is checked at run
    /// start, not here. `clusterer` may be `None` when `redundancy_filter`
    /// is 0.
    pub fn new(
        config: Arc<RunConfig>,
        store: Arc<dyn VectorStore>,
        broker: Arc<dyn TaskQueue>,
        embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>>,
        clusterer: Option<Arc<dyn RedundancyClusterer>>,
    ) -> Self {
        Self {
            config,
            store,
            broker,
            embedders,
            clusterer,
        }
    }

    /// Execute the full pipeline and write results to `output_dir`.
    ///
    /// # Errors
    ///
    /// The first fatal stage error; per-sequence embedding failures and
    /// unannotated proteins are absorbed into the summary instead.
    pub async fn run(&self) -> PipelineResult<RunOutcome> {
        let outcome = self.run_inner(true).await?;
        Ok(outcome)
    }

    /// Execute the full pipeline without writing output files. Tests and
    /// embedded callers inspect [`RunOutcome`] directly.
    pub async fn run_without_writing(&self) -> PipelineResult<RunOutcome> {
        self.run_inner(false).await
    }

    async fn run_inner(&self, write_output: bool) -> PipelineResult<RunOutcome> {
        let mut summary = RunSummary::default();
        let enabled = self.config.enabled_models();
        for model_id in &enabled {
            if !self.embedders.contains_key(model_id) {
                return Err(CoreError::ConfigError(format!(
                    "no embedder registered for enabled model {model_id}"
                ))
                .into());
            }
        }

        // Load
        let loaded = load_fasta_file(
            &self.config.input,
            self.config.duplicate_policy,
            self.config.length_filter,
        )?;
        summary.loaded = loaded.records.len() + loaded.length_filtered;
        summary.length_filtered = loaded.length_filtered;
        summary.duplicates_replaced = loaded.duplicates_replaced;

        // Redundancy filter
        let records = self.apply_redundancy_filter(loaded.records, &mut summary).await?;
        if records.is_empty() {
            tracing::warn!("no sequences left after filtering, nothing to do");
            return self.finish(Vec::new(), summary, write_output);
        }

        // Partition + embed
        let reports = self.embed_all(&enabled, &records, &mut summary).await?;

        let embedded_union: BTreeSet<String> = reports
            .values()
            .flat_map(|r| r.embedded.iter().cloned())
            .collect();
        summary.embedded = embedded_union.len();
        if embedded_union.is_empty() {
            return Err(PipelineError::TotalEmbeddingFailure {
                total: records.len(),
            });
        }
        for record in &records {
            if !embedded_union.contains(&record.accession) {
                summary
                    .excluded
                    .insert(record.accession.clone(), ExclusionReason::AllModelsFailed);
            }
        }

        // Search + join
        let per_accession = self.search_all(&enabled, &embedded_union, &mut summary).await?;

        // Aggregate
        let aggregator = Aggregator::new(self.config.aggregation.clone());
        let mut calls = Vec::new();
        for accession in &embedded_union {
            let hits = per_accession.get(accession).map_or(&[][..], Vec::as_slice);
            let accession_calls = aggregator.aggregate(accession, hits);
            if accession_calls.is_empty() {
                summary
                    .excluded
                    .insert(accession.clone(), ExclusionReason::Unannotated);
            } else {
                summary.annotated += 1;
                calls.extend(accession_calls);
            }
        }

        self.finish(calls, summary, write_output)
    }

    fn finish(
        &self,
        calls: Vec<AnnotationCall>,
        summary: RunSummary,
        write_output: bool,
    ) -> PipelineResult<RunOutcome> {
        let files = if write_output {
            let writer = ResultWriter::new(&self.config.output_dir, &self.config.prefix);
            Some(writer.write(&calls, &summary)?)
        } else {
            None
        };
        tracing::info!(
            loaded = summary.loaded,
            embedded = summary.embedded,
            annotated = summary.annotated,
            excluded = summary.excluded.len(),
            degraded = summary.degraded,
            "pipeline run complete"
        );
        Ok(RunOutcome {
            calls,
            summary,
            files,
        })
    }

    async fn apply_redundancy_filter(
        &self,
        records: Vec<SequenceRecord>,
        summary: &mut RunSummary,
    ) -> PipelineResult<Vec<SequenceRecord>> {
        if self.config.redundancy_filter <= 0.0 {
            return Ok(records);
        }
        let Some(clusterer) = &self.clusterer else {
            return Err(CoreError::ConfigError(
                "redundancy_filter is enabled but no clustering tool was provided".into(),
            )
            .into());
        };
        let outcome = clusterer
            .cluster(&records, self.config.redundancy_filter)
            .await?;
        summary.redundancy_removed = outcome.removed.len();
        summary.redundancy_representatives = outcome.removed;
        tracing::info!(
            threshold = self.config.redundancy_filter,
            kept = outcome.representatives.len(),
            removed = summary.redundancy_removed,
            "redundancy filtering complete"
        );
        Ok(outcome.representatives)
    }

    /// Partition `records` per model, publish to the per-model queues, and
    /// drain them with one worker pool per model, all pools concurrent.
    async fn embed_all(
        &self,
        enabled: &[ModelId],
        records: &[SequenceRecord],
        summary: &mut RunSummary,
    ) -> PipelineResult<BTreeMap<ModelId, PoolReport>> {
        let mut pools = JoinSet::new();
        for &model_id in enabled {
            let queue = model_id.queue_name();
            self.broker.declare_queue(&queue)?;
            let packages = partition_for_model(
                records,
                model_id,
                self.config.sequence_queue_package,
            );
            let published = packages.len();
            for package in packages {
                self.broker.publish(&queue, package)?;
            }
            self.broker.close_queue(&queue)?;
            tracing::info!(model = %model_id, packages = published, "work published");

            let consumer = self.broker.consume(&queue)?;
            let pool = ModelWorkerPool::new(
                model_id,
                Arc::clone(&self.embedders[&model_id]),
                Arc::clone(&self.store),
                self.config.max_workers,
                self.config
                    .model_config(model_id)
                    .map_or(32, |m| m.batch_size),
            );
            pools.spawn(async move { (model_id, pool.run(consumer).await) });
        }

        let stalled = Arc::new(AtomicBool::new(false));
        let monitor = self.spawn_monitor(enabled, Arc::clone(&stalled));

        let mut reports = BTreeMap::new();
        let mut first_fatal: Option<PipelineError> = None;
        while let Some(joined) = pools.join_next().await {
            match joined {
                Ok((model_id, Ok(report))) => {
                    for failure in &report.failures {
                        summary.record_embedding_failure(failure.clone());
                    }
                    reports.insert(model_id, report);
                }
                Ok((model_id, Err(e))) => {
                    tracing::error!(model = %model_id, error = %e, "worker pool failed");
                    first_fatal.get_or_insert(e.into());
                }
                Err(e) => {
                    first_fatal.get_or_insert(PipelineError::Embedding(
                        fantasia_embeddings::EmbeddingError::Transport(format!(
                            "worker pool panicked: {e}"
                        )),
                    ));
                }
            }
        }
        monitor.abort();
        summary.degraded = stalled.load(Ordering::SeqCst);

        if let Some(e) = first_fatal {
            return Err(e);
        }

        if self.config.delete_queues {
            for &model_id in enabled {
                self.broker.purge_queue(&model_id.queue_name())?;
            }
        }
        Ok(reports)
    }

    /// Periodic liveness poll over the model queues. Nonzero depths that
    /// stay identical across two consecutive intervals mark the run degraded.
    fn spawn_monitor(
        &self,
        enabled: &[ModelId],
        stalled: Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<()> {
        let broker = Arc::clone(&self.broker);
        let queues: Vec<String> = enabled.iter().map(|m| m.queue_name()).collect();
        let interval = Duration::from_secs(self.config.monitor_interval.max(1));
        tokio::spawn(async move {
            let mut detector = StallDetector::default();
            loop {
                tokio::time::sleep(interval).await;
                let depths: Vec<usize> = queues
                    .iter()
                    .map(|q| broker.depth(q).unwrap_or(0))
                    .collect();
                let outstanding: usize = depths.iter().sum();
                tracing::info!(?depths, outstanding, "queue liveness poll");
                if detector.observe(&depths) {
                    tracing::warn!(?depths, "no queue progress across two intervals");
                    stalled.store(true, Ordering::SeqCst);
                }
            }
        })
    }

    /// Search every model's space, then release the cross-model join.
    ///
    /// Under [`JoinPolicy::WaitAll`] every enabled model's search must
    /// finish. Under [`JoinPolicy::Timeout`] a model that exceeds the
    /// timeout is released with empty results, the run is marked degraded,
    /// and aggregation proceeds on the models that did report.
    async fn search_all(
        &self,
        enabled: &[ModelId],
        embedded: &BTreeSet<String>,
        summary: &mut RunSummary,
    ) -> PipelineResult<BTreeMap<String, Vec<AnnotatedHit>>> {
        let accessions: Vec<String> = embedded.iter().cloned().collect();
        let searcher = Arc::new(SimilaritySearcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
        ));

        let mut handles = Vec::new();
        for &model_id in enabled {
            let searcher = Arc::clone(&searcher);
            let accessions = accessions.clone();
            handles.push((
                model_id,
                tokio::task::spawn_blocking(move || searcher.search_model(model_id, &accessions)),
            ));
        }

        let mut join = SearchJoin::new(enabled);
        for (model_id, handle) in handles {
            let result = match self.config.aggregation.join_policy {
                JoinPolicy::WaitAll => handle.await,
                JoinPolicy::Timeout { timeout_ms } => {
                    match tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            tracing::warn!(
                                model = %model_id,
                                timeout_ms,
                                "search timed out, releasing join without this model"
                            );
                            summary.degraded = true;
                            join.complete_model(model_id, BTreeMap::new());
                            continue;
                        }
                    }
                }
            };
            let results = result
                .map_err(|e| {
                    PipelineError::Store(fantasia_store::StoreError::Unavailable(format!(
                        "search task panicked: {e}"
                    )))
                })??;
            join.complete_model(model_id, results);
        }

        debug_assert!(join.is_complete());
        Ok(join.into_per_accession())
    }
}

/// Tracks queue-depth observations for the liveness monitor.
///
/// A stall is a poll whose nonzero depths match the previous poll exactly.
/// Two consecutive stalls degrade the run; any change in depths resets the
/// count, so a slow but moving queue never trips it.
#[derive(Debug, Default)]
struct StallDetector {
    previous: Option<Vec<usize>>,
    consecutive_stalls: u32,
}

impl StallDetector {
    /// Record one poll; returns true once two consecutive stalls are seen.
    fn observe(&mut self, depths: &[usize]) -> bool {
        let outstanding: usize = depths.iter().sum();
        if outstanding > 0 && self.previous.as_deref() == Some(depths) {
            self.consecutive_stalls += 1;
        } else {
            self.consecutive_stalls = 0;
        }
        self.previous = Some(depths.to_vec());
        self.consecutive_stalls >= 2
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use fantasia_core::types::{DistanceMetric, EmbeddingVector, ReferenceAnnotation};
    use fantasia_embeddings::{HashEmbedder, MemoryQueueBroker};
    use fantasia_store::MemoryVectorStore;

    use super::*;

    fn write_fasta(entries: &[(&str, &str)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (accession, sequence) in entries {
            writeln!(file, ">{accession}\n{sequence}").unwrap();
        }
        file
    }

    fn coordinator_for(
        input: &std::path::Path,
        store: Arc<MemoryVectorStore>,
    ) -> PipelineCoordinator {
        let mut config = RunConfig::default_config();
        config.input = input.to_path_buf();
        config.embedding.distance_metric = DistanceMetric::Cosine;
        let config = Arc::new(config);

        let mut embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>> = BTreeMap::new();
        embedders.insert(
            ModelId::ProtT5,
            Arc::new(HashEmbedder::new(ModelId::ProtT5)),
        );
        PipelineCoordinator::new(
            config,
            store,
            Arc::new(MemoryQueueBroker::new()),
            embedders,
            None,
        )
    }

    /// Seed a reference whose vector equals the hash embedding of `sequence`,
    /// guaranteeing a zero-distance neighbor for that query.
    async fn seed_matching_reference(
        store: &MemoryVectorStore,
        accession: &str,
        sequence: &str,
        go_term: &str,
    ) {
        let embedder = HashEmbedder::new(ModelId::ProtT5);
        let vector = embedder
            .embed_batch(&[sequence.to_string()])
            .await
            .pop()
            .unwrap()
            .unwrap();
        store
            .insert_reference(
                "GOA",
                &EmbeddingVector::new(accession, ModelId::ProtT5, vector).unwrap(),
                &[ReferenceAnnotation {
                    reference_accession: accession.to_string(),
                    model_id: ModelId::ProtT5,
                    go_term: go_term.to_string(),
                    evidence_weight: 1.0,
                }],
            )
            .unwrap();
    }

    #[tokio::test]
    async fn annotates_query_matching_a_reference() {
        let store = Arc::new(MemoryVectorStore::new());
        seed_matching_reference(&store, "R1", "MKTAYIAKQR", "GO:0008270").await;

        let input = write_fasta(&[("Q1", "MKTAYIAKQR")]);
        let coordinator = coordinator_for(input.path(), store);
        let outcome = coordinator.run_without_writing().await.unwrap();

        assert_eq!(outcome.summary.loaded, 1);
        assert_eq!(outcome.summary.embedded, 1);
        assert_eq!(outcome.summary.annotated, 1);
        assert_eq!(outcome.calls.len(), 1);
        assert_eq!(outcome.calls[0].go_term, "GO:0008270");
        assert_eq!(outcome.calls[0].query_accession, "Q1");
    }

    #[tokio::test]
    async fn unmatched_query_is_excluded_as_unannotated() {
        let store = Arc::new(MemoryVectorStore::new());
        let input = write_fasta(&[("Q_LONELY", "MKTAYIAKQR")]);
        let coordinator = coordinator_for(input.path(), store);
        let outcome = coordinator.run_without_writing().await.unwrap();

        assert!(outcome.calls.is_empty());
        assert_eq!(
            outcome.summary.excluded["Q_LONELY"],
            ExclusionReason::Unannotated
        );
        assert_eq!(outcome.summary.annotated, 0);
    }

    #[tokio::test]
    async fn total_embedding_failure_is_fatal() {
        let store = Arc::new(MemoryVectorStore::new());
        let input = write_fasta(&[("Q1", "MWWWWK")]);

        let mut config = RunConfig::default_config();
        config.input = input.path().to_path_buf();
        let mut embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>> = BTreeMap::new();
        embedders.insert(
            ModelId::ProtT5,
            Arc::new(HashEmbedder::failing_on(ModelId::ProtT5, "WWWW")),
        );
        let coordinator = PipelineCoordinator::new(
            Arc::new(config),
            store,
            Arc::new(MemoryQueueBroker::new()),
            embedders,
            None,
        );

        let err = coordinator.run_without_writing().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::TotalEmbeddingFailure { total: 1 }
        ));
    }

    #[tokio::test]
    async fn partial_embedding_failure_degrades_gracefully() {
        let store = Arc::new(MemoryVectorStore::new());
        seed_matching_reference(&store, "R1", "MKTAYIAKQR", "GO:0001").await;

        let input = write_fasta(&[("Q_OK", "MKTAYIAKQR"), ("Q_BAD", "MWWWWK")]);
        let mut config = RunConfig::default_config();
        config.input = input.path().to_path_buf();
        let mut embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>> = BTreeMap::new();
        embedders.insert(
            ModelId::ProtT5,
            Arc::new(HashEmbedder::failing_on(ModelId::ProtT5, "WWWW")),
        );
        let coordinator = PipelineCoordinator::new(
            Arc::new(config),
            store,
            Arc::new(MemoryQueueBroker::new()),
            embedders,
            None,
        );

        let outcome = coordinator.run_without_writing().await.unwrap();
        assert_eq!(outcome.summary.embedded, 1);
        assert_eq!(outcome.summary.embedding_failures.len(), 1);
        assert_eq!(
            outcome.summary.excluded["Q_BAD"],
            ExclusionReason::AllModelsFailed
        );
        assert_eq!(outcome.calls.len(), 1);
        assert_eq!(outcome.calls[0].query_accession, "Q_OK");
    }

    #[tokio::test]
    async fn run_writes_output_files() {
        let store = Arc::new(MemoryVectorStore::new());
        seed_matching_reference(&store, "R1", "MKTAYIAKQR", "GO:0001").await;

        let out_dir = tempfile::tempdir().unwrap();
        let input = write_fasta(&[("Q1", "MKTAYIAKQR")]);
        let mut config = RunConfig::default_config();
        config.input = input.path().to_path_buf();
        config.output_dir = out_dir.path().to_path_buf();
        let mut embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>> = BTreeMap::new();
        embedders.insert(
            ModelId::ProtT5,
            Arc::new(HashEmbedder::new(ModelId::ProtT5)),
        );
        let coordinator = PipelineCoordinator::new(
            Arc::new(config),
            store,
            Arc::new(MemoryQueueBroker::new()),
            embedders,
            None,
        );

        let outcome = coordinator.run().await.unwrap();
        let files = outcome.files.unwrap();
        assert!(files.annotations_csv.exists());
        assert!(files.summary_json.exists());
    }

    #[test]
    fn one_unchanged_interval_does_not_degrade() {
        let mut detector = StallDetector::default();
        assert!(!detector.observe(&[3, 1]));
        assert!(!detector.observe(&[3, 1]));
        assert!(detector.observe(&[3, 1]));
    }

    #[test]
    fn progress_resets_the_stall_count() {
        let mut detector = StallDetector::default();
        assert!(!detector.observe(&[4]));
        assert!(!detector.observe(&[4]));
        assert!(!detector.observe(&[3]));
        assert!(!detector.observe(&[3]));
        assert!(detector.observe(&[3]));
    }

    #[test]
    fn drained_queues_never_count_as_stalled() {
        let mut detector = StallDetector::default();
        assert!(!detector.observe(&[0, 0]));
        assert!(!detector.observe(&[0, 0]));
        assert!(!detector.observe(&[0, 0]));
    }
}
