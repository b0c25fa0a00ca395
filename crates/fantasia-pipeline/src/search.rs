//! Per-model nearest-neighbor search.
//!
//! For every embedded query protein and enabled model, retrieves the
//! `limit_per_entry` nearest annotation-bearing reference vectors within the
//! model's `distance_threshold` and turns them into annotated neighbor hits
//! for the aggregator.

use std::collections::BTreeMap;
use std::sync::Arc;

use fantasia_core::types::{ModelId, NeighborHit, ReferenceAnnotation};
use fantasia_core::RunConfig;
use fantasia_store::VectorStore;

use crate::error::PipelineResult;

/// A neighbor hit together with the GO annotations of the matched reference.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedHit {
    /// The neighbor match
    pub hit: NeighborHit,
    /// Annotations carried by the reference protein in this model space
    pub annotations: Vec<ReferenceAnnotation>,
}

/// Read-only searcher over the vector store.
///
/// Holds no per-run mutable state; safe to share across per-model search
/// tasks.
pub struct SimilaritySearcher {
    store: Arc<dyn VectorStore>,
    config: Arc<RunConfig>,
}

impl SimilaritySearcher {
    /// Create a searcher over `store` configured by `config`.
    pub fn new(store: Arc<dyn VectorStore>, config: Arc<RunConfig>) -> Self {
        Self { store, config }
    }

    /// Search one model's space for every accession in `accessions`.
    ///
    /// Returns hits grouped by query accession. Accessions with no persisted
    /// vector under this model (embedding failed there) are skipped; zero
    /// neighbors for an embedded accession yields an empty entry so the
    /// aggregator can tell "searched, nothing found" from "never searched".
    ///
    /// # Errors
    ///
    /// Store failures are fatal transport errors.
    pub fn search_model(
        &self,
        model_id: ModelId,
        accessions: &[String],
    ) -> PipelineResult<BTreeMap<String, Vec<AnnotatedHit>>> {
        let threshold = self
            .config
            .model_config(model_id)
            .map_or(f32::INFINITY, |m| m.distance_threshold);
        let metric = self.config.distance_metric();
        let tag = self.config.lookup_reference_tag.as_str();

        let mut results = BTreeMap::new();
        for accession in accessions {
            let Some(embedding) = self.store.get_vector(accession, model_id)? else {
                continue;
            };

            let neighbors = self.store.nearest_neighbors(
                tag,
                &embedding.vector,
                model_id,
                metric,
                self.config.limit_per_entry,
                threshold,
            )?;

            let hits: Vec<AnnotatedHit> = neighbors
                .into_iter()
                .map(|n| AnnotatedHit {
                    hit: NeighborHit {
                        query_accession: accession.clone(),
                        reference_accession: n.reference_accession,
                        model_id,
                        distance: n.distance,
                    },
                    annotations: n.annotations,
                })
                .collect();

            tracing::debug!(
                accession = %accession,
                model = %model_id,
                neighbors = hits.len(),
                "similarity search complete"
            );
            results.insert(accession.clone(), hits);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use fantasia_core::types::{DistanceMetric, EmbeddingVector};
    use fantasia_store::MemoryVectorStore;

    use super::*;

    fn setup() -> (Arc<MemoryVectorStore>, Arc<RunConfig>) {
        let store = Arc::new(MemoryVectorStore::new());
        let mut config = RunConfig::default_config();
        config.lookup_reference_tag = "GOA".into();
        config.embedding.distance_metric = DistanceMetric::Cosine;
        if let Some(model) = config.embedding.models.get_mut(ModelId::ProtT5.as_str()) {
            // Orthogonal vectors sit at exactly 1.0 under cosine; keep them
            // out of threshold tests.
            model.distance_threshold = 0.5;
        }
        (store, Arc::new(config))
    }

    fn reference(store: &MemoryVectorStore, accession: &str, axis: usize, go_term: &str) {
        let dim = ModelId::ProtT5.dimension();
        let mut v = vec![0.0f32; dim];
        v[axis] = 1.0;
        store
            .insert_reference(
                "GOA",
                &EmbeddingVector::new(accession, ModelId::ProtT5, v).unwrap(),
                &[ReferenceAnnotation {
                    reference_accession: accession.to_string(),
                    model_id: ModelId::ProtT5,
                    go_term: go_term.to_string(),
                    evidence_weight: 1.0,
                }],
            )
            .unwrap();
    }

    #[test]
    fn hits_stay_under_threshold() {
        let (store, config) = setup();
        reference(&store, "R_NEAR", 0, "GO:0001");
        reference(&store, "R_FAR", 1, "GO:0002");

        let mut query = vec![0.0f32; ModelId::ProtT5.dimension()];
        query[0] = 1.0;
        store
            .upsert_vector(&EmbeddingVector::new("Q1", ModelId::ProtT5, query).unwrap())
            .unwrap();

        let searcher = SimilaritySearcher::new(store, config);
        let results = searcher
            .search_model(ModelId::ProtT5, &["Q1".to_string()])
            .unwrap();
        let hits = &results["Q1"];
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hit.reference_accession, "R_NEAR");
        assert!(hits[0].hit.distance <= 0.5);
    }

    #[test]
    fn unembedded_accession_is_skipped_not_empty() {
        let (store, config) = setup();
        let searcher = SimilaritySearcher::new(store, config);
        let results = searcher
            .search_model(ModelId::ProtT5, &["Q_MISSING".to_string()])
            .unwrap();
        assert!(!results.contains_key("Q_MISSING"));
    }

    #[test]
    fn embedded_accession_with_no_neighbors_yields_empty_entry() {
        let (store, config) = setup();
        let mut query = vec![0.0f32; ModelId::ProtT5.dimension()];
        query[0] = 1.0;
        store
            .upsert_vector(&EmbeddingVector::new("Q1", ModelId::ProtT5, query).unwrap())
            .unwrap();

        let searcher = SimilaritySearcher::new(store, config);
        let results = searcher
            .search_model(ModelId::ProtT5, &["Q1".to_string()])
            .unwrap();
        assert!(results["Q1"].is_empty());
    }
}
