//! In-memory vector store.
//!
//! Backs unit and integration tests and `--dry-run` style invocations where
//! persistence beyond the run is not wanted. Semantics are identical to the
//! RocksDB backend; [`rank_neighbors`] is shared so ordering cannot drift.
//!
//! [`rank_neighbors`]: crate::store::rank_neighbors

use std::collections::BTreeMap;

use parking_lot::RwLock;

use fantasia_core::types::{DistanceMetric, EmbeddingVector, ModelId, ReferenceAnnotation};

use crate::error::StoreResult;
use crate::store::{rank_neighbors, Neighbor, UpsertOutcome, VectorStore};

type QueryKey = (ModelId, String);
type ReferenceKey = (String, ModelId, String);

/// In-memory [`VectorStore`] using `BTreeMap`s behind `RwLock`s.
///
/// `BTreeMap` keeps scan order stable, which makes neighbor ordering (and
/// therefore pipeline output) reproducible without extra sorting work.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    query_vectors: RwLock<BTreeMap<QueryKey, EmbeddingVector>>,
    references: RwLock<BTreeMap<ReferenceKey, (EmbeddingVector, Vec<ReferenceAnnotation>)>>,
}

impl MemoryVectorStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for MemoryVectorStore {
    fn upsert_vector(&self, vector: &EmbeddingVector) -> StoreResult<UpsertOutcome> {
        let key = (vector.model_id, vector.accession.clone());
        let mut guard = self.query_vectors.write();
        let outcome = match guard.get(&key) {
            Some(existing) if existing.same_content(vector) => {
                tracing::debug!(
                    accession = %vector.accession,
                    model = %vector.model_id,
                    "embedding already present, skipping"
                );
                return Ok(UpsertOutcome::Unchanged);
            }
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        };
        guard.insert(key, vector.clone());
        Ok(outcome)
    }

    fn get_vector(
        &self,
        accession: &str,
        model_id: ModelId,
    ) -> StoreResult<Option<EmbeddingVector>> {
        Ok(self
            .query_vectors
            .read()
            .get(&(model_id, accession.to_string()))
            .cloned())
    }

    fn insert_reference(
        &self,
        tag: &str,
        vector: &EmbeddingVector,
        annotations: &[ReferenceAnnotation],
    ) -> StoreResult<()> {
        self.references.write().insert(
            (tag.to_string(), vector.model_id, vector.accession.clone()),
            (vector.clone(), annotations.to_vec()),
        );
        Ok(())
    }

    fn nearest_neighbors(
        &self,
        tag: &str,
        query: &[f32],
        model_id: ModelId,
        metric: DistanceMetric,
        limit: usize,
        max_distance: f32,
    ) -> StoreResult<Vec<Neighbor>> {
        let guard = self.references.read();
        let candidates = guard
            .iter()
            .filter(|((t, m, _), _)| t == tag && *m == model_id)
            .filter_map(|((_, _, accession), (vector, annotations))| {
                let distance = metric.distance(query, &vector.vector);
                (distance <= max_distance).then(|| Neighbor {
                    reference_accession: accession.clone(),
                    distance,
                    annotations: annotations.clone(),
                })
            })
            .collect();
        Ok(rank_neighbors(candidates, limit))
    }

    fn vector_count(&self, model_id: ModelId) -> StoreResult<usize> {
        Ok(self
            .query_vectors
            .read()
            .keys()
            .filter(|(m, _)| *m == model_id)
            .count())
    }

    fn reference_count(&self, tag: &str, model_id: ModelId) -> StoreResult<usize> {
        Ok(self
            .references
            .read()
            .keys()
            .filter(|(t, m, _)| t == tag && *m == model_id)
            .count())
    }
}
