//! The [`VectorStore`] trait: the storage contract consumed by embedding
//! workers (write path) and the similarity search (read path).

use fantasia_core::types::{DistanceMetric, EmbeddingVector, ModelId, ReferenceAnnotation};

use crate::error::StoreResult;

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No vector existed under this key; it was written.
    Inserted,
    /// An identical vector already existed; nothing was written.
    Unchanged,
    /// A different vector existed; it was overwritten (last write wins).
    Replaced,
}

/// One nearest-neighbor result from the reference set, carrying the
/// annotations attached to the matched reference protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Matched reference protein
    pub reference_accession: String,
    /// Distance to the query under the requested metric
    pub distance: f32,
    /// GO annotations of the reference protein in this model space
    pub annotations: Vec<ReferenceAnnotation>,
}

/// Storage abstraction for embedding vectors and reference annotations.
///
/// # Implementors
///
/// - [`MemoryVectorStore`]: in-memory, for tests and dry runs
/// - [`RocksDbVectorStore`]: persistent production backend
///
/// # Thread Safety
///
/// Implementors must be `Send + Sync`. Concurrent upserts for distinct
/// `(accession, model_id)` keys are safe; concurrent upserts for the same key
/// resolve via last-write-wins on differing content and are no-ops on
/// identical content.
///
/// [`MemoryVectorStore`]: crate::MemoryVectorStore
/// [`RocksDbVectorStore`]: crate::RocksDbVectorStore
pub trait VectorStore: Send + Sync {
    /// Idempotently persist a query embedding, keyed by
    /// `(accession, model_id)`.
    ///
    /// # Errors
    ///
    /// - `StoreError::WriteFailed` if the backend write fails
    /// - `StoreError::Serialization` if the vector cannot be encoded
    fn upsert_vector(&self, vector: &EmbeddingVector) -> StoreResult<UpsertOutcome>;

    /// Fetch a previously persisted query embedding.
    ///
    /// Returns `Ok(None)` if no vector exists under the key.
    fn get_vector(&self, accession: &str, model_id: ModelId)
        -> StoreResult<Option<EmbeddingVector>>;

    /// Register a reference embedding with its annotations under a reference
    /// tag. Used by `initialize` to provision the lookup set; read-only
    /// afterwards.
    fn insert_reference(
        &self,
        tag: &str,
        vector: &EmbeddingVector,
        annotations: &[ReferenceAnnotation],
    ) -> StoreResult<()>;

    /// The `limit` nearest annotation-bearing reference vectors to `query`
    /// in `model_id`'s space, under `metric`, excluding neighbors farther
    /// than `max_distance`. Ordered by ascending distance, ties broken by
    /// reference accession for determinism.
    fn nearest_neighbors(
        &self,
        tag: &str,
        query: &[f32],
        model_id: ModelId,
        metric: DistanceMetric,
        limit: usize,
        max_distance: f32,
    ) -> StoreResult<Vec<Neighbor>>;

    /// Number of query vectors persisted for `model_id`.
    fn vector_count(&self, model_id: ModelId) -> StoreResult<usize>;

    /// Number of reference vectors registered under `tag` for `model_id`.
    fn reference_count(&self, tag: &str, model_id: ModelId) -> StoreResult<usize>;
}

/// Sort and truncate scanned candidates into the final neighbor list.
///
/// Shared by both backends so ordering semantics cannot drift between them:
/// ascending distance, then reference accession.
pub(crate) fn rank_neighbors(mut candidates: Vec<Neighbor>, limit: usize) -> Vec<Neighbor> {
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.reference_accession.cmp(&b.reference_accession))
    });
    candidates.truncate(limit);
    candidates
}
