//! Embedding provider trait definition.
//!
//! The protein language models themselves are external collaborators; the
//! pipeline consumes them through [`SequenceEmbedder`], which lets tests and
//! weight-less runs substitute the deterministic [`HashEmbedder`].
//!
//! [`HashEmbedder`]: crate::HashEmbedder

use async_trait::async_trait;

use fantasia_core::types::ModelId;

use crate::error::EmbeddingError;

/// Trait for sequence embedding capabilities.
///
/// Implementations convert amino-acid sequences into fixed-dimension vectors.
/// A batch call reports failure per item: one unembeddable sequence must not
/// poison the rest of its batch.
#[async_trait]
pub trait SequenceEmbedder: Send + Sync {
    /// Which model this embedder realizes.
    fn model_id(&self) -> ModelId;

    /// Output dimension; must equal `self.model_id().dimension()`.
    fn dimension(&self) -> usize {
        self.model_id().dimension()
    }

    /// Embed a batch of sequences.
    ///
    /// Returns one result per input sequence, in input order. Item `i`
    /// failing yields `Err` at position `i`; the other items are unaffected.
    async fn embed_batch(&self, sequences: &[String]) -> Vec<Result<Vec<f32>, EmbeddingError>>;
}
