//! Deterministic hash-based embedder.
//!
//! Generates repeatable embeddings from a SHA-256 digest of the sequence:
//! same sequence → same vector, different sequences → different vectors, all
//! normalized to unit length so cosine distances are meaningful. Used by the
//! test suite and by runs that have no model weights available.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use fantasia_core::types::ModelId;

use crate::error::EmbeddingError;
use crate::provider::SequenceEmbedder;

/// Deterministic embedder seeded from a content hash.
///
/// # Example
///
/// ```rust
/// use fantasia_core::types::ModelId;
/// use fantasia_embeddings::{HashEmbedder, SequenceEmbedder};
///
/// let embedder = HashEmbedder::new(ModelId::ProtT5);
/// assert_eq!(embedder.dimension(), 1024);
/// ```
pub struct HashEmbedder {
    model_id: ModelId,
    fail_on: Option<String>,
}

impl HashEmbedder {
    /// Create an embedder for `model_id`.
    #[must_use]
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            fail_on: None,
        }
    }

    /// Fail any sequence containing `pattern`, for exercising the per-item
    /// failure path in tests.
    #[must_use]
    pub fn failing_on(model_id: ModelId, pattern: impl Into<String>) -> Self {
        Self {
            model_id,
            fail_on: Some(pattern.into()),
        }
    }

    /// Deterministic unit-length vector derived from the sequence digest.
    ///
    /// An xorshift generator seeded from the digest fills the vector; the
    /// model id is mixed into the digest so the same sequence lands in a
    /// different region of each model's space.
    fn vector_for(&self, sequence: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(self.model_id.as_str().as_bytes());
        hasher.update(sequence.as_bytes());
        let digest = hasher.finalize();

        let mut state = u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
        // A zero seed would make xorshift emit zeros forever.
        if state == 0 {
            state = 0x9E37_79B9_7F4A_7C15;
        }

        let dim = self.model_id.dimension();
        let mut vector = Vec::with_capacity(dim);
        for _ in 0..dim {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // Map to [-1, 1)
            vector.push((state as f32 / u64::MAX as f32) * 2.0 - 1.0);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl SequenceEmbedder for HashEmbedder {
    fn model_id(&self) -> ModelId {
        self.model_id
    }

    async fn embed_batch(&self, sequences: &[String]) -> Vec<Result<Vec<f32>, EmbeddingError>> {
        sequences
            .iter()
            .map(|sequence| {
                if let Some(pattern) = &self.fail_on {
                    if sequence.contains(pattern.as_str()) {
                        return Err(EmbeddingError::SequenceFailed {
                            accession: String::new(),
                            model_id: self.model_id,
                            reason: format!("sequence matches failure pattern '{pattern}'"),
                        });
                    }
                }
                Ok(self.vector_for(sequence))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_sequence_same_vector() {
        let embedder = HashEmbedder::new(ModelId::ProtT5);
        let a = embedder.embed_batch(&["MKTAYIAK".to_string()]).await;
        let b = embedder.embed_batch(&["MKTAYIAK".to_string()]).await;
        assert_eq!(a[0].as_ref().unwrap(), b[0].as_ref().unwrap());
    }

    #[tokio::test]
    async fn different_sequences_differ() {
        let embedder = HashEmbedder::new(ModelId::ProtT5);
        let out = embedder
            .embed_batch(&["MKTAYIAK".to_string(), "MVLSPADK".to_string()])
            .await;
        assert_ne!(out[0].as_ref().unwrap(), out[1].as_ref().unwrap());
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashEmbedder::new(ModelId::Esm2);
        let out = embedder.embed_batch(&["MKTAYIAK".to_string()]).await;
        let v = out[0].as_ref().unwrap();
        assert_eq!(v.len(), 1280);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn models_produce_distinct_spaces() {
        let seq = vec!["MKTAYIAK".to_string()];
        let a = HashEmbedder::new(ModelId::ProtT5).embed_batch(&seq).await;
        let b = HashEmbedder::new(ModelId::ProstT5).embed_batch(&seq).await;
        assert_ne!(a[0].as_ref().unwrap(), b[0].as_ref().unwrap());
    }

    #[tokio::test]
    async fn failure_pattern_fails_only_matching_items() {
        let embedder = HashEmbedder::failing_on(ModelId::ProtT5, "WWW");
        let out = embedder
            .embed_batch(&["MKTAYIAK".to_string(), "MWWWK".to_string()])
            .await;
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }
}
