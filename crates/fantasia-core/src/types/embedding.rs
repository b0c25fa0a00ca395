//! Persisted embedding vectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

use super::ModelId;

/// A fixed-dimension embedding of one sequence under one model.
///
/// Owned by the vector store once persisted; immutable thereafter. Keyed by
/// `(accession, model_id)` — a sequence yields at most one vector per model,
/// and redelivered packages overwrite with identical content (idempotent
/// upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// Accession of the embedded sequence
    pub accession: String,
    /// Model that produced the vector
    pub model_id: ModelId,
    /// The embedding itself, `model_id.dimension()` components
    pub vector: Vec<f32>,
    /// Persistence timestamp
    pub created_at: DateTime<Utc>,
}

impl EmbeddingVector {
    /// Build a vector, checking the model's dimension contract.
    ///
    /// # Errors
    ///
    /// [`CoreError::DimensionMismatch`] if `vector.len()` differs from
    /// `model_id.dimension()`.
    pub fn new(
        accession: impl Into<String>,
        model_id: ModelId,
        vector: Vec<f32>,
    ) -> CoreResult<Self> {
        if vector.len() != model_id.dimension() {
            return Err(CoreError::DimensionMismatch {
                model_id,
                expected: model_id.dimension(),
                actual: vector.len(),
            });
        }
        Ok(Self {
            accession: accession.into(),
            model_id,
            vector,
            created_at: Utc::now(),
        })
    }

    /// Content equality, ignoring `created_at`.
    ///
    /// The idempotence contract is about content: re-upserting the same
    /// vector must leave the store observably unchanged even though the
    /// redelivered copy carries a later timestamp.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.accession == other.accession
            && self.model_id == other.model_id
            && self.vector == other.vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_contract_is_enforced() {
        let err = EmbeddingVector::new("Q1", ModelId::ProtT5, vec![0.0; 3]).unwrap_err();
        assert!(err.to_string().contains("1024"));
        assert!(EmbeddingVector::new("Q1", ModelId::ProtT5, vec![0.0; 1024]).is_ok());
    }

    #[test]
    fn same_content_ignores_timestamp() {
        let a = EmbeddingVector::new("Q1", ModelId::Esm2, vec![0.5; 1280]).unwrap();
        let b = EmbeddingVector::new("Q1", ModelId::Esm2, vec![0.5; 1280]).unwrap();
        assert!(a.same_content(&b));
    }
}
