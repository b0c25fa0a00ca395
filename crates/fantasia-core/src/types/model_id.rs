//! Embedding model registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifies one of the protein language models in the embedding ensemble.
///
/// Each model owns a dedicated task queue and worker pool; vectors from
/// different models are never compared against each other.
///
/// # Variants
///
/// | Variant | Model | Dimension |
/// |---------|-------|-----------|
/// | ProtT5 | Rostlab/prot_t5_xl_uniref50 | 1024 |
/// | ProstT5 | Rostlab/ProstT5 | 1024 |
/// | Esm2 | facebook/esm2_t33_650M | 1280 |
///
/// # Example
///
/// ```rust
/// use fantasia_core::types::ModelId;
///
/// let model = ModelId::Esm2;
/// assert_eq!(model.dimension(), 1280);
/// assert_eq!(model.as_str(), "esm2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModelId {
    /// ProtT5 encoder, mean-pooled per-residue states (1024D)
    ProtT5 = 0,
    /// ProstT5 bilingual sequence/structure encoder (1024D)
    ProstT5 = 1,
    /// ESM-2 650M transformer (1280D)
    Esm2 = 2,
}

impl ModelId {
    /// All models, in canonical order.
    ///
    /// The order is load-bearing: enabled-model iteration, queue declaration,
    /// and `supporting_models` output all follow it, which keeps re-runs
    /// deterministic.
    #[must_use]
    pub const fn all() -> &'static [ModelId] {
        &[ModelId::ProtT5, ModelId::ProstT5, ModelId::Esm2]
    }

    /// Fixed output dimension of this model's embeddings.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        match self {
            Self::ProtT5 => 1024,
            Self::ProstT5 => 1024,
            Self::Esm2 => 1280,
        }
    }

    /// Canonical lowercase identifier, used as the configuration key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProtT5 => "prot_t5",
            Self::ProstT5 => "prost_t5",
            Self::Esm2 => "esm2",
        }
    }

    /// Name of the durable task queue carrying this model's work packages.
    #[must_use]
    pub fn queue_name(&self) -> String {
        format!("fantasia_embedding_{}", self.as_str())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prot_t5" => Ok(Self::ProtT5),
            "prost_t5" => Ok(Self::ProstT5),
            "esm2" => Ok(Self::Esm2),
            other => Err(CoreError::UnknownModel {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_returns_three_variants_in_canonical_order() {
        let all = ModelId::all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], ModelId::ProtT5);
        assert_eq!(all[2], ModelId::Esm2);
    }

    #[test]
    fn dimensions_match_model_cards() {
        assert_eq!(ModelId::ProtT5.dimension(), 1024);
        assert_eq!(ModelId::ProstT5.dimension(), 1024);
        assert_eq!(ModelId::Esm2.dimension(), 1280);
    }

    #[test]
    fn round_trip_through_str() {
        for model in ModelId::all() {
            assert_eq!(ModelId::from_str(model.as_str()).unwrap(), *model);
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(ModelId::from_str("alphafold").is_err());
    }

    #[test]
    fn queue_names_are_distinct() {
        assert_eq!(ModelId::ProtT5.queue_name(), "fantasia_embedding_prot_t5");
        assert_ne!(ModelId::ProtT5.queue_name(), ModelId::Esm2.queue_name());
    }
}
