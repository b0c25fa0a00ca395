//! Annotation transfer types: reference annotations, neighbor hits, and the
//! final per-protein GO calls.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ModelId;

/// A GO annotation attached to a reference protein, read-only from the
/// pipeline's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAnnotation {
    /// Annotated reference protein
    pub reference_accession: String,
    /// Model space the reference vector lives in
    pub model_id: ModelId,
    /// Gene Ontology identifier, e.g. `GO:0008270`
    pub go_term: String,
    /// Evidence weight carried over from the reference database
    pub evidence_weight: f32,
}

/// One nearest-neighbor result for a query under one model.
///
/// Ephemeral: produced by the similarity search, consumed by the aggregator,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborHit {
    /// Query protein
    pub query_accession: String,
    /// Matched reference protein
    pub reference_accession: String,
    /// Model space the match was found in
    pub model_id: ModelId,
    /// Distance under the run's metric; never exceeds the model's threshold
    pub distance: f32,
}

/// Final output unit: one GO call for one query protein.
///
/// `supporting_models` is a `BTreeSet` so serialized output lists models in
/// canonical order regardless of search completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCall {
    /// Query protein the call is for
    pub query_accession: String,
    /// Transferred GO term
    pub go_term: String,
    /// Models that contributed at least one supporting neighbor
    pub supporting_models: BTreeSet<ModelId>,
    /// Aggregate confidence; monotone in models, neighbors, and closeness
    pub aggregate_score: f64,
    /// Total supporting neighbors across all models
    pub neighbor_count: usize,
}

impl AnnotationCall {
    /// Render `supporting_models` as a `;`-joined canonical-order list for
    /// the tabular output.
    #[must_use]
    pub fn supporting_models_column(&self) -> String {
        self.supporting_models
            .iter()
            .map(ModelId::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supporting_models_render_in_canonical_order() {
        let mut models = BTreeSet::new();
        models.insert(ModelId::Esm2);
        models.insert(ModelId::ProtT5);
        let call = AnnotationCall {
            query_accession: "Q1".into(),
            go_term: "GO:0008270".into(),
            supporting_models: models,
            aggregate_score: 1.0,
            neighbor_count: 2,
        };
        assert_eq!(call.supporting_models_column(), "prot_t5;esm2");
    }
}
