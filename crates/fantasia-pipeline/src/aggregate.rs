//! Cross-model join and annotation aggregation.
//!
//! Neighbor hits arrive per model with no ordering guarantees. [`SearchJoin`]
//! is the explicit barrier keyed on the enabled-model set: an accession is
//! aggregated only once every enabled model has completed searching (or the
//! configured timeout policy released it). [`Aggregator`] then folds the
//! joined hits into ranked [`AnnotationCall`]s.

use std::collections::{BTreeMap, BTreeSet};

use fantasia_core::config::AggregationConfig;
use fantasia_core::types::{AnnotationCall, ModelId};

use crate::search::AnnotatedHit;

/// Per-accession join barrier over the enabled-model set.
///
/// Models report in whole: `complete_model` records one model's entire
/// search output. The join is released when `completed == enabled`; the
/// coordinator may force-release it under a timeout policy by completing
/// missing models with empty results.
#[derive(Debug, Default)]
pub struct SearchJoin {
    enabled: BTreeSet<ModelId>,
    completed: BTreeSet<ModelId>,
    hits: BTreeMap<String, Vec<AnnotatedHit>>,
}

impl SearchJoin {
    /// Create a join over `enabled` models.
    #[must_use]
    pub fn new(enabled: &[ModelId]) -> Self {
        Self {
            enabled: enabled.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Record one model's complete search output.
    pub fn complete_model(
        &mut self,
        model_id: ModelId,
        results: BTreeMap<String, Vec<AnnotatedHit>>,
    ) {
        for (accession, model_hits) in results {
            self.hits.entry(accession).or_default().extend(model_hits);
        }
        self.completed.insert(model_id);
    }

    /// True once every enabled model has reported.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.is_superset(&self.enabled)
    }

    /// Enabled models that have not reported yet.
    #[must_use]
    pub fn missing_models(&self) -> Vec<ModelId> {
        self.enabled.difference(&self.completed).copied().collect()
    }

    /// Release the join: hits grouped by accession, in accession order.
    ///
    /// Callers check [`is_complete`](Self::is_complete) (or apply their
    /// timeout policy) before releasing.
    #[must_use]
    pub fn into_per_accession(self) -> BTreeMap<String, Vec<AnnotatedHit>> {
        self.hits
    }
}

/// Folds joined neighbor hits into ranked annotation calls.
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    /// Create an aggregator with the run's weighting configuration.
    #[must_use]
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Aggregate one accession's hits into calls, ranked by descending
    /// score, ties broken by GO term lexical order.
    ///
    /// For each GO term, the score is
    ///
    /// ```text
    /// (1 + model_agreement_bonus * (supporting_models - 1))
    ///     * Σ evidence_weight / (1 + distance)
    /// ```
    ///
    /// which is monotone in model count, neighbor count, and closeness:
    /// adding a supporting neighbor adds a non-negative term to the sum, and
    /// adding a supporting model additionally grows the multiplier (the
    /// bonus is validated non-negative).
    ///
    /// Zero hits yield zero calls — that accession is unannotated, not an
    /// error.
    #[must_use]
    pub fn aggregate(&self, query_accession: &str, hits: &[AnnotatedHit]) -> Vec<AnnotationCall> {
        #[derive(Default)]
        struct TermEvidence {
            models: BTreeSet<ModelId>,
            inverse_distance_sum: f64,
            neighbor_count: usize,
        }

        let mut per_term: BTreeMap<String, TermEvidence> = BTreeMap::new();
        for annotated in hits {
            for annotation in &annotated.annotations {
                let evidence = per_term.entry(annotation.go_term.clone()).or_default();
                evidence.models.insert(annotated.hit.model_id);
                evidence.inverse_distance_sum += f64::from(annotation.evidence_weight.max(0.0))
                    / (1.0 + f64::from(annotated.hit.distance));
                evidence.neighbor_count += 1;
            }
        }

        let mut calls: Vec<AnnotationCall> = per_term
            .into_iter()
            .map(|(go_term, evidence)| {
                let agreement =
                    1.0 + self.config.model_agreement_bonus * (evidence.models.len() as f64 - 1.0);
                AnnotationCall {
                    query_accession: query_accession.to_string(),
                    go_term,
                    aggregate_score: agreement * evidence.inverse_distance_sum,
                    supporting_models: evidence.models,
                    neighbor_count: evidence.neighbor_count,
                }
            })
            .collect();

        calls.sort_by(|a, b| {
            b.aggregate_score
                .total_cmp(&a.aggregate_score)
                .then_with(|| a.go_term.cmp(&b.go_term))
        });
        calls
    }
}
