//! Run summary: the accounting record emitted next to the annotation table.
//!
//! No rejected or failed record is silently dropped; each one lands in
//! exactly one of the counters or lists here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ModelId;

/// Why a query protein produced no annotation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Embedding failed on every enabled model; never searched.
    AllModelsFailed,
    /// Searched, but no reference neighbor fell under any model's threshold.
    Unannotated,
}

/// A per-sequence embedding failure, recorded with full context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFailure {
    /// Sequence that failed to embed
    pub accession: String,
    /// Model it failed under
    pub model_id: ModelId,
    /// Failure description from the embedder
    pub reason: String,
}

/// Counts and per-record reports for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records parsed from the input FASTA
    pub loaded: usize,
    /// Records dropped by `length_filter`
    pub length_filtered: usize,
    /// Duplicate accessions replaced under the `last_wins` policy
    pub duplicates_replaced: usize,
    /// Records removed by redundancy filtering
    pub redundancy_removed: usize,
    /// Removed accession → representative accession, for traceability
    pub redundancy_representatives: BTreeMap<String, String>,
    /// Proteins with at least one successful embedding
    pub embedded: usize,
    /// Per-model embedding failure counts
    pub embedding_failures_by_model: BTreeMap<ModelId, usize>,
    /// Individual embedding failures with reasons
    pub embedding_failures: Vec<EmbeddingFailure>,
    /// Proteins that received at least one annotation call
    pub annotated: usize,
    /// Accessions excluded from output, with the reason
    pub excluded: BTreeMap<String, ExclusionReason>,
    /// Whether the monitor observed a stall during the run
    pub degraded: bool,
}

impl RunSummary {
    /// Record one embedding failure, updating both the per-model counter and
    /// the detailed list.
    pub fn record_embedding_failure(&mut self, failure: EmbeddingFailure) {
        *self
            .embedding_failures_by_model
            .entry(failure.model_id)
            .or_insert(0) += 1;
        self.embedding_failures.push(failure);
    }

    /// Accessions recorded as unannotated (searched, zero neighbors).
    #[must_use]
    pub fn unannotated_count(&self) -> usize {
        self.excluded
            .values()
            .filter(|r| **r == ExclusionReason::Unannotated)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_failures_update_both_views() {
        let mut summary = RunSummary::default();
        summary.record_embedding_failure(EmbeddingFailure {
            accession: "Q1".into(),
            model_id: ModelId::ProtT5,
            reason: "sequence too long".into(),
        });
        summary.record_embedding_failure(EmbeddingFailure {
            accession: "Q2".into(),
            model_id: ModelId::ProtT5,
            reason: "oom".into(),
        });
        assert_eq!(summary.embedding_failures.len(), 2);
        assert_eq!(summary.embedding_failures_by_model[&ModelId::ProtT5], 2);
    }

    #[test]
    fn unannotated_count_filters_by_reason() {
        let mut summary = RunSummary::default();
        summary
            .excluded
            .insert("Q1".into(), ExclusionReason::Unannotated);
        summary
            .excluded
            .insert("Q2".into(), ExclusionReason::AllModelsFailed);
        assert_eq!(summary.unannotated_count(), 1);
    }
}
