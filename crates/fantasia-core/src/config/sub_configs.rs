//! Sub-configuration types and serde defaults for [`RunConfig`].
//!
//! [`RunConfig`]: super::RunConfig

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DistanceMetric;

/// Policy for accessions that repeat in the input FASTA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the load with a `DuplicateAccession` error.
    #[default]
    Error,
    /// Keep the last occurrence, count the replacement in the summary.
    LastWins,
}

/// Metric and per-model embedding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingSection {
    /// Metric used by nearest-neighbor queries
    #[serde(default)]
    pub distance_metric: DistanceMetric,
    /// Per-model settings keyed by canonical model id (`prot_t5`, ...)
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

/// Settings for one embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Whether this model participates in the run
    #[serde(default)]
    pub enabled: bool,
    /// Neighbors beyond this distance are excluded from annotation transfer
    pub distance_threshold: f32,
    /// Sequences per call into the underlying model (throughput knob)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Cross-model join policy for the aggregation barrier.
///
/// Aggregation for an accession normally waits until every enabled model has
/// finished searching for it. `Timeout` caps that wait and aggregates over
/// whatever models have completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JoinPolicy {
    /// Wait for the full enabled-model set.
    WaitAll,
    /// Aggregate after `timeout_ms` even if some models are still pending.
    Timeout {
        /// Maximum wait per accession, in milliseconds
        timeout_ms: u64,
    },
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self::WaitAll
    }
}

/// Score weighting and join policy for the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Multiplicative bonus per additional supporting model.
    ///
    /// With bonus `b` and `m` supporting models, the summed inverse-distance
    /// evidence is scaled by `1 + b * (m - 1)`. Zero disables cross-model
    /// weighting without breaking monotonicity.
    #[serde(default = "default_model_agreement_bonus")]
    pub model_agreement_bonus: f64,
    /// Cross-model join behavior
    #[serde(default)]
    pub join_policy: JoinPolicy,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            model_agreement_bonus: default_model_agreement_bonus(),
            join_policy: JoinPolicy::default(),
        }
    }
}

pub(super) fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

pub(super) fn default_store_path() -> PathBuf {
    PathBuf::from("fantasia_store")
}

pub(super) fn default_prefix() -> String {
    "fantasia".to_string()
}

pub(super) const fn default_max_workers() -> usize {
    4
}

pub(super) const fn default_monitor_interval() -> u64 {
    30
}

pub(super) fn default_redundancy_file() -> PathBuf {
    PathBuf::from("redundancy.fasta")
}

pub(super) const fn default_package_size() -> usize {
    64
}

pub(super) const fn default_true() -> bool {
    true
}

pub(super) fn default_reference_tag() -> String {
    "GOA".to_string()
}

pub(super) const fn default_limit_per_entry() -> usize {
    10
}

const fn default_batch_size() -> usize {
    32
}

fn default_model_agreement_bonus() -> f64 {
    0.25
}
