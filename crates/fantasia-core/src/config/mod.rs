//! Run configuration for the annotation-transfer pipeline.
//!
//! The configuration is constructed once at startup, validated, and threaded
//! through every component constructor as an immutable object. There is no
//! ambient or global mutable state.

mod sub_configs;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{DistanceMetric, ModelId};

pub use sub_configs::{
    AggregationConfig, DuplicatePolicy, EmbeddingSection, JoinPolicy, ModelConfig,
};

/// Main run configuration.
///
/// Loaded from a TOML file (optionally overridden by `FANTASIA_`-prefixed
/// environment variables) and validated before any stage runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input FASTA path
    pub input: PathBuf,
    /// Directory for the annotation table and run summary
    #[serde(default = "sub_configs::default_output_dir")]
    pub output_dir: PathBuf,
    /// Prefix for run-stamped artifact names
    #[serde(default = "sub_configs::default_prefix")]
    pub prefix: String,
    /// Location of the persistent vector store
    #[serde(default = "sub_configs::default_store_path")]
    pub store_path: PathBuf,
    /// Concurrent in-flight packages per model pool
    #[serde(default = "sub_configs::default_max_workers")]
    pub max_workers: usize,
    /// Liveness-poll period in seconds
    #[serde(default = "sub_configs::default_monitor_interval")]
    pub monitor_interval: u64,
    /// Maximum residue count kept; longer records are dropped and logged
    #[serde(default)]
    pub length_filter: Option<usize>,
    /// CD-HIT identity threshold; 0 disables redundancy filtering
    #[serde(default)]
    pub redundancy_filter: f64,
    /// Path for the filtered FASTA written by the clustering tool
    #[serde(default = "sub_configs::default_redundancy_file")]
    pub redundancy_file: PathBuf,
    /// Maximum records per work package
    #[serde(default = "sub_configs::default_package_size")]
    pub sequence_queue_package: usize,
    /// Purge model queues at run end (true) or retain them for diagnostics
    #[serde(default = "sub_configs::default_true")]
    pub delete_queues: bool,
    /// Tag of the reference embedding set to search against
    #[serde(default = "sub_configs::default_reference_tag")]
    pub lookup_reference_tag: String,
    /// Maximum neighbors returned per query per model
    #[serde(default = "sub_configs::default_limit_per_entry")]
    pub limit_per_entry: usize,
    /// What to do when the input repeats an accession
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Metric and per-model settings
    #[serde(default)]
    pub embedding: EmbeddingSection,
    /// Score weighting and cross-model join policy
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigError`] if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let config: RunConfig = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("failed to parse config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file plus `FANTASIA_`-prefixed environment
    /// overrides (`FANTASIA_MAX_WORKERS=8`, `FANTASIA_EMBEDDING__DISTANCE_METRIC=euclidean`).
    pub fn load(path: &Path) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("FANTASIA").separator("__"));
        let config: RunConfig = builder.build()?.try_deserialize().map_err(|e| {
            CoreError::ConfigError(format!("failed to deserialize configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Models enabled for this run, in canonical order.
    ///
    /// Canonical order keeps queue declaration, search iteration, and output
    /// columns deterministic across runs.
    #[must_use]
    pub fn enabled_models(&self) -> Vec<ModelId> {
        ModelId::all()
            .iter()
            .copied()
            .filter(|m| {
                self.embedding
                    .models
                    .get(m.as_str())
                    .is_some_and(|c| c.enabled)
            })
            .collect()
    }

    /// Per-model settings for an enabled model.
    #[must_use]
    pub fn model_config(&self, model_id: ModelId) -> Option<&ModelConfig> {
        self.embedding.models.get(model_id.as_str())
    }

    /// Distance metric for this run.
    #[must_use]
    pub fn distance_metric(&self) -> DistanceMetric {
        self.embedding.distance_metric
    }

    /// Validate the configuration. Fails fast, before any stage runs.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigError`] on a missing input path, zero package size
    /// or neighbor limit, no enabled model, or invalid per-model settings;
    /// [`CoreError::UnknownModel`] if the models table names an id that is
    /// not in the registry.
    pub fn validate(&self) -> CoreResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(CoreError::ConfigError("input path must be set".into()));
        }
        if self.sequence_queue_package == 0 {
            return Err(CoreError::ConfigError(
                "sequence_queue_package must be greater than 0".into(),
            ));
        }
        if self.limit_per_entry == 0 {
            return Err(CoreError::ConfigError(
                "limit_per_entry must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.redundancy_filter) {
            return Err(CoreError::ConfigError(format!(
                "redundancy_filter must be in [0, 1], got {}",
                self.redundancy_filter
            )));
        }

        for (name, model) in &self.embedding.models {
            ModelId::from_str(name)?;
            if model.batch_size == 0 {
                return Err(CoreError::ConfigError(format!(
                    "embedding.models.{name}.batch_size must be greater than 0"
                )));
            }
            if !model.distance_threshold.is_finite() || model.distance_threshold <= 0.0 {
                return Err(CoreError::ConfigError(format!(
                    "embedding.models.{name}.distance_threshold must be a positive finite number"
                )));
            }
        }

        if self.enabled_models().is_empty() {
            return Err(CoreError::ConfigError(
                "at least one embedding model must be enabled".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(CoreError::ConfigError(
                "max_workers must be greater than 0".into(),
            ));
        }
        if self.aggregation.model_agreement_bonus < 0.0 {
            return Err(CoreError::ConfigError(
                "aggregation.model_agreement_bonus must be non-negative".into(),
            ));
        }

        Ok(())
    }

    /// A minimal valid configuration for tests and examples: one enabled
    /// model, redundancy filtering off.
    #[must_use]
    pub fn default_config() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            ModelId::ProtT5.as_str().to_string(),
            ModelConfig {
                enabled: true,
                distance_threshold: 1.0,
                batch_size: 32,
            },
        );
        Self {
            input: PathBuf::from("queries.fasta"),
            output_dir: sub_configs::default_output_dir(),
            prefix: sub_configs::default_prefix(),
            store_path: sub_configs::default_store_path(),
            max_workers: sub_configs::default_max_workers(),
            monitor_interval: sub_configs::default_monitor_interval(),
            length_filter: None,
            redundancy_filter: 0.0,
            redundancy_file: sub_configs::default_redundancy_file(),
            sequence_queue_package: sub_configs::default_package_size(),
            delete_queues: true,
            lookup_reference_tag: sub_configs::default_reference_tag(),
            limit_per_entry: sub_configs::default_limit_per_entry(),
            duplicate_policy: DuplicatePolicy::default(),
            embedding: EmbeddingSection {
                distance_metric: DistanceMetric::Cosine,
                models,
            },
            aggregation: AggregationConfig::default(),
        }
    }
}
