//! Tests for run-configuration loading and validation.

use std::io::Write;

use crate::types::{DistanceMetric, ModelId};

use super::{DuplicatePolicy, JoinPolicy, RunConfig};

const MINIMAL_TOML: &str = r#"
input = "queries.fasta"

[embedding.models.prot_t5]
enabled = true
distance_threshold = 1.0
"#;

#[test]
fn default_config_is_valid() {
    RunConfig::default_config().validate().unwrap();
}

#[test]
fn minimal_toml_parses_with_defaults() {
    let config: RunConfig = toml::from_str(MINIMAL_TOML).unwrap();
    config.validate().unwrap();
    assert_eq!(config.max_workers, 4);
    assert_eq!(config.sequence_queue_package, 64);
    assert_eq!(config.limit_per_entry, 10);
    assert!(config.delete_queues);
    assert_eq!(config.distance_metric(), DistanceMetric::Cosine);
    assert_eq!(config.duplicate_policy, DuplicatePolicy::Error);
    assert_eq!(config.aggregation.join_policy, JoinPolicy::WaitAll);
    assert_eq!(config.enabled_models(), vec![ModelId::ProtT5]);
}

#[test]
fn from_file_round_trip() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(MINIMAL_TOML.as_bytes()).unwrap();
    let config = RunConfig::from_file(file.path()).unwrap();
    assert_eq!(config.input, std::path::PathBuf::from("queries.fasta"));
}

#[test]
fn unknown_model_id_fails_fast() {
    let toml = r#"
input = "queries.fasta"

[embedding.models.alphafold]
enabled = true
distance_threshold = 1.0
"#;
    let config: RunConfig = toml::from_str(toml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("alphafold"));
}

#[test]
fn no_enabled_model_is_rejected() {
    let toml = r#"
input = "queries.fasta"

[embedding.models.prot_t5]
enabled = false
distance_threshold = 1.0
"#;
    let config: RunConfig = toml::from_str(toml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn zero_package_size_is_rejected() {
    let mut config = RunConfig::default_config();
    config.sequence_queue_package = 0;
    assert!(config.validate().is_err());
}

#[test]
fn zero_limit_per_entry_is_rejected() {
    let mut config = RunConfig::default_config();
    config.limit_per_entry = 0;
    assert!(config.validate().is_err());
}

#[test]
fn redundancy_threshold_above_one_is_rejected() {
    let mut config = RunConfig::default_config();
    config.redundancy_filter = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn non_positive_distance_threshold_is_rejected() {
    let mut config = RunConfig::default_config();
    config
        .embedding
        .models
        .get_mut(ModelId::ProtT5.as_str())
        .unwrap()
        .distance_threshold = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn enabled_models_follow_canonical_order() {
    let toml = r#"
input = "queries.fasta"

[embedding.models.esm2]
enabled = true
distance_threshold = 1.5

[embedding.models.prot_t5]
enabled = true
distance_threshold = 1.0
"#;
    let config: RunConfig = toml::from_str(toml).unwrap();
    assert_eq!(
        config.enabled_models(),
        vec![ModelId::ProtT5, ModelId::Esm2]
    );
}

#[test]
fn timeout_join_policy_parses() {
    let toml = r#"
input = "queries.fasta"

[embedding.models.prot_t5]
enabled = true
distance_threshold = 1.0

[aggregation.join_policy]
kind = "timeout"
timeout_ms = 5000
"#;
    let config: RunConfig = toml::from_str(toml).unwrap();
    assert_eq!(
        config.aggregation.join_policy,
        JoinPolicy::Timeout { timeout_ms: 5000 }
    );
}
