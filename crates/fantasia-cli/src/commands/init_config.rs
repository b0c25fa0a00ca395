//! `init-config`: write a starter configuration file.

use std::path::PathBuf;

use clap::Args;

/// Arguments for `init-config`.
#[derive(Args)]
pub struct InitConfigArgs {
    /// Where to write the configuration file
    #[arg(short, long, default_value = "fantasia.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

const STARTER_CONFIG: &str = r#"# FANTASIA run configuration.
# Every value here can be overridden by a FANTASIA_-prefixed environment
# variable, e.g. FANTASIA_MAX_WORKERS=8.

input = "queries.fasta"
output_dir = "results"
prefix = "fantasia"
store_path = "fantasia_store"
max_workers = 4
monitor_interval = 30
# length_filter = 5000
redundancy_filter = 0.0
redundancy_file = "redundancy.fasta"
sequence_queue_package = 64
delete_queues = true
lookup_reference_tag = "GOA"
limit_per_entry = 10
duplicate_policy = "error"

[embedding]
distance_metric = "cosine"

[embedding.models.prot_t5]
enabled = true
distance_threshold = 1.0
batch_size = 32

[embedding.models.prost_t5]
enabled = false
distance_threshold = 1.0
batch_size = 32

[embedding.models.esm2]
enabled = false
distance_threshold = 1.0
batch_size = 16

[aggregation]
model_agreement_bonus = 0.25

[aggregation.join_policy]
kind = "wait_all"
"#;

/// Write the starter configuration. Refuses to overwrite without `--force`.
pub fn handle_init_config(args: &InitConfigArgs) -> i32 {
    if args.output.exists() && !args.force {
        tracing::error!(
            path = %args.output.display(),
            "configuration file already exists, pass --force to overwrite"
        );
        return 2;
    }
    match std::fs::write(&args.output, STARTER_CONFIG) {
        Ok(()) => {
            println!("{}", args.output.display());
            0
        }
        Err(e) => {
            tracing::error!(path = %args.output.display(), error = %e, "failed to write configuration");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_parses_and_validates() {
        let config: fantasia_core::RunConfig = toml::from_str(STARTER_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.enabled_models().len(), 1);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitConfigArgs {
            output: file.path().to_path_buf(),
            force: false,
        };
        assert_eq!(handle_init_config(&args), 2);
    }
}
