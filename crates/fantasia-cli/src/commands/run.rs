//! `run`: execute a full annotation-transfer run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use fantasia_core::types::ModelId;
use fantasia_core::RunConfig;
use fantasia_embeddings::{HashEmbedder, MemoryQueueBroker, SequenceEmbedder, TaskQueue};
use fantasia_pipeline::{
    CdHitClusterer, PipelineCoordinator, PipelineResult, RedundancyClusterer, RunOutcome,
};
use fantasia_store::{RocksDbVectorStore, VectorStore};

use crate::error::exit_code_for;

/// Arguments for `run`.
#[derive(Args)]
pub struct RunArgs {
    /// Run configuration file
    #[arg(short, long, env = "FANTASIA_CONFIG", default_value = "fantasia.toml")]
    pub config: PathBuf,

    /// Override the input FASTA from the configuration
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

/// Handle `run`, returning the process exit code.
pub async fn handle_run(args: RunArgs) -> i32 {
    match run(args).await {
        Ok(outcome) => {
            if let Some(files) = &outcome.files {
                println!("{}", files.annotations_csv.display());
                println!("{}", files.summary_json.display());
            }
            0
        }
        Err(e) => {
            tracing::error!(stage = %e.stage(), error = %e, "run failed");
            exit_code_for(&e)
        }
    }
}

async fn run(args: RunArgs) -> PipelineResult<RunOutcome> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(input) = args.input {
        config.input = input;
    }
    let config = Arc::new(config);

    let store: Arc<dyn VectorStore> = Arc::new(RocksDbVectorStore::open(&config.store_path)?);
    let broker: Arc<dyn TaskQueue> = Arc::new(MemoryQueueBroker::new());
    let embedders: BTreeMap<ModelId, Arc<dyn SequenceEmbedder>> = config
        .enabled_models()
        .into_iter()
        .map(|m| (m, Arc::new(HashEmbedder::new(m)) as Arc<dyn SequenceEmbedder>))
        .collect();
    let clusterer: Option<Arc<dyn RedundancyClusterer>> = (config.redundancy_filter > 0.0)
        .then(|| {
            Arc::new(CdHitClusterer::new(config.redundancy_file.clone()))
                as Arc<dyn RedundancyClusterer>
        });

    let coordinator = PipelineCoordinator::new(config, store, broker, embedders, clusterer);
    coordinator.run().await
}
