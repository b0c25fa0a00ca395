//! `initialize`: provision the reference embedding set.
//!
//! Reads a reference FASTA and a tab-separated GO annotation table, embeds
//! every annotated reference protein under each enabled model, and persists
//! the tagged vectors the `run` command searches against. References without
//! annotations are skipped: a neighbor that carries no GO terms can never
//! contribute to a call.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use fantasia_core::config::DuplicatePolicy;
use fantasia_core::types::{EmbeddingVector, ModelId, ReferenceAnnotation};
use fantasia_core::{CoreError, RunConfig};
use fantasia_embeddings::{HashEmbedder, SequenceEmbedder};
use fantasia_pipeline::{load_fasta_file, PipelineError, PipelineResult};
use fantasia_store::{RocksDbVectorStore, VectorStore};

use crate::error::exit_code_for;

/// Arguments for `initialize`.
#[derive(Args)]
pub struct InitializeArgs {
    /// Run configuration file
    #[arg(short, long, env = "FANTASIA_CONFIG", default_value = "fantasia.toml")]
    pub config: PathBuf,

    /// Reference FASTA with annotated proteins
    #[arg(long)]
    pub fasta: PathBuf,

    /// Tab-separated annotation table: accession, GO term, optional weight
    #[arg(long)]
    pub annotations: PathBuf,

    /// Reference tag to store under; defaults to `lookup_reference_tag`
    #[arg(long)]
    pub tag: Option<String>,
}

/// Handle `initialize`, returning the process exit code.
pub async fn handle_initialize(args: InitializeArgs) -> i32 {
    match initialize(args).await {
        Ok((tag, count)) => {
            println!("{count} reference vectors stored under tag {tag}");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "initialization failed");
            exit_code_for(&e)
        }
    }
}

async fn initialize(args: InitializeArgs) -> PipelineResult<(String, usize)> {
    let config = RunConfig::load(&args.config)?;
    let tag = args
        .tag
        .unwrap_or_else(|| config.lookup_reference_tag.clone());

    let annotations = read_annotation_table(&args.annotations)?;
    let references = load_fasta_file(&args.fasta, DuplicatePolicy::Error, None)?;
    let store = RocksDbVectorStore::open(&config.store_path)?;

    let total = provision_references(
        &store,
        &config.enabled_models(),
        &tag,
        &references.records,
        &annotations,
    )
    .await?;
    Ok((tag, total))
}

/// Provision the reference set for every enabled model, returning the total
/// number of vectors stored (one per annotated protein per model).
async fn provision_references(
    store: &dyn VectorStore,
    models: &[ModelId],
    tag: &str,
    records: &[fantasia_core::types::SequenceRecord],
    annotations: &BTreeMap<String, Vec<(String, f32)>>,
) -> PipelineResult<usize> {
    let mut total = 0usize;
    for &model_id in models {
        let embedder = HashEmbedder::new(model_id);
        let stored =
            store_references_for_model(store, &embedder, model_id, tag, records, annotations)
                .await?;
        tracing::info!(
            model = %model_id,
            tag = %tag,
            stored,
            "reference set provisioned"
        );
        total += stored;
    }
    Ok(total)
}

async fn store_references_for_model(
    store: &dyn VectorStore,
    embedder: &dyn SequenceEmbedder,
    model_id: ModelId,
    tag: &str,
    records: &[fantasia_core::types::SequenceRecord],
    annotations: &BTreeMap<String, Vec<(String, f32)>>,
) -> PipelineResult<usize> {
    let mut stored = 0usize;
    for record in records {
        let Some(terms) = annotations.get(&record.accession) else {
            tracing::debug!(accession = %record.accession, "reference has no annotations, skipping");
            continue;
        };
        let vector = embedder
            .embed_batch(std::slice::from_ref(&record.sequence))
            .await
            .pop()
            .ok_or_else(|| {
                fantasia_embeddings::EmbeddingError::Transport(
                    "embedder returned no result".into(),
                )
            })??;
        let embedding = EmbeddingVector::new(&record.accession, model_id, vector)?;
        let reference_annotations: Vec<ReferenceAnnotation> = terms
            .iter()
            .map(|(go_term, weight)| ReferenceAnnotation {
                reference_accession: record.accession.clone(),
                model_id,
                go_term: go_term.clone(),
                evidence_weight: *weight,
            })
            .collect();
        store.insert_reference(tag, &embedding, &reference_annotations)?;
        stored += 1;
    }
    Ok(stored)
}

/// Parse the annotation table: `accession<TAB>go_term[<TAB>weight]`, no
/// header. Missing weights default to 1.0.
fn read_annotation_table(path: &PathBuf) -> PipelineResult<BTreeMap<String, Vec<(String, f32)>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut table: BTreeMap<String, Vec<(String, f32)>> = BTreeMap::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let accession = record.get(0).unwrap_or("").trim();
        let go_term = record.get(1).unwrap_or("").trim();
        if accession.is_empty() || go_term.is_empty() {
            return Err(PipelineError::Core(CoreError::ConfigError(format!(
                "annotation table line {}: expected accession and GO term",
                line + 1
            ))));
        }
        let weight = match record.get(2).map(str::trim) {
            None | Some("") => 1.0,
            Some(raw) => raw.parse::<f32>().map_err(|e| {
                CoreError::ConfigError(format!(
                    "annotation table line {}: bad weight {raw:?}: {e}",
                    line + 1
                ))
            })?,
        };
        table
            .entry(accession.to_string())
            .or_default()
            .push((go_term.to_string(), weight));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn annotation_table_parses_with_and_without_weights() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "P12345\tGO:0008270\t0.9").unwrap();
        writeln!(file, "P12345\tGO:0005515").unwrap();
        writeln!(file, "Q67890\tGO:0016020\t0.5").unwrap();

        let table = read_annotation_table(&file.path().to_path_buf()).unwrap();
        assert_eq!(table["P12345"].len(), 2);
        assert_eq!(table["P12345"][1], ("GO:0005515".to_string(), 1.0));
        assert_eq!(table["Q67890"][0].1, 0.5);
    }

    #[test]
    fn missing_go_term_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "P12345").unwrap();
        assert!(read_annotation_table(&file.path().to_path_buf()).is_err());
    }

    #[tokio::test]
    async fn provisioning_counts_sum_across_models() {
        let store = fantasia_store::MemoryVectorStore::new();
        let records = vec![
            fantasia_core::types::SequenceRecord::new("R1", "MKTAYIAK").unwrap(),
            fantasia_core::types::SequenceRecord::new("R2", "MVLSPADK").unwrap(),
            fantasia_core::types::SequenceRecord::new("R_BARE", "MNIFEMLR").unwrap(),
        ];
        let mut annotations: BTreeMap<String, Vec<(String, f32)>> = BTreeMap::new();
        annotations.insert("R1".into(), vec![("GO:0001".into(), 1.0)]);
        annotations.insert("R2".into(), vec![("GO:0002".into(), 1.0)]);

        let models = [ModelId::ProtT5, ModelId::Esm2];
        let total = provision_references(&store, &models, "GOA", &records, &annotations)
            .await
            .unwrap();

        // Two annotated proteins under two models; the unannotated one is
        // skipped in both.
        assert_eq!(total, 4);
        assert_eq!(store.reference_count("GOA", ModelId::ProtT5).unwrap(), 2);
        assert_eq!(store.reference_count("GOA", ModelId::Esm2).unwrap(), 2);
    }
}
