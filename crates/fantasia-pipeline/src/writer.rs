//! Result writer: annotation table plus run summary.
//!
//! Every run produces two files in `output_dir`, both stamped with the same
//! run timestamp so repeated runs never clobber each other:
//!
//! - `{prefix}_annotations_{stamp}.csv` — one row per annotation call
//! - `{prefix}_summary_{stamp}.json` — the full [`RunSummary`]

use std::path::{Path, PathBuf};

use chrono::Utc;

use fantasia_core::types::{AnnotationCall, RunSummary};

use crate::error::PipelineResult;

/// Paths produced by one write pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    /// Annotation table
    pub annotations_csv: PathBuf,
    /// Run summary
    pub summary_json: PathBuf,
}

/// Writes run output under a fixed directory and file prefix.
pub struct ResultWriter {
    output_dir: PathBuf,
    prefix: String,
    run_stamp: String,
}

impl ResultWriter {
    /// Create a writer stamping this run with the current UTC time.
    #[must_use]
    pub fn new(output_dir: &Path, prefix: &str) -> Self {
        Self::with_stamp(output_dir, prefix, &Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    /// Create a writer with an explicit run stamp. Tests use this to get
    /// predictable file names.
    #[must_use]
    pub fn with_stamp(output_dir: &Path, prefix: &str, run_stamp: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            prefix: prefix.to_string(),
            run_stamp: run_stamp.to_string(),
        }
    }

    fn stamped(&self, kind: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}_{}.{extension}", self.prefix, self.run_stamp))
    }

    /// Write the annotation table and run summary.
    ///
    /// `calls` are written in the order given; the coordinator hands them
    /// over already sorted by accession, then score, then GO term, so file
    /// content is byte-identical across re-runs of the same input.
    ///
    /// # Errors
    ///
    /// I/O failures creating the directory or writing either file, and CSV
    /// serialization failures.
    pub fn write(
        &self,
        calls: &[AnnotationCall],
        summary: &RunSummary,
    ) -> PipelineResult<WrittenFiles> {
        std::fs::create_dir_all(&self.output_dir)?;

        let annotations_csv = self.stamped("annotations", "csv");
        let mut writer = csv::Writer::from_path(&annotations_csv)?;
        writer.write_record([
            "accession",
            "go_term",
            "aggregate_score",
            "supporting_models",
            "neighbor_count",
        ])?;
        for call in calls {
            writer.write_record([
                call.query_accession.as_str(),
                call.go_term.as_str(),
                &format!("{:.6}", call.aggregate_score),
                &call.supporting_models_column(),
                &call.neighbor_count.to_string(),
            ])?;
        }
        writer.flush()?;

        let summary_json = self.stamped("summary", "json");
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&summary_json, json)?;

        tracing::info!(
            annotations = calls.len(),
            csv = %annotations_csv.display(),
            summary = %summary_json.display(),
            "results written"
        );
        Ok(WrittenFiles {
            annotations_csv,
            summary_json,
        })
    }
}
