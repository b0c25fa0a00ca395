//! Redundancy filtering against an external sequence-clustering capability.
//!
//! The clustering step is an injected capability, not a hard dependency on a
//! specific tool: production runs shell out to CD-HIT, tests substitute a
//! fake. Tool failure is fatal only when filtering is enabled
//! (`redundancy_filter > 0`); with the threshold at 0 the tool is never
//! invoked.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use fantasia_core::config::DuplicatePolicy;
use fantasia_core::types::SequenceRecord;

use crate::error::{PipelineError, PipelineResult};
use crate::fasta::parse_fasta;

/// Outcome of one clustering pass.
#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    /// Surviving representative records, in input order
    pub representatives: Vec<SequenceRecord>,
    /// Removed accession → representative accession, for traceability
    pub removed: BTreeMap<String, String>,
}

/// Injected sequence-clustering capability.
#[async_trait]
pub trait RedundancyClusterer: Send + Sync {
    /// Cluster `records` at `threshold` identity and return the reduced set.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ExternalTool`] if the underlying tool is missing or
    /// fails. The caller treats that as fatal because this method is only
    /// reached when filtering is enabled.
    async fn cluster(
        &self,
        records: &[SequenceRecord],
        threshold: f64,
    ) -> PipelineResult<ClusterOutcome>;
}

/// CD-HIT backed clusterer.
///
/// Runs `cd-hit -i <input> -o <output> -c <threshold>` and reads back the
/// representative FASTA plus the `.clstr` cluster file to build the
/// removed→representative mapping.
pub struct CdHitClusterer {
    binary: PathBuf,
    output_fasta: PathBuf,
}

impl CdHitClusterer {
    /// Create a clusterer invoking `cd-hit` from `PATH`, writing its output
    /// to `output_fasta`.
    #[must_use]
    pub fn new(output_fasta: PathBuf) -> Self {
        Self {
            binary: PathBuf::from("cd-hit"),
            output_fasta,
        }
    }

    /// Use an explicit binary path instead of `PATH` lookup.
    #[must_use]
    pub fn with_binary(binary: PathBuf, output_fasta: PathBuf) -> Self {
        Self {
            binary,
            output_fasta,
        }
    }

    fn tool_error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::ExternalTool {
            tool: self.binary.display().to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RedundancyClusterer for CdHitClusterer {
    async fn cluster(
        &self,
        records: &[SequenceRecord],
        threshold: f64,
    ) -> PipelineResult<ClusterOutcome> {
        let input_fasta = self.output_fasta.with_extension("input.fasta");
        let mut fasta = String::new();
        for record in records {
            fasta.push_str(&format!(">{}\n{}\n", record.accession, record.sequence));
        }
        tokio::fs::write(&input_fasta, fasta).await?;

        let status = tokio::process::Command::new(&self.binary)
            .arg("-i")
            .arg(&input_fasta)
            .arg("-o")
            .arg(&self.output_fasta)
            .arg("-c")
            .arg(threshold.to_string())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.tool_error("not installed or not found in PATH")
                } else {
                    self.tool_error(format!("failed to start: {e}"))
                }
            })?;
        if !status.success() {
            return Err(self.tool_error(format!("exited with {status}")));
        }

        let output = tokio::fs::read_to_string(&self.output_fasta)
            .await
            .map_err(|e| self.tool_error(format!("unreadable output: {e}")))?;
        let survivors = parse_fasta(&output, DuplicatePolicy::Error)?;
        let surviving: std::collections::BTreeSet<&str> = survivors
            .records
            .iter()
            .map(|r| r.accession.as_str())
            .collect();

        // Keep original records (cd-hit may wrap sequences); preserve order.
        let representatives: Vec<SequenceRecord> = records
            .iter()
            .filter(|r| surviving.contains(r.accession.as_str()))
            .cloned()
            .collect();

        let clstr_path = PathBuf::from(format!("{}.clstr", self.output_fasta.display()));
        let clstr = tokio::fs::read_to_string(&clstr_path)
            .await
            .map_err(|e| self.tool_error(format!("unreadable cluster file: {e}")))?;
        let removed = parse_clstr(&clstr);

        Ok(ClusterOutcome {
            representatives,
            removed,
        })
    }
}

/// Parse a CD-HIT `.clstr` file into a removed→representative mapping.
///
/// Format per cluster:
///
/// ```text
/// >Cluster 0
/// 0   120aa, >Q1... *
/// 1   118aa, >Q2... at 98.30%
/// ```
///
/// The `*` line is the representative; every other member maps to it.
fn parse_clstr(content: &str) -> BTreeMap<String, String> {
    let mut removed = BTreeMap::new();
    let mut members: Vec<String> = Vec::new();
    let mut representative: Option<String> = None;

    let mut flush = |members: &mut Vec<String>, representative: &mut Option<String>| {
        if let Some(rep) = representative.take() {
            for member in members.drain(..) {
                if member != rep {
                    removed.insert(member, rep.clone());
                }
            }
        } else {
            members.clear();
        }
    };

    for line in content.lines() {
        if line.starts_with('>') {
            flush(&mut members, &mut representative);
            continue;
        }
        let Some(accession) = line
            .split('>')
            .nth(1)
            .and_then(|rest| rest.split("...").next())
        else {
            continue;
        };
        let accession = accession.trim().to_string();
        if line.trim_end().ends_with('*') {
            representative = Some(accession.clone());
        }
        members.push(accession);
    }
    flush(&mut members, &mut representative);
    removed
}
