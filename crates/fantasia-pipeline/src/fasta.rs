//! FASTA sequence loader.
//!
//! Parses FASTA input into validated [`SequenceRecord`]s, applying the
//! duplicate-accession policy and the `length_filter`. Invalid records
//! (empty sequence, bad alphabet) fail the load with the offending accession
//! named; over-length records are dropped and logged, not erred.

use std::collections::HashMap;
use std::path::Path;

use fantasia_core::config::DuplicatePolicy;
use fantasia_core::types::SequenceRecord;
use fantasia_core::CoreError;

use crate::error::PipelineResult;

/// Result of loading and filtering a FASTA input.
#[derive(Debug, Clone, Default)]
pub struct LoadedSet {
    /// Validated records in input order
    pub records: Vec<SequenceRecord>,
    /// Records dropped because they exceeded `length_filter`
    pub length_filtered: usize,
    /// Duplicate accessions replaced under `last_wins`
    pub duplicates_replaced: usize,
}

/// Parse FASTA text into records, applying the duplicate policy.
///
/// The accession is the first whitespace-delimited token of the header line.
/// Under [`DuplicatePolicy::LastWins`] a repeated accession replaces the
/// earlier record in place, preserving first-occurrence order so package
/// partitioning stays deterministic.
///
/// # Errors
///
/// - [`CoreError::DuplicateAccession`] under [`DuplicatePolicy::Error`]
/// - [`CoreError::InvalidSequence`] for empty or bad-alphabet sequences
pub fn parse_fasta(input: &str, policy: DuplicatePolicy) -> PipelineResult<LoadedSet> {
    fn flush(
        header: Option<String>,
        sequence: &mut String,
        set: &mut LoadedSet,
        positions: &mut HashMap<String, usize>,
        policy: DuplicatePolicy,
    ) -> PipelineResult<()> {
        let Some(accession) = header else {
            sequence.clear();
            return Ok(());
        };
        let record = SequenceRecord::new(accession, sequence)?;
        sequence.clear();

        if let Some(&pos) = positions.get(&record.accession) {
            match policy {
                DuplicatePolicy::Error => {
                    return Err(CoreError::DuplicateAccession {
                        accession: record.accession,
                    }
                    .into())
                }
                DuplicatePolicy::LastWins => {
                    tracing::warn!(
                        accession = %record.accession,
                        "duplicate accession, keeping last occurrence"
                    );
                    set.records[pos] = record;
                    set.duplicates_replaced += 1;
                }
            }
        } else {
            positions.insert(record.accession.clone(), set.records.len());
            set.records.push(record);
        }
        Ok(())
    }

    let mut set = LoadedSet::default();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut header: Option<String> = None;
    let mut sequence = String::new();

    for line in input.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('>') {
            flush(header.take(), &mut sequence, &mut set, &mut positions, policy)?;
            let accession = rest.split_whitespace().next().unwrap_or("").to_string();
            if accession.is_empty() {
                return Err(CoreError::InvalidSequence {
                    accession: "<unnamed>".to_string(),
                    reason: "FASTA header with no accession".to_string(),
                }
                .into());
            }
            header = Some(accession);
        } else {
            sequence.push_str(line.trim());
        }
    }
    flush(header.take(), &mut sequence, &mut set, &mut positions, policy)?;

    Ok(set)
}

/// Load a FASTA file and apply `length_filter`.
///
/// # Errors
///
/// I/O errors reading the file, plus everything [`parse_fasta`] raises.
pub fn load_fasta_file(
    path: &Path,
    policy: DuplicatePolicy,
    length_filter: Option<usize>,
) -> PipelineResult<LoadedSet> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::ConfigError(format!("failed to read input FASTA {}: {e}", path.display()))
    })?;
    let mut set = parse_fasta(&content, policy)?;

    if let Some(max_length) = length_filter {
        let before = set.records.len();
        set.records.retain(|record| {
            let keep = record.length <= max_length;
            if !keep {
                tracing::info!(
                    accession = %record.accession,
                    length = record.length,
                    max_length,
                    "dropping over-length sequence"
                );
            }
            keep
        });
        set.length_filtered = before - set.records.len();
    }

    tracing::info!(
        loaded = set.records.len(),
        length_filtered = set.length_filtered,
        duplicates_replaced = set.duplicates_replaced,
        "FASTA input loaded"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = ">Q1 some description\nMKTAYIAK\n>Q2\nMVLS\nPADK\n";

    #[test]
    fn parses_records_with_multiline_sequences() {
        let set = parse_fasta(SIMPLE, DuplicatePolicy::Error).unwrap();
        assert_eq!(set.records.len(), 2);
        assert_eq!(set.records[0].accession, "Q1");
        assert_eq!(set.records[1].sequence, "MVLSPADK");
        assert_eq!(set.records[1].length, 8);
    }

    #[test]
    fn header_description_is_not_part_of_accession() {
        let set = parse_fasta(SIMPLE, DuplicatePolicy::Error).unwrap();
        assert_eq!(set.records[0].accession, "Q1");
    }

    #[test]
    fn duplicate_accession_errors_by_default() {
        let input = ">Q1\nMKT\n>Q1\nMVL\n";
        let err = parse_fasta(input, DuplicatePolicy::Error).unwrap_err();
        assert!(err.to_string().contains("Q1"));
    }

    #[test]
    fn last_wins_replaces_in_place() {
        let input = ">Q1\nMKT\n>Q2\nAAA\n>Q1\nMVL\n";
        let set = parse_fasta(input, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(set.records.len(), 2);
        assert_eq!(set.records[0].accession, "Q1");
        assert_eq!(set.records[0].sequence, "MVL");
        assert_eq!(set.duplicates_replaced, 1);
    }

    #[test]
    fn invalid_alphabet_names_the_accession() {
        let input = ">Q_BAD\nMK9T\n";
        let err = parse_fasta(input, DuplicatePolicy::Error).unwrap_err();
        assert!(err.to_string().contains("Q_BAD"));
    }

    #[test]
    fn length_filter_drops_and_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(file, ">Q1\nMKTAYIAK\n>Q2\n{}\n", "A".repeat(100)).unwrap();

        let set = load_fasta_file(file.path(), DuplicatePolicy::Error, Some(50)).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.length_filtered, 1);
    }

    #[test]
    fn late_duplicate_replaces_its_first_occurrence_among_many() {
        let mut input: String = (0..200).map(|i| format!(">Q{i}\nMKTAYIAK\n")).collect();
        input.push_str(">Q7\nMVLSPADK\n");
        let set = parse_fasta(&input, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(set.records.len(), 200);
        assert_eq!(set.duplicates_replaced, 1);
        assert_eq!(set.records[7].accession, "Q7");
        assert_eq!(set.records[7].sequence, "MVLSPADK");
    }

    #[test]
    fn loader_count_identity_without_filters() {
        // Property: output count equals input record count when nothing is
        // filtered.
        let input: String = (0..25).map(|i| format!(">Q{i}\nMKTAYIAK\n")).collect();
        let set = parse_fasta(&input, DuplicatePolicy::Error).unwrap();
        assert_eq!(set.records.len(), 25);
    }
}
