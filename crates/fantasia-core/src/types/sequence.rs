//! Protein sequence records.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Characters accepted in input sequences.
///
/// The 20 standard residues plus the IUPAC ambiguity codes (B, J, Z, X) and
/// the rare residues selenocysteine (U) and pyrrolysine (O). A trailing `*`
/// stop marker is tolerated by the loader and stripped before validation.
pub const AMINO_ACID_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWYBJZXUO";

/// A single protein sequence as loaded from the input FASTA.
///
/// Immutable once constructed. `length` always equals the character count of
/// `sequence`, and the sequence is stored uppercase.
///
/// # Example
///
/// ```rust
/// use fantasia_core::types::SequenceRecord;
///
/// let rec = SequenceRecord::new("sp|P69905|HBA_HUMAN", "mvlspadktnvk").unwrap();
/// assert_eq!(rec.length, 12);
/// assert_eq!(rec.sequence, "MVLSPADKTNVK");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// Unique identifier within a run (FASTA header id)
    pub accession: String,
    /// Uppercase amino-acid sequence
    pub sequence: String,
    /// Residue count
    pub length: usize,
}

impl SequenceRecord {
    /// Build a validated record.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidSequence`] if the sequence is empty or contains a
    /// character outside [`AMINO_ACID_ALPHABET`]. The error names the
    /// offending accession so it can be reported with context.
    pub fn new(accession: impl Into<String>, sequence: &str) -> CoreResult<Self> {
        let accession = accession.into();
        let sequence = sequence.trim_end_matches('*').to_ascii_uppercase();

        if sequence.is_empty() {
            return Err(CoreError::InvalidSequence {
                accession,
                reason: "zero-length sequence".to_string(),
            });
        }
        if let Some(bad) = sequence.chars().find(|c| !AMINO_ACID_ALPHABET.contains(*c)) {
            return Err(CoreError::InvalidSequence {
                accession,
                reason: format!("character '{bad}' outside amino-acid alphabet"),
            });
        }

        let length = sequence.chars().count();
        Ok(Self {
            accession,
            sequence,
            length,
        })
    }
}
