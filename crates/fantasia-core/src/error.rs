//! Error types for fantasia-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the core crate, along with the [`CoreResult<T>`] type alias. Pipeline
//! stages wrap these into stage-tagged errors; the taxonomy here captures the
//! failure modes that originate in parsing, validation, and configuration.

use thiserror::Error;

/// Top-level error type for core operations.
///
/// # Example
///
/// ```rust
/// use fantasia_core::CoreError;
///
/// let error = CoreError::DuplicateAccession {
///     accession: "P12345".to_string(),
/// };
/// assert!(error.to_string().contains("P12345"));
/// ```
#[derive(Debug, Error)]
pub enum CoreError {
    /// The same accession appeared more than once in the input.
    ///
    /// Raised only under [`DuplicatePolicy::Error`]; under `LastWins` the
    /// earlier record is silently replaced and counted in the run summary.
    ///
    /// [`DuplicatePolicy::Error`]: crate::config::DuplicatePolicy::Error
    #[error("Duplicate accession in input: {accession}")]
    DuplicateAccession {
        /// The accession that occurred more than once
        accession: String,
    },

    /// A sequence failed alphabet or length validation.
    ///
    /// # When This Occurs
    ///
    /// - Zero-length sequence
    /// - Characters outside the amino-acid alphabet
    #[error("Invalid sequence for {accession}: {reason}")]
    InvalidSequence {
        /// Accession of the offending record
        accession: String,
        /// Description of the validation failure
        reason: String,
    },

    /// An embedding vector did not match the model's expected dimension.
    #[error("Invalid embedding dimension for {model_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Model whose dimension contract was violated
        model_id: crate::types::ModelId,
        /// Expected vector length
        expected: usize,
        /// Actual vector length provided
        actual: usize,
    },

    /// A model name in the configuration is not a known model id.
    #[error("Unknown embedding model: {name}")]
    UnknownModel {
        /// The unrecognized model key
        name: String,
    },

    /// Configuration is invalid or missing.
    ///
    /// Raised before any stage runs; the run never starts with a bad config.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error while reading input or writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CoreError {
    fn from(e: config::ConfigError) -> Self {
        CoreError::ConfigError(e.to_string())
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
