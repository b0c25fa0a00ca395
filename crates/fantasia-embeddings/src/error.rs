//! Error types for the embedding pipeline.

use thiserror::Error;

use fantasia_core::types::ModelId;

/// Errors raised while embedding and persisting work packages.
///
/// Per-sequence failures ([`EmbeddingError::SequenceFailed`]) are recorded
/// and absorbed; they never abort a package. Transport and storage failures
/// are stage-fatal and propagate to the coordinator.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The model could not embed one sequence.
    ///
    /// Non-fatal: the worker records the failure with accession context and
    /// continues with the rest of the package.
    #[error("Embedding failed for {accession} under {model_id}: {reason}")]
    SequenceFailed {
        /// Sequence that failed
        accession: String,
        /// Model it failed under
        model_id: ModelId,
        /// Failure description from the model
        reason: String,
    },

    /// A package carried records addressed to a different model pool.
    ///
    /// The partitioner guarantees single-model packages; seeing this means a
    /// routing bug, not bad input.
    #[error("Package {package_id} addressed to {expected} was delivered to a {found} worker")]
    MixedPackage {
        /// Offending package
        package_id: u64,
        /// Model the package was built for
        expected: ModelId,
        /// Model pool that received it
        found: ModelId,
    },

    /// Queue operation failed (missing queue, broker gone).
    ///
    /// Fatal: the coordinator surfaces connection failures immediately.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Vector store write failed.
    ///
    /// Fatal: the package is not acknowledged, so the broker will redeliver
    /// it if the run survives.
    #[error(transparent)]
    Store(#[from] fantasia_store::StoreError),

    /// Embedding output violated the model's dimension contract.
    #[error(transparent)]
    Core(#[from] fantasia_core::CoreError),
}

/// Result alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
