//! Pipeline error type, tagged with the originating stage.
//!
//! Stage-fatal errors abort the run and are surfaced to the operator with
//! the stage named; per-record errors never reach this type — they are
//! absorbed where they occur and reported through the run summary.

use thiserror::Error;

/// Pipeline stages, used to name where a fatal error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// FASTA loading and validation
    Load,
    /// Redundancy filtering
    Redundancy,
    /// Package partitioning and queue publication
    Partition,
    /// Embedding worker pools
    Embed,
    /// Nearest-neighbor search
    Search,
    /// Cross-model aggregation
    Aggregate,
    /// Output serialization
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Redundancy => "redundancy",
            Self::Partition => "partition",
            Self::Embed => "embed",
            Self::Search => "search",
            Self::Aggregate => "aggregate",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input or configuration error from the core layer.
    #[error(transparent)]
    Core(#[from] fantasia_core::CoreError),

    /// The external clustering tool failed while redundancy filtering was
    /// enabled. With `redundancy_filter = 0` the tool is never invoked, so
    /// this error cannot occur on such runs.
    #[error("External tool '{tool}' failed: {message}")]
    ExternalTool {
        /// Tool binary name
        tool: String,
        /// What went wrong (missing binary, non-zero exit, unreadable output)
        message: String,
    },

    /// Queue or worker-pool failure.
    #[error(transparent)]
    Embedding(#[from] fantasia_embeddings::EmbeddingError),

    /// Vector store failure on the search path.
    #[error(transparent)]
    Store(#[from] fantasia_store::StoreError),

    /// Every sequence failed to embed on every enabled model.
    #[error("Embedding failed for all {total} sequences on every enabled model")]
    TotalEmbeddingFailure {
        /// Number of sequences that entered the embedding stage
        total: usize,
    },

    /// Artifact I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure.
    #[error("Output serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// The stage this error is surfaced under in operator-facing messages.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Core(_) => Stage::Load,
            Self::ExternalTool { .. } => Stage::Redundancy,
            Self::Embedding(_) | Self::TotalEmbeddingFailure { .. } => Stage::Embed,
            Self::Store(_) => Stage::Search,
            Self::Io(_) | Self::Csv(_) => Stage::Write,
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
