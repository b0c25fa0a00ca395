//! FANTASIA Core Library
//!
//! Provides the domain types, run configuration, and error types shared by
//! every stage of the annotation-transfer pipeline.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`SequenceRecord`, `WorkPackage`, `EmbeddingVector`,
//!   `NeighborHit`, `AnnotationCall`, `RunSummary`)
//! - The embedding model registry (`ModelId`)
//! - The immutable run configuration (`RunConfig`), constructed once at
//!   startup and threaded through every component constructor
//! - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use fantasia_core::types::{ModelId, SequenceRecord};
//!
//! let record = SequenceRecord::new("P12345", "MKTAYIAKQR").unwrap();
//! assert_eq!(record.length, 10);
//! assert_eq!(ModelId::ProtT5.dimension(), 1024);
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::RunConfig;
pub use error::{CoreError, CoreResult};
pub use types::{
    AnnotationCall, DistanceMetric, EmbeddingVector, ModelId, NeighborHit, ReferenceAnnotation,
    RunSummary, SequenceRecord, WorkPackage,
};
