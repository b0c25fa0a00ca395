//! FANTASIA Annotation-Transfer Pipeline
//!
//! Drives a run end to end: FASTA load → redundancy filter → partition →
//! per-model queues → embedding workers → vector store → similarity search →
//! aggregation → result writer.
//!
//! # Architecture
//!
//! - `fasta`: sequence loader with duplicate and length policies
//! - `redundancy`: injected clustering capability (CD-HIT in production)
//! - `partition`: deterministic work-package partitioner
//! - `search`: per-model nearest-neighbor search producing annotated hits
//! - `aggregate`: cross-model join barrier and score aggregation
//! - `writer`: CSV annotation table and JSON run summary
//! - `coordinator`: sequential front half, fan-out to worker pools, queue
//!   monitor, and final accounting
//!
//! The coordinator owns the run; every component receives the immutable
//! [`RunConfig`] and injected capabilities (embedders, clusterer, store)
//! through its constructor.
//!
//! [`RunConfig`]: fantasia_core::RunConfig

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod fasta;
pub mod partition;
pub mod redundancy;
pub mod search;
pub mod writer;

pub use aggregate::{Aggregator, SearchJoin};
pub use coordinator::{PipelineCoordinator, RunOutcome};
pub use error::{PipelineError, PipelineResult, Stage};
pub use fasta::{load_fasta_file, parse_fasta, LoadedSet};
pub use partition::partition_for_model;
pub use redundancy::{CdHitClusterer, ClusterOutcome, RedundancyClusterer};
pub use search::{AnnotatedHit, SimilaritySearcher};
pub use writer::{ResultWriter, WrittenFiles};
