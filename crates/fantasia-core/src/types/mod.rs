//! Core domain types for the annotation-transfer pipeline.

mod annotation;
mod embedding;
mod metric;
mod model_id;
mod package;
mod sequence;
mod summary;

pub use annotation::{AnnotationCall, NeighborHit, ReferenceAnnotation};
pub use embedding::EmbeddingVector;
pub use metric::DistanceMetric;
pub use model_id::ModelId;
pub use package::WorkPackage;
pub use sequence::{SequenceRecord, AMINO_ACID_ALPHABET};
pub use summary::{EmbeddingFailure, ExclusionReason, RunSummary};
