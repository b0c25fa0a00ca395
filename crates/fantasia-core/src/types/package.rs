//! Work packages routed through the embedding task queues.

use serde::{Deserialize, Serialize};

use super::{ModelId, SequenceRecord};

/// A bounded batch of sequences destined for one model's worker pool.
///
/// Created by the partitioner, consumed exactly once by one worker of the
/// matching pool. Delivery is at-least-once, so consumers must be idempotent;
/// the vector store's upsert contract makes redelivery safe.
///
/// `package_id` is the zero-based index of the package within its model's
/// partition, which makes package assignment deterministic for a given input
/// and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackage {
    /// Index of this package within the model's partition
    pub package_id: u64,
    /// Model pool this package is addressed to
    pub model_id: ModelId,
    /// Records in stable input order
    pub records: Vec<SequenceRecord>,
}

impl WorkPackage {
    /// Create a package for `model_id` holding `records`.
    #[must_use]
    pub fn new(package_id: u64, model_id: ModelId, records: Vec<SequenceRecord>) -> Self {
        Self {
            package_id,
            model_id,
            records,
        }
    }

    /// Number of records in the package.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the package carries no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
