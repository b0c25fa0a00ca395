//! FANTASIA Embedding Pipeline
//!
//! Converts work packages of protein sequences into persisted embedding
//! vectors, one worker pool per enabled model.
//!
//! # Architecture
//!
//! - [`SequenceEmbedder`]: trait for the injected embedding capability
//!   (sequence → fixed-dimension vector, per-item failure reported
//!   individually)
//! - [`HashEmbedder`]: deterministic hash-based embedder for tests and runs
//!   without model weights
//! - [`MemoryQueueBroker`] / [`TaskQueue`]: durable named point-to-point
//!   queues with manual acknowledgment and at-least-once redelivery
//! - [`ModelWorkerPool`]: bounded-concurrency package consumer that embeds
//!   and persists, acknowledging only after every record was attempted

pub mod error;
pub mod hash;
pub mod provider;
pub mod queue;
pub mod worker;

pub use error::{EmbeddingError, EmbeddingResult};
pub use hash::HashEmbedder;
pub use provider::SequenceEmbedder;
pub use queue::{MemoryQueueBroker, PackageConsumer, PackageDelivery, TaskQueue};
pub use worker::{ModelWorkerPool, PoolReport};
