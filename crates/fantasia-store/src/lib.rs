//! FANTASIA Vector Store
//!
//! Holds reference embeddings (pre-populated by `initialize`) and query
//! embeddings computed during a run, and answers metric-configurable
//! nearest-neighbor queries against the annotation-bearing reference set.
//!
//! # Architecture
//!
//! - [`VectorStore`]: storage trait abstraction
//! - [`MemoryVectorStore`]: in-memory implementation for tests and dry runs
//! - [`RocksDbVectorStore`]: persistent RocksDB implementation
//! - `serialization`: raw little-endian f32 vector encoding
//!
//! The write path is idempotent by `(accession, model_id)`: redelivered work
//! packages re-upsert identical content and leave the store observably
//! unchanged. That contract is what makes the queue's at-least-once delivery
//! safe.

pub mod error;
pub mod memory;
pub mod rocks;
pub mod serialization;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryVectorStore;
pub use rocks::RocksDbVectorStore;
pub use store::{Neighbor, UpsertOutcome, VectorStore};
