//! RocksDB-backed vector store.
//!
//! Persistent backend: query embeddings written during a run outlive it and
//! become part of the growing embedding store; reference embeddings and their
//! annotations are provisioned once by `initialize`.
//!
//! # Column Families
//!
//! | Column Family | Key | Value |
//! |---------------|-----|-------|
//! | `query_vectors` | `model \x1f accession` | timestamp millis + raw f32 LE |
//! | `reference_vectors` | `tag \x1f model \x1f accession` | timestamp millis + raw f32 LE |
//! | `reference_annotations` | `tag \x1f model \x1f accession` | JSON `Vec<ReferenceAnnotation>` |
//!
//! The `\x1f` (unit separator) keeps accessions containing `|` or `/` from
//! colliding with the key structure.
//!
//! Nearest-neighbor search is a brute-force scan over the tag+model prefix.
//! Reference sets are bounded (one vector per annotated reference protein per
//! model), so the scan stays linear in the reference count.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};

use fantasia_core::types::{DistanceMetric, EmbeddingVector, ModelId, ReferenceAnnotation};

use crate::error::{StoreError, StoreResult};
use crate::serialization::{deserialize_vector, serialize_vector};
use crate::store::{rank_neighbors, Neighbor, UpsertOutcome, VectorStore};

/// Column family name constants.
pub mod cf_names {
    /// Query embeddings computed during runs.
    pub const QUERY_VECTORS: &str = "query_vectors";
    /// Pre-populated reference embeddings.
    pub const REFERENCE_VECTORS: &str = "reference_vectors";
    /// GO annotations attached to reference embeddings.
    pub const REFERENCE_ANNOTATIONS: &str = "reference_annotations";

    /// All column families, in open order.
    pub const ALL: &[&str] = &[QUERY_VECTORS, REFERENCE_VECTORS, REFERENCE_ANNOTATIONS];
}

const KEY_SEP: char = '\x1f';

/// RocksDB implementation of [`VectorStore`].
///
/// # Thread Safety
///
/// RocksDB's `DB` is internally thread-safe; all methods take `&self` and the
/// struct can be shared across worker tasks via `Arc`.
pub struct RocksDbVectorStore {
    db: DB,
}

impl RocksDbVectorStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the database cannot be opened — surfaced
    /// by the coordinator as a fatal transport error.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = cf_names::ALL
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> StoreResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Unavailable(format!("missing column family {name}")))
    }

    fn query_key(model_id: ModelId, accession: &str) -> String {
        format!("{}{KEY_SEP}{}", model_id.as_str(), accession)
    }

    fn reference_key(tag: &str, model_id: ModelId, accession: &str) -> String {
        format!("{tag}{KEY_SEP}{}{KEY_SEP}{}", model_id.as_str(), accession)
    }

    fn encode_value(vector: &EmbeddingVector) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + vector.vector.len() * 4);
        bytes.extend_from_slice(&vector.created_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&serialize_vector(&vector.vector));
        bytes
    }

    fn decode_value(key: &str, bytes: &[u8]) -> StoreResult<(DateTime<Utc>, Vec<f32>)> {
        if bytes.len() < 8 {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                message: format!("value too short: {} bytes", bytes.len()),
            });
        }
        let millis = i64::from_le_bytes(bytes[..8].try_into().expect("checked length"));
        let created_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| StoreError::Corrupt {
                key: key.to_string(),
                message: format!("invalid timestamp {millis}"),
            })?;
        Ok((created_at, deserialize_vector(key, &bytes[8..])?))
    }

    fn count_prefix(&self, cf_name: &str, prefix: &str) -> StoreResult<usize> {
        let cf = self.cf(cf_name)?;
        let mut count = 0;
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, _) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}

impl VectorStore for RocksDbVectorStore {
    fn upsert_vector(&self, vector: &EmbeddingVector) -> StoreResult<UpsertOutcome> {
        let key = Self::query_key(vector.model_id, &vector.accession);
        let cf = self.cf(cf_names::QUERY_VECTORS)?;

        let outcome = match self.db.get_cf(cf, key.as_bytes())? {
            Some(existing) => {
                let (_, stored) = Self::decode_value(&key, &existing)?;
                if stored == vector.vector {
                    tracing::debug!(
                        accession = %vector.accession,
                        model = %vector.model_id,
                        "embedding already present, skipping"
                    );
                    return Ok(UpsertOutcome::Unchanged);
                }
                UpsertOutcome::Replaced
            }
            None => UpsertOutcome::Inserted,
        };

        self.db
            .put_cf(cf, key.as_bytes(), Self::encode_value(vector))
            .map_err(|e| StoreError::WriteFailed {
                key,
                message: e.to_string(),
            })?;
        Ok(outcome)
    }

    fn get_vector(
        &self,
        accession: &str,
        model_id: ModelId,
    ) -> StoreResult<Option<EmbeddingVector>> {
        let key = Self::query_key(model_id, accession);
        let cf = self.cf(cf_names::QUERY_VECTORS)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => {
                let (created_at, vector) = Self::decode_value(&key, &bytes)?;
                Ok(Some(EmbeddingVector {
                    accession: accession.to_string(),
                    model_id,
                    vector,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    fn insert_reference(
        &self,
        tag: &str,
        vector: &EmbeddingVector,
        annotations: &[ReferenceAnnotation],
    ) -> StoreResult<()> {
        let key = Self::reference_key(tag, vector.model_id, &vector.accession);
        let vectors_cf = self.cf(cf_names::REFERENCE_VECTORS)?;
        let annotations_cf = self.cf(cf_names::REFERENCE_ANNOTATIONS)?;

        let annotation_bytes =
            serde_json::to_vec(annotations).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.db
            .put_cf(vectors_cf, key.as_bytes(), Self::encode_value(vector))
            .map_err(|e| StoreError::WriteFailed {
                key: key.clone(),
                message: e.to_string(),
            })?;
        self.db
            .put_cf(annotations_cf, key.as_bytes(), annotation_bytes)
            .map_err(|e| StoreError::WriteFailed {
                key,
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn nearest_neighbors(
        &self,
        tag: &str,
        query: &[f32],
        model_id: ModelId,
        metric: DistanceMetric,
        limit: usize,
        max_distance: f32,
    ) -> StoreResult<Vec<Neighbor>> {
        let prefix = format!("{tag}{KEY_SEP}{}{KEY_SEP}", model_id.as_str());
        let vectors_cf = self.cf(cf_names::REFERENCE_VECTORS)?;
        let annotations_cf = self.cf(cf_names::REFERENCE_ANNOTATIONS)?;

        let mut candidates = Vec::new();
        for item in self.db.iterator_cf(
            vectors_cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        ) {
            let (key_bytes, value) = item?;
            if !key_bytes.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8_lossy(&key_bytes).into_owned();
            let accession = key[prefix.len()..].to_string();

            let (_, vector) = Self::decode_value(&key, &value)?;
            let distance = metric.distance(query, &vector);
            if distance > max_distance {
                continue;
            }

            let annotations = match self.db.get_cf(annotations_cf, &key_bytes)? {
                Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                    key: key.clone(),
                    message: format!("annotation decode failed: {e}"),
                })?,
                None => Vec::new(),
            };

            candidates.push(Neighbor {
                reference_accession: accession,
                distance,
                annotations,
            });
        }

        Ok(rank_neighbors(candidates, limit))
    }

    fn vector_count(&self, model_id: ModelId) -> StoreResult<usize> {
        self.count_prefix(
            cf_names::QUERY_VECTORS,
            &format!("{}{KEY_SEP}", model_id.as_str()),
        )
    }

    fn reference_count(&self, tag: &str, model_id: ModelId) -> StoreResult<usize> {
        self.count_prefix(
            cf_names::REFERENCE_VECTORS,
            &format!("{tag}{KEY_SEP}{}{KEY_SEP}", model_id.as_str()),
        )
    }
}
