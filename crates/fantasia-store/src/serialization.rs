//! Binary serialization for embedding vectors.
//!
//! Vectors are stored as raw little-endian f32 bytes for maximum read
//! performance on the brute-force scan path; annotations are stored as JSON
//! since they are small and schema-flexible.

use crate::error::{StoreError, StoreResult};

/// Encode a vector as raw little-endian f32 bytes.
#[must_use]
pub fn serialize_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode raw little-endian f32 bytes back into a vector.
///
/// # Errors
///
/// `StoreError::Corrupt` if the byte count is not a multiple of 4.
pub fn deserialize_vector(key: &str, bytes: &[u8]) -> StoreResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::Corrupt {
            key: key.to_string(),
            message: format!("vector byte length {} not divisible by 4", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_values() {
        let vector = vec![0.0f32, -1.5, 3.25, f32::MIN_POSITIVE];
        let bytes = serialize_vector(&vector);
        assert_eq!(bytes.len(), 16);
        assert_eq!(deserialize_vector("k", &bytes).unwrap(), vector);
    }

    #[test]
    fn truncated_bytes_are_corrupt() {
        let bytes = serialize_vector(&[1.0, 2.0]);
        let err = deserialize_vector("prot_t5/Q1", &bytes[..7]).unwrap_err();
        assert!(err.to_string().contains("prot_t5/Q1"));
    }
}
