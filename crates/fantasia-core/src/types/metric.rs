//! Distance metrics for nearest-neighbor queries.

use serde::{Deserialize, Serialize};

/// Distance metric used by the vector store's nearest-neighbor queries.
///
/// The metric is a run-wide setting; per-model `distance_threshold` values
/// are interpreted in the units of this metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance, `1 - cos(a, b)`. Vector-store operator `<=>`.
    #[default]
    Cosine,
    /// Euclidean (L2) distance. Vector-store operator `<->`.
    Euclidean,
}

impl DistanceMetric {
    /// Operator token understood by pgvector-style stores.
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::Euclidean => "<->",
        }
    }

    /// Compute the distance between two vectors under this metric.
    ///
    /// Degenerate inputs (mismatched dimensions, zero-norm vectors under
    /// cosine) yield `f32::INFINITY`, which places them beyond any finite
    /// threshold rather than erroring mid-search.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return f32::INFINITY;
        }
        match self {
            Self::Cosine => cosine_distance(a, b),
            Self::Euclidean => euclidean_distance(a, b),
        }
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::INFINITY;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_of_identical_vectors_is_zero() {
        let v = vec![0.3, -0.7, 0.2];
        let d = DistanceMetric::Cosine.distance(&v, &v);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_of_orthogonal_vectors_is_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let d = DistanceMetric::Cosine.distance(&a, &b);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn euclidean_distance_matches_pythagoras() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((DistanceMetric::Euclidean.distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dimensions_yield_infinity() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert!(DistanceMetric::Cosine.distance(&a, &b).is_infinite());
        assert!(DistanceMetric::Euclidean.distance(&a, &b).is_infinite());
    }

    #[test]
    fn zero_norm_vector_yields_infinity_under_cosine() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert!(DistanceMetric::Cosine.distance(&a, &b).is_infinite());
    }

    #[test]
    fn operators_match_pgvector_tokens() {
        assert_eq!(DistanceMetric::Cosine.operator(), "<=>");
        assert_eq!(DistanceMetric::Euclidean.operator(), "<->");
    }
}
