//! Pure vector math over `f32` slices.
//!
//! All two-vector operations check dimensions up front and return
//! [`FathomError::DimensionMismatch`] when the operands disagree.

use serde::{Deserialize, Serialize};

use crate::error::{FathomError, Result};

/// Distance metric used for nearest-neighbor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`; 0 means identical direction.
    #[default]
    Cosine,
    /// Raw Euclidean (L2) distance.
    Euclidean,
}

impl DistanceMetric {
    /// Distance between two vectors under this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        match self {
            DistanceMetric::Cosine => Ok(1.0 - cosine_similarity(a, b)?),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }
}

/// A nearest-neighbor hit: candidate index plus distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the candidate slice.
    pub index: usize,
    /// Distance under the requested metric (ascending = closer).
    pub distance: f32,
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(FathomError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Dot product of two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Euclidean (L2) magnitude of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit magnitude. A zero vector is returned unchanged
/// (copied), never divided by zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mag = magnitude(v);
    if mag == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / mag).collect()
}

/// Cosine similarity in `[-1, 1]`. Returns 0 (not NaN) when either operand
/// has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot_product(a, b)? / (mag_a * mag_b))
}

/// Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt())
}

/// Component-wise mean of a non-empty set of same-dimension vectors.
pub fn average(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| FathomError::invalid_argument("cannot average zero vectors"))?;
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        check_dimensions(first, v)?;
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += x;
        }
    }
    let n = vectors.len() as f32;
    for acc in sum.iter_mut() {
        *acc /= n;
    }
    Ok(sum)
}

/// Find the `k` candidates nearest to `query` under `metric`.
///
/// Every candidate is scored; results are sorted ascending by distance and
/// truncated to `k`. When `k` exceeds the candidate count, all candidates
/// are returned.
pub fn find_nearest_neighbors(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    metric: DistanceMetric,
) -> Result<Vec<Neighbor>> {
    let mut neighbors = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let distance = metric.distance(query, candidate)?;
        neighbors.push(Neighbor { index, distance });
    }
    neighbors.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(k);
    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let a = normalize(&[3.0, 4.0]);
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let a = normalize(&[1.0, 2.0, 2.0]);
        let neg: Vec<f32> = a.iter().map(|x| -x).collect();
        let sim = cosine_similarity(&a, &neg).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_exactly_zero() {
        let zero = vec![0.0; 3];
        let a = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &a).unwrap(), 0.0);
    }

    #[test]
    fn normalize_yields_unit_magnitude() {
        let v = vec![0.3, -2.0, 7.5, 0.01];
        let n = normalize(&v);
        assert!((magnitude(&n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        let zero = vec![0.0; 4];
        let n = normalize(&zero);
        assert_eq!(n, zero);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            dot_product(&a, &b),
            Err(FathomError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(FathomError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            euclidean_distance(&a, &b),
            Err(FathomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn average_of_vectors() {
        let vs = vec![vec![1.0, 3.0], vec![3.0, 5.0]];
        assert_eq!(average(&vs).unwrap(), vec![2.0, 4.0]);
        assert!(average(&[]).is_err());
        assert!(average(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn nearest_neighbors_sorted_ascending() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]];
        let hits = find_nearest_neighbors(&query, &candidates, 2, DistanceMetric::Cosine).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 1);
        assert!(hits[0].distance < 1e-6);
        assert_eq!(hits[1].index, 2);
    }

    #[test]
    fn nearest_neighbors_k_exceeds_candidates() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0]];
        let hits =
            find_nearest_neighbors(&query, &candidates, 10, DistanceMetric::Euclidean).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
