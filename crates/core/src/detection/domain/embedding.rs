//! Fixed-length face identity vectors and the vector math used on them.

use serde::{Deserialize, Serialize};

use crate::shared::constants::NORM_EPSILON;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.0
            .iter()
            .map(|x| (*x as f64) * (*x as f64))
            .sum::<f64>()
            .sqrt()
    }

    /// Scales to unit length unless the norm is at or below [`NORM_EPSILON`],
    /// in which case the vector is returned unchanged.
    pub fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > NORM_EPSILON {
            for x in self.0.iter_mut() {
                *x = (*x as f64 / norm) as f32;
            }
        }
        self
    }

    pub fn dot(&self, other: &Embedding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (*a as f64) * (*b as f64))
            .sum()
    }

    /// Cosine distance `1 - a·b`; assumes both vectors are normalized.
    pub fn cosine_distance(&self, other: &Embedding) -> f64 {
        1.0 - self.dot(other)
    }

    /// Element-wise mean. `None` for an empty input or mismatched lengths.
    pub fn mean<'a, I>(embeddings: I) -> Option<Embedding>
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut iter = embeddings.into_iter();
        let first = iter.next()?;
        let mut sum: Vec<f64> = first.0.iter().map(|x| *x as f64).collect();
        let mut count = 1usize;

        for e in iter {
            if e.len() != sum.len() {
                return None;
            }
            for (acc, x) in sum.iter_mut().zip(e.0.iter()) {
                *acc += *x as f64;
            }
            count += 1;
        }

        Some(Embedding(
            sum.into_iter().map(|s| (s / count as f64) as f32).collect(),
        ))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_normalized_unit_vector() {
        let v = emb(&[3.0, 4.0]).normalized();
        assert_relative_eq!(v.as_slice()[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v.as_slice()[1], 0.8, epsilon = 1e-6);
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalized_zero_vector_unchanged() {
        let v = emb(&[0.0, 0.0, 0.0]).normalized();
        assert_eq!(v, emb(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_normalized_tiny_norm_unchanged() {
        let tiny = emb(&[1e-7, 0.0]);
        assert_eq!(tiny.clone().normalized(), tiny);
    }

    #[test]
    fn test_cosine_distance_identical_is_zero() {
        let a = emb(&[0.6, 0.8]);
        assert_relative_eq!(a.cosine_distance(&a), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal_is_one() {
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 1.0]);
        assert_relative_eq!(a.cosine_distance(&b), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mean_element_wise() {
        let a = emb(&[1.0, 2.0]);
        let b = emb(&[3.0, 6.0]);
        let m = Embedding::mean([&a, &b]).unwrap();
        assert_eq!(m, emb(&[2.0, 4.0]));
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert!(Embedding::mean(std::iter::empty()).is_none());
    }

    #[test]
    fn test_mean_length_mismatch_is_none() {
        let a = emb(&[1.0, 2.0]);
        let b = emb(&[1.0]);
        assert!(Embedding::mean([&a, &b]).is_none());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&emb(&[0.5, -1.0])).unwrap();
        assert_eq!(json, "[0.5,-1.0]");
    }
}
