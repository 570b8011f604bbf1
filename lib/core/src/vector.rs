use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A dense embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Reject embeddings that cannot be scored: wrong length or NaN/inf.
    pub fn validate(data: &[f32], expected_dim: usize) -> Result<()> {
        if data.len() != expected_dim {
            return Err(Error::InvalidDimension {
                expected: expected_dim,
                actual: data.len(),
            });
        }
        if !data.iter().all(|x| x.is_finite()) {
            return Err(Error::NonFiniteEmbedding);
        }
        Ok(())
    }

    /// Scale to unit length in place; zero vectors are left untouched
    #[inline]
    pub fn normalize(&mut self) {
        let norm = crate::simd::norm(&self.data);
        if norm > f32::EPSILON {
            let inv_norm = 1.0 / norm;
            for x in &mut self.data {
                *x *= inv_norm;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }

    /// Bitwise equality. This is how the document store matches an
    /// embedding by value, so `-0.0` and `0.0` are different here.
    #[inline]
    pub fn bit_eq(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
    }
}
