//! Exact nearest-neighbour search by brute force.
//!
//! Vectors are stored row-major in one buffer and addressed by insertion
//! position. Search computes the squared L2 distance to every row, so results
//! are exact; for the few thousand verified images this index holds that is
//! cheaper than maintaining a graph.

use crate::{Error, Result};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Rows at which distance computation fans out over rayon
const PARALLEL_THRESHOLD: usize = 4096;

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the stored vector
    pub position: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

fn by_distance_then_position(a: &Neighbor, b: &Neighbor) -> Ordering {
    OrderedFloat(a.distance)
        .cmp(&OrderedFloat(b.distance))
        .then(a.position.cmp(&b.position))
}

#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    pub fn with_capacity(dim: usize, rows: usize) -> Self {
        Self {
            dim,
            data: Vec::with_capacity(dim * rows),
        }
    }

    /// Append a row; its position is the previous `len()`
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored row at `position`
    pub fn row(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// The `k` closest rows, nearest first, ties broken by position.
    ///
    /// `k` must not exceed `len()`; callers clamp.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.len(),
            });
        }
        let len = self.len();
        if k > len {
            return Err(Error::InvalidK { k, len });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let distance = |(position, row): (usize, &[f32])| Neighbor {
            position,
            distance: crate::simd::l2_squared(query, row),
        };
        let mut hits: Vec<Neighbor> = if len >= PARALLEL_THRESHOLD {
            self.data
                .par_chunks_exact(self.dim)
                .enumerate()
                .map(distance)
                .collect()
        } else {
            self.data
                .chunks_exact(self.dim)
                .enumerate()
                .map(distance)
                .collect()
        };

        if k < len {
            hits.select_nth_unstable_by(k - 1, by_distance_then_position);
            hits.truncate(k);
        }
        hits.sort_unstable_by(by_distance_then_position);
        Ok(hits)
    }
}
