//! Exact nearest-neighbor index over row-major `f32` storage.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use docqa_core::error::{Error, Result};

use crate::distance::euclidean_distance_squared;

/// One search hit: the stored position and its squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    /// Ascending distance, then ascending position.
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

/// Brute-force L2 index. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Store `vectors` in insertion order.
    pub fn build<I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[f32]>,
    {
        let mut vectors = vectors.into_iter();
        let first = vectors.next().ok_or(Error::EmptyCorpus)?;
        let dim = first.as_ref().len();
        if dim == 0 {
            return Err(Error::InvalidParameter("vectors must have at least one dimension".into()));
        }
        let mut data = Vec::with_capacity(dim * (1 + vectors.size_hint().0));
        data.extend_from_slice(first.as_ref());
        for v in vectors {
            let v = v.as_ref();
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
            data.extend_from_slice(v);
        }
        tracing::debug!(vectors = data.len() / dim, dim, "built flat index");
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim).nth(position)
    }

    /// Up to `min(k, len)` nearest neighbors, closest first, ties resolved by lower position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(vec![]);
        }
        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, v)| Neighbor { position, distance: euclidean_distance_squared(v, query) })
            .collect();
        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, Neighbor::rank);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(Neighbor::rank);
        Ok(neighbors)
    }
}
