//! Partitioned vectors.
//!
//! A [`PartitionedVector`] is one process's view of a distributed array: a dense, owned
//! slice of `local_n` values starting at global offset `first_local_index`, plus the global
//! length. Slices are contiguous and ordered by rank, so `first_local_index` on rank `r` is
//! the sum of `local_n` over ranks `0..r`. Only the owning process ever writes its slice.

use std::ops::Range;

use crate::core::traits::Indexing;
use crate::error::KError;
use crate::parallel::Comm;

/// Slices shorter than this are reduced serially even with the `rayon` feature.
#[cfg(feature = "rayon")]
const PAR_DOT_THRESHOLD: usize = 1 << 14;

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionedVector {
    global_n: usize,
    first_local_index: usize,
    local: Vec<f64>,
}

impl PartitionedVector {
    /// Zero-filled local slice of `local_n` entries at `first_local_index`.
    pub fn new(global_n: usize, local_n: usize, first_local_index: usize) -> Result<Self, KError> {
        Self::from_values(global_n, first_local_index, vec![0.0; local_n])
    }

    /// Wraps already-owned local values.
    pub fn from_values(
        global_n: usize,
        first_local_index: usize,
        local: Vec<f64>,
    ) -> Result<Self, KError> {
        let end = first_local_index
            .checked_add(local.len())
            .ok_or_else(|| KError::InvalidLayout("local range overflows usize".into()))?;
        if end > global_n {
            return Err(KError::InvalidLayout(format!(
                "local range {first_local_index}..{end} exceeds global length {global_n}"
            )));
        }
        Ok(Self { global_n, first_local_index, local })
    }

    /// Collective constructor: every rank contributes its slice and the global length and
    /// offsets are derived from the gathered local lengths.
    pub fn from_local<C: Comm>(comm: &C, local: Vec<f64>) -> Self {
        let counts = comm.all_gather_count(local.len());
        let first_local_index = counts[..comm.rank()].iter().sum();
        let global_n = counts.iter().sum();
        Self { global_n, first_local_index, local }
    }

    pub fn global_n(&self) -> usize {
        self.global_n
    }

    pub fn local_n(&self) -> usize {
        self.local.len()
    }

    pub fn first_local_index(&self) -> usize {
        self.first_local_index
    }

    /// Global indices covered by the local slice.
    pub fn global_range(&self) -> Range<usize> {
        self.first_local_index..self.first_local_index + self.local.len()
    }

    pub fn local(&self) -> &[f64] {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut [f64] {
        &mut self.local
    }

    pub fn get(&self, i: usize) -> Result<f64, KError> {
        self.local
            .get(i)
            .copied()
            .ok_or(KError::OutOfRange { index: i, len: self.local.len() })
    }

    pub fn set(&mut self, i: usize, value: f64) -> Result<(), KError> {
        let len = self.local.len();
        let slot = self.local.get_mut(i).ok_or(KError::OutOfRange { index: i, len })?;
        *slot = value;
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        self.local.fill(value);
    }

    /// Fails with [`KError::DimensionMismatch`] unless both local slices have the same length.
    pub fn check_local_dims(&self, other: &Self) -> Result<(), KError> {
        if self.local.len() != other.local.len() {
            return Err(KError::DimensionMismatch {
                left: self.local.len(),
                right: other.local.len(),
            });
        }
        Ok(())
    }

    /// Local-only dot product of the two slices. Summation order is unspecified.
    pub fn inner_product(&self, other: &Self) -> Result<f64, KError> {
        self.check_local_dims(other)?;
        #[cfg(feature = "rayon")]
        {
            if self.local.len() >= PAR_DOT_THRESHOLD {
                use rayon::prelude::*;
                return Ok(self
                    .local
                    .par_iter()
                    .zip(other.local.par_iter())
                    .map(|(x, y)| x * y)
                    .sum());
            }
        }
        Ok(self.accumulate_unchecked(other, 0.0))
    }

    /// Adds the local products to `acc` strictly in index order.
    ///
    /// The result is bit-identical for identical inputs, which the ring reduction relies on.
    pub fn accumulate_inner_product(&self, other: &Self, acc: f64) -> Result<f64, KError> {
        self.check_local_dims(other)?;
        Ok(self.accumulate_unchecked(other, acc))
    }

    fn accumulate_unchecked(&self, other: &Self, acc: f64) -> f64 {
        self.local
            .iter()
            .zip(&other.local)
            .fold(acc, |acc, (x, y)| acc + x * y)
    }
}

impl Indexing for PartitionedVector {
    fn local_len(&self) -> usize {
        self.local_n()
    }

    fn global_len(&self) -> usize {
        self.global_n
    }
}
