//! Solver-facing adapters for partitioned vectors.
//!
//! This module implements the [`InnerProduct`] trait for [`PartitionedVector`] on top of a
//! communicator, so generic Krylov loops written against `InnerProduct` get distributed
//! dot products and norms without knowing about the transport.
//!
//! # Modes
//! - [`ReductionMode::Exact`]: local dot product plus one all-reduce.
//! - [`ReductionMode::Sequential`]: rank-ordered ring, bit-reproducible across runs.
//!
//! Approximate strategies need a per-round selector and a mutable hierarchy cache, so they
//! live on [`ReductionContext`](crate::context::ReductionContext) instead.
//!
//! # Failure
//! `InnerProduct` returns plain scalars. A local dimension mismatch is a caller bug and
//! aborts with a panic carrying the [`KError`](crate::error::KError) message.

use crate::core::traits::InnerProduct;
use crate::core::vector::PartitionedVector;
use crate::parallel::Comm;
use crate::reduction::{exact_inner, sequential_inner, sequential_norm};

/// Which exact reduction the adapter performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReductionMode {
    #[default]
    Exact,
    Sequential,
}

/// Distributed inner product and norm over a communicator.
pub struct DistributedInnerProduct<'a, C: Comm> {
    /// Reference to the communicator implementing the `Comm` trait.
    pub comm: &'a C,
    pub mode: ReductionMode,
}

impl<'a, C: Comm> DistributedInnerProduct<'a, C> {
    pub fn new(comm: &'a C, mode: ReductionMode) -> Self {
        Self { comm, mode }
    }
}

impl<C: Comm> InnerProduct<PartitionedVector> for DistributedInnerProduct<'_, C> {
    type Scalar = f64;

    /// Computes the global dot product `x^T y`.
    ///
    /// # Panics
    /// Panics if the local slices of `x` and `y` differ in length.
    fn dot(&self, x: &PartitionedVector, y: &PartitionedVector) -> f64 {
        let reduced = match self.mode {
            ReductionMode::Exact => exact_inner(self.comm, x, y),
            ReductionMode::Sequential => sequential_inner(self.comm, x, y),
        };
        match reduced {
            Ok(r) => r.value,
            Err(e) => panic!("fatal inner product precondition: {e}"),
        }
    }

    /// Computes the global Euclidean norm `||x||_2`.
    fn norm(&self, x: &PartitionedVector) -> f64 {
        match self.mode {
            ReductionMode::Exact => self.dot(x, x).sqrt(),
            ReductionMode::Sequential => match sequential_norm(self.comm, x, 2) {
                Ok(n) => n,
                Err(e) => panic!("fatal inner product precondition: {e}"),
            },
        }
    }
}
