//! Sub-communicator hierarchies for approximate reductions.
//!
//! [`ProcessGroupBuilder`] turns a communicator, a participation parameter and the local
//! vector length into a [`ProcessGroups`] hierarchy:
//!
//! - **half**: two contiguous halves; one half participates per round.
//! - **fractional**: groups of roughly `frac * P` ranks; the caller picks the active group
//!   each round (and is expected to rotate it so every entry is eventually sampled).
//! - **multi-group**: `1 / frac` groups that all compute every round and trade partial
//!   sums through their roots.
//!
//! With a single process no hierarchy is built and every builder returns `Ok(None)`;
//! reductions then fall back to the exact local inner product.

pub mod hierarchy;
pub mod layout;

pub use hierarchy::ProcessGroups;
pub use layout::{GroupLayout, LayoutKind, Role, validate_fraction};

use crate::error::KError;
use crate::parallel::Comm;

/// Builds [`ProcessGroups`] over a communicator.
pub struct ProcessGroupBuilder<'a, C: Comm> {
    comm: &'a C,
}

impl<'a, C: Comm> ProcessGroupBuilder<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self { comm }
    }

    /// Contiguous half split.
    pub fn half(&self, local_n: usize) -> Result<Option<ProcessGroups<C>>, KError> {
        self.build(GroupLayout::half(self.comm.size()), local_n)
    }

    /// Groups of about `frac * P` ranks, one active per round.
    pub fn fractional(&self, frac: f64, local_n: usize) -> Result<Option<ProcessGroups<C>>, KError> {
        self.build(GroupLayout::fractional(self.comm.size(), frac)?, local_n)
    }

    /// `floor(1 / frac)` groups, all active every round.
    pub fn multi_group(&self, frac: f64, local_n: usize) -> Result<Option<ProcessGroups<C>>, KError> {
        self.build(GroupLayout::multi_group(self.comm.size(), frac)?, local_n)
    }

    /// Builds an arbitrary layout. Returns `Ok(None)` for a single process.
    pub fn build(
        &self,
        layout: GroupLayout,
        local_n: usize,
    ) -> Result<Option<ProcessGroups<C>>, KError> {
        if self.comm.size() <= 1 {
            return Ok(None);
        }
        ProcessGroups::build(self.comm, layout, local_n).map(Some)
    }
}
