//! API options for inner-product reductions.
//!
//! This module provides the `ReductionOptions` struct, which selects the reduction
//! strategy a solver uses in place of an exact global inner product, the participation
//! fraction for the fractional and multi-group strategies, and whether the group
//! hierarchy is kept across iterations.

use crate::error::KError;
use crate::group::validate_fraction;
use crate::reduction::ReductionKind;

/// Reduction strategy & parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionOptions {
    /// Strategy (exact, sequential, half, partial, multi-group)
    pub kind: ReductionKind,

    /// Participation fraction in (0, 1] for partial and multi-group
    pub frac: f64,

    /// Keep the group hierarchy alive between calls while `frac` is unchanged
    pub reuse_hierarchy: bool,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        Self { kind: ReductionKind::Exact, frac: 0.5, reuse_hierarchy: true }
    }
}

impl ReductionOptions {
    pub fn new(kind: ReductionKind) -> Self {
        Self { kind, ..Self::default() }
    }

    pub fn with_fraction(mut self, frac: f64) -> Self {
        self.frac = frac;
        self
    }

    pub fn with_reuse(mut self, reuse_hierarchy: bool) -> Self {
        self.reuse_hierarchy = reuse_hierarchy;
        self
    }

    /// Checks `frac` for the strategies that read it.
    pub fn validate(&self) -> Result<(), KError> {
        if matches!(self.kind, ReductionKind::Partial | ReductionKind::MultiGroup) {
            validate_fraction(self.frac)?;
        }
        Ok(())
    }
}
