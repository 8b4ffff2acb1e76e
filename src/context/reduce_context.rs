//! Factory for inner-product reductions.
//!
//! This module provides the `ReductionContext` struct, which a Krylov loop holds in place of
//! an exact global dot product. It selects a strategy from `ReductionOptions`, builds the
//! group hierarchy the strategy needs, and keeps that hierarchy across iterations while the
//! participation fraction is unchanged.
//!
//! # Usage
//!
//! 1. Construct a `ReductionContext` over the solver's communicator with the desired options.
//! 2. Call `inner_product` once per iteration on every rank, passing the same selector
//!    (half or active group) everywhere. Rotating the selector is the caller's job.
//!
//! # Lifecycle
//! The cached hierarchy is released when the fraction or strategy changes, on `release`, or
//! when the context is dropped. With `reuse_hierarchy == false` it is released at the end of
//! every call.

use log::debug;

use crate::config::ReductionOptions;
use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::group::{GroupLayout, ProcessGroupBuilder, ProcessGroups};
use crate::parallel::Comm;
use crate::reduction::{
    Reduction, ReductionKind, exact_inner, half_inner, multi_group_inner, partial_inner,
    sequential_inner,
};

struct CachedHierarchy<C: Comm> {
    kind: ReductionKind,
    frac_bits: u64,
    groups: Option<ProcessGroups<C>>,
}

/// Strategy selection plus an optional cached hierarchy, bound to one communicator.
pub struct ReductionContext<'c, C: Comm> {
    comm: &'c C,
    options: ReductionOptions,
    cached: Option<CachedHierarchy<C>>,
}

impl<'c, C: Comm> ReductionContext<'c, C> {
    pub fn new(comm: &'c C, options: ReductionOptions) -> Result<Self, KError> {
        options.validate()?;
        Ok(Self { comm, options, cached: None })
    }

    pub fn options(&self) -> &ReductionOptions {
        &self.options
    }

    pub fn kind(&self) -> ReductionKind {
        self.options.kind
    }

    /// Whether a hierarchy is currently held.
    pub fn has_hierarchy(&self) -> bool {
        self.cached.is_some()
    }

    /// Changes the participation fraction; a hierarchy built for another fraction is
    /// released.
    pub fn set_fraction(&mut self, frac: f64) -> Result<(), KError> {
        self.replace_options(ReductionOptions { frac, ..self.options.clone() })
    }

    /// Changes the strategy; a hierarchy built for another strategy is released.
    pub fn set_kind(&mut self, kind: ReductionKind) -> Result<(), KError> {
        self.replace_options(ReductionOptions { kind, ..self.options.clone() })
    }

    fn replace_options(&mut self, options: ReductionOptions) -> Result<(), KError> {
        options.validate()?;
        if options.kind != self.options.kind || options.frac.to_bits() != self.options.frac.to_bits() {
            self.release();
        }
        self.options = options;
        Ok(())
    }

    /// Drops the cached hierarchy and its communicators.
    pub fn release(&mut self) {
        if self.cached.take().is_some() {
            debug!("rank {}: released reduction hierarchy", self.comm.rank());
        }
    }

    /// One reduction round.
    ///
    /// `selector` is the participating half for [`ReductionKind::Half`] and the active group
    /// for [`ReductionKind::Partial`]; other strategies ignore it. Collective over the
    /// context's communicator.
    ///
    /// [`ReductionKind::MultiGroup`] exchanges only values computed in this call, so the
    /// result is exact and rounds are not overlapped. Callers that want other groups'
    /// shares to lag one round behind drive [`group_local`](crate::reduction::group_local)
    /// and [`exchange_partials`](crate::reduction::exchange_partials) themselves.
    pub fn inner_product(
        &mut self,
        x: &PartitionedVector,
        y: &PartitionedVector,
        selector: usize,
    ) -> Result<Reduction, KError> {
        x.check_local_dims(y)?;
        let comm = self.comm;
        let result = match self.options.kind {
            ReductionKind::Exact => exact_inner(comm, x, y),
            ReductionKind::Sequential => sequential_inner(comm, x, y),
            ReductionKind::Half => half_inner(self.hierarchy(x.local_n())?, x, y, selector),
            ReductionKind::Partial => partial_inner(self.hierarchy(x.local_n())?, x, y, selector),
            ReductionKind::MultiGroup => multi_group_inner(self.hierarchy(x.local_n())?, x, y),
        };
        if !self.options.reuse_hierarchy {
            self.release();
        }
        result
    }

    /// `sqrt(x · x)` with the configured strategy.
    pub fn norm(&mut self, x: &PartitionedVector, selector: usize) -> Result<f64, KError> {
        Ok(self.inner_product(x, x, selector)?.value.sqrt())
    }

    fn hierarchy(&mut self, local_n: usize) -> Result<Option<&ProcessGroups<C>>, KError> {
        let kind = self.options.kind;
        let frac_bits = self.options.frac.to_bits();
        let stale = self
            .cached
            .as_ref()
            .is_none_or(|c| c.kind != kind || c.frac_bits != frac_bits);
        if stale {
            self.release();
            let builder = ProcessGroupBuilder::new(self.comm);
            let size = self.comm.size();
            let layout = match kind {
                ReductionKind::Half => GroupLayout::half(size),
                ReductionKind::Partial => GroupLayout::fractional(size, self.options.frac)?,
                ReductionKind::MultiGroup => GroupLayout::multi_group(size, self.options.frac)?,
                ReductionKind::Exact | ReductionKind::Sequential => {
                    return Err(KError::Unsupported("strategy does not use a group hierarchy"));
                }
            };
            let groups = builder.build(layout, local_n)?;
            self.cached = Some(CachedHierarchy { kind, frac_bits, groups });
        }
        Ok(self.cached.as_ref().and_then(|c| c.groups.as_ref()))
    }
}
