//! Global inner-product reductions over partitioned vectors.
//!
//! Every strategy walks some prefix of the same state sequence
//!
//! `LOCAL_COMPUTE → GROUP_REDUCE → CROSS_GROUP_EXCHANGE → BROADCAST_TO_OBSERVERS → done`
//!
//! and records the stages the calling rank actually executed in [`Reduction::stages`].
//!
//! | strategy | exact? | communication |
//! |---|---|---|
//! | [`exact_inner`] | yes | one all-reduce |
//! | [`sequential_inner`] | yes, bit-reproducible | rank ring + broadcast |
//! | [`half_inner`] | scaled estimate | half-group reduce, root-to-root hop, broadcast |
//! | [`partial_inner`] | scaled estimate | active-group reduce, root-group broadcast, broadcast |
//! | [`multi_group_inner`] | yes when values are fresh | group reduce, all-roots exchange, broadcast |
//!
//! All strategies are collective: every rank of the communicator (or hierarchy) must call
//! the same strategy with the same parameters in the same round. Local dimension mismatches
//! are reported before any message is sent. With a single process every strategy returns
//! the exact local inner product.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::core::vector::PartitionedVector;
use crate::error::KError;

pub mod exact;
pub mod half;
pub mod multi_group;
pub mod partial;
pub mod scaling;
pub mod sequential;

pub use exact::exact_inner;
pub use half::{half_exchange, half_inner, half_local};
pub use multi_group::{exchange_partials, group_local, multi_group_inner, sum_other_groups};
pub use partial::partial_inner;
pub use scaling::Scaling;
pub use sequential::{sequential_inner, sequential_norm};

bitflags! {
    /// Stages of a reduction round executed by one rank.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct Stages: u8 {
        const LOCAL_COMPUTE          = 0b0001;
        const GROUP_REDUCE           = 0b0010;
        const CROSS_GROUP_EXCHANGE   = 0b0100;
        const BROADCAST_TO_OBSERVERS = 0b1000;
    }
}

/// Result of one reduction round on one rank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reduction {
    /// Exact or estimated inner product; identical on every rank.
    pub value: f64,
    /// Stages this rank went through.
    pub stages: Stages,
}

impl Reduction {
    /// Exact single-process fallback.
    pub(crate) fn local(x: &PartitionedVector, y: &PartitionedVector) -> Result<Self, KError> {
        Ok(Self { value: x.inner_product(y)?, stages: Stages::LOCAL_COMPUTE })
    }
}

/// Point-to-point tags used by the strategies.
pub(crate) const TAG_RING: u16 = 1;
pub(crate) const TAG_HALF: u16 = 2;
pub(crate) const TAG_HALF_EXCHANGE: u16 = 3;

/// Reduction strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReductionKind {
    /// Local dot product plus one global all-reduce.
    #[default]
    Exact,
    /// Rank-ordered ring accumulation (bit-reproducible).
    Sequential,
    /// One contiguous half computes, the other receives a scaled estimate.
    Half,
    /// One group of about `frac * P` ranks computes per round.
    Partial,
    /// `1 / frac` groups compute independently and trade partial sums.
    MultiGroup,
}

impl ReductionKind {
    /// Whether the returned value is a scaled estimate rather than an exact sum.
    pub fn is_approximate(self) -> bool {
        matches!(self, Self::Half | Self::Partial)
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Sequential => "sequential",
            Self::Half => "half",
            Self::Partial => "partial",
            Self::MultiGroup => "multi-group",
        };
        f.write_str(name)
    }
}

impl FromStr for ReductionKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" | "allreduce" => Ok(Self::Exact),
            "sequential" | "seq" => Ok(Self::Sequential),
            "half" => Ok(Self::Half),
            "partial" | "fractional" => Ok(Self::Partial),
            "multi-group" | "multigroup" | "v2" => Ok(Self::MultiGroup),
            _ => Err(KError::Unsupported("unknown reduction kind")),
        }
    }
}
