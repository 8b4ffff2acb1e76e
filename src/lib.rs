//! kreduce: communication-avoiding inner products for distributed Krylov solvers
//!
//! This crate computes, or estimates, global inner products of partitioned vectors spread
//! over many cooperating processes. Besides the exact all-reduce and a bit-reproducible
//! rank-ordered ring, it offers approximate strategies that let only a subset of processes
//! (half of them, or a group of about `frac * P`) do the reduction and scale the partial
//! sum up to the full vector, and a multi-group strategy in which every group reduces
//! independently and trades its partial sum through the group roots.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod group;
pub mod reduction;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use group::*;
pub use parallel::{Comm, ThreadComm, ThreadUniverse, UniverseComm};
pub use reduction::*;
