//! Transport layer for the reduction strategies.
//!
//! Every strategy is written against the [`Comm`] trait, which exposes the handful of
//! message-passing primitives the hierarchy needs: point-to-point send/receive of scalars,
//! sum-reduction within a communicator, broadcast from a root, and communicator splitting.
//! Rank and size are always read from the communicator handed in by the caller, never from
//! ambient global state.
//!
//! Backends:
//! - [`ThreadComm`]: logical ranks simulated as threads of one process (see [`ThreadUniverse`]).
//! - `MpiComm`: the `mpi` crate, behind the `mpi` feature.
//! - [`UniverseComm`]: enum dispatch over whichever backends are compiled in.

/// Message-passing capability required by the reduction subsystem.
///
/// All collective methods must be called by every rank of the communicator, in the same
/// order. A rank that skips a matching call deadlocks its peers; nothing here detects that.
pub trait Comm: Sized {
    /// Rank of the calling process within this communicator.
    fn rank(&self) -> usize;
    /// Number of processes in this communicator.
    fn size(&self) -> usize;
    /// Blocks until every rank of the communicator has entered the barrier.
    fn barrier(&self);
    /// Sum of `x` over all ranks, returned on every rank.
    fn all_reduce(&self, x: f64) -> f64;
    /// Sum of `n` over all ranks, returned on every rank.
    fn all_reduce_count(&self, n: usize) -> usize;
    /// Every rank's `n`, in rank order, returned on every rank.
    fn all_gather_count(&self, n: usize) -> Vec<usize>;
    /// Overwrites `buf` on every rank with the contents of `buf` on `root`.
    fn broadcast(&self, buf: &mut [f64], root: usize);
    /// Blocking send of a single value to `dest`.
    fn send(&self, value: f64, dest: usize, tag: u16);
    /// Blocking receive of a single value from `source`.
    fn receive(&self, source: usize, tag: u16) -> f64;
    /// Splits the communicator: ranks passing the same `color` end up in the same new
    /// communicator, ordered by `key` (ties broken by current rank).
    fn split(&self, color: usize, key: usize) -> Self;
}

pub mod thread_comm;
pub use thread_comm::{ThreadComm, ThreadUniverse};

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Runtime selection between the compiled-in transports.
pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    Local(ThreadComm),
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Local(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Local(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Local(comm) => comm.barrier(),
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce(x),
            UniverseComm::Local(comm) => comm.all_reduce(x),
        }
    }
    fn all_reduce_count(&self, n: usize) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_count(n),
            UniverseComm::Local(comm) => comm.all_reduce_count(n),
        }
    }
    fn all_gather_count(&self, n: usize) -> Vec<usize> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_count(n),
            UniverseComm::Local(comm) => comm.all_gather_count(n),
        }
    }
    fn broadcast(&self, buf: &mut [f64], root: usize) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.broadcast(buf, root),
            UniverseComm::Local(comm) => comm.broadcast(buf, root),
        }
    }
    fn send(&self, value: f64, dest: usize, tag: u16) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.send(value, dest, tag),
            UniverseComm::Local(comm) => comm.send(value, dest, tag),
        }
    }
    fn receive(&self, source: usize, tag: u16) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.receive(source, tag),
            UniverseComm::Local(comm) => comm.receive(source, tag),
        }
    }
    fn split(&self, color: usize, key: usize) -> Self {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => UniverseComm::Mpi(comm.split(color, key)),
            UniverseComm::Local(comm) => UniverseComm::Local(comm.split(color, key)),
        }
    }
}
