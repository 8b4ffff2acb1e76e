//! MPI-based transport.
//!
//! This module provides an implementation of the `Comm` trait on top of the `mpi` crate for
//! distributed-memory runs. Only available when the `mpi` feature is enabled.
//!
//! # Usage
//!
//! - `MpiComm::initialize()` initializes MPI and wraps the world communicator. The MPI
//!   universe is kept alive for as long as any communicator derived from it.
//! - Sub-communicators returned by `split` are freed (`MPI_Comm_free`) when dropped.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")] {
//! use kreduce::parallel::{Comm, MpiComm};
//! let comm = MpiComm::initialize().expect("MPI already initialized");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use std::rc::Rc;

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;

/// MPI communicator wrapper.
pub struct MpiComm {
    /// The wrapped communicator (world or a split of it).
    pub comm: SimpleCommunicator,
    /// Rank of this process within `comm`.
    pub rank: usize,
    /// Number of processes in `comm`.
    pub size: usize,
    universe: Option<Rc<Universe>>,
}

impl MpiComm {
    /// Initializes MPI and wraps the world communicator.
    ///
    /// Returns `None` if MPI has already been initialized in this process.
    pub fn initialize() -> Option<Self> {
        let universe = mpi::initialize()?;
        let comm = universe.world();
        Some(Self::wrap(comm, Some(Rc::new(universe))))
    }

    /// Wraps an existing communicator (MPI must already be initialized and must outlive it).
    pub fn from_communicator(comm: SimpleCommunicator) -> Self {
        Self::wrap(comm, None)
    }

    fn wrap(comm: SimpleCommunicator, universe: Option<Rc<Universe>>) -> Self {
        let rank = comm.rank() as usize;
        let size = comm.size() as usize;
        MpiComm { comm, rank, size, universe }
    }
}

impl super::Comm for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.comm.barrier();
    }

    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.comm.all_reduce_into(&x, &mut y, SystemOperation::sum());
        y
    }

    fn all_reduce_count(&self, n: usize) -> usize {
        let local = n as u64;
        let mut global = 0u64;
        self.comm.all_reduce_into(&local, &mut global, SystemOperation::sum());
        global as usize
    }

    fn all_gather_count(&self, n: usize) -> Vec<usize> {
        let local = n as u64;
        let mut all = vec![0u64; self.size];
        self.comm.all_gather_into(&local, &mut all[..]);
        all.into_iter().map(|c| c as usize).collect()
    }

    fn broadcast(&self, buf: &mut [f64], root: usize) {
        self.comm.process_at_rank(root as i32).broadcast_into(buf);
    }

    fn send(&self, value: f64, dest: usize, tag: u16) {
        self.comm
            .process_at_rank(dest as i32)
            .send_with_tag(&value, i32::from(tag));
    }

    fn receive(&self, source: usize, tag: u16) -> f64 {
        let (value, _status) = self
            .comm
            .process_at_rank(source as i32)
            .receive_with_tag::<f64>(i32::from(tag));
        value
    }

    /// Splits with `MPI_Comm_split`.
    ///
    /// # Panics
    /// Panics if MPI returns `MPI_COMM_NULL`, which it does not for a defined color.
    fn split(&self, color: usize, key: usize) -> Self {
        let sub = self
            .comm
            .split_by_color_with_key(Color::with_value(color as i32), key as i32)
            .expect("MPI_Comm_split with a defined color returned MPI_COMM_NULL");
        Self::wrap(sub, self.universe.clone())
    }
}
