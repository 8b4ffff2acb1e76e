//! Rank-ordered ring reduction.
//!
//! Rank 0 starts the running sum; every following rank receives it from its predecessor,
//! adds its own products in index order, and passes it on. The last rank broadcasts the
//! total. Accumulation order is therefore fixed (rank 0 first, each slice in index order),
//! and the result is bit-identical across runs with the same data and rank count. This is
//! for reproducibility studies, not speed: the ring serializes all ranks.

use log::trace;

use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::parallel::Comm;
use crate::reduction::{Reduction, Stages, TAG_RING};

pub fn sequential_inner<C: Comm>(
    comm: &C,
    x: &PartitionedVector,
    y: &PartitionedVector,
) -> Result<Reduction, KError> {
    x.check_local_dims(y)?;
    let (rank, size) = (comm.rank(), comm.size());
    if size <= 1 {
        // Same index-ordered fold as the ring, never the parallel local product.
        let value = x.accumulate_inner_product(y, 0.0)?;
        return Ok(Reduction { value, stages: Stages::LOCAL_COMPUTE });
    }

    let mut stages = Stages::LOCAL_COMPUTE | Stages::BROADCAST_TO_OBSERVERS;
    let running = if rank > 0 {
        stages |= Stages::CROSS_GROUP_EXCHANGE;
        comm.receive(rank - 1, TAG_RING)
    } else {
        0.0
    };
    let running = x.accumulate_inner_product(y, running)?;
    if rank + 1 < size {
        stages |= Stages::CROSS_GROUP_EXCHANGE;
        comm.send(running, rank + 1, TAG_RING);
    }
    trace!("rank {rank}: ring partial {running}");

    let mut total = [running];
    comm.broadcast(&mut total, size - 1);
    Ok(Reduction { value: total[0], stages })
}

/// `(x · x)^(1/p)` computed with the ring reduction.
pub fn sequential_norm<C: Comm>(comm: &C, x: &PartitionedVector, p: u32) -> Result<f64, KError> {
    if p == 0 {
        return Err(KError::Unsupported("norm order must be positive"));
    }
    let squared = sequential_inner(comm, x, x)?.value;
    Ok(squared.powf(1.0 / f64::from(p)))
}
