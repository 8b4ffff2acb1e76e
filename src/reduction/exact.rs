//! Exact reduction: local dot product followed by one all-reduce.

use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::parallel::Comm;
use crate::reduction::{Reduction, Stages};

pub fn exact_inner<C: Comm>(
    comm: &C,
    x: &PartitionedVector,
    y: &PartitionedVector,
) -> Result<Reduction, KError> {
    let local = x.inner_product(y)?;
    if comm.size() <= 1 {
        return Ok(Reduction { value: local, stages: Stages::LOCAL_COMPUTE });
    }
    Ok(Reduction {
        value: comm.all_reduce(local),
        stages: Stages::LOCAL_COMPUTE | Stages::GROUP_REDUCE,
    })
}
