//! Fractional-partial reduction: one active group per round.
//!
//! The active group reduces its products and scales them by `global_n / part_global`. Its
//! root then broadcasts the estimate across the root group, and every other root
//! rebroadcasts it within its own group. Which group is active is the caller's choice;
//! rotating it across iterations makes every entry take part in some round.

use log::trace;

use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::group::{ProcessGroups, Role};
use crate::parallel::Comm;
use crate::reduction::{Reduction, Scaling, Stages};

/// Scaled estimate of `x · y` computed by group `active_group` only.
///
/// `groups` is `None` for a single process, whose one group is group `0`.
pub fn partial_inner<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    x: &PartitionedVector,
    y: &PartitionedVector,
    active_group: usize,
) -> Result<Reduction, KError> {
    x.check_local_dims(y)?;
    let Some(groups) = groups else {
        // A single process forms the only group.
        if active_group != 0 {
            return Err(KError::InvalidGroup { group: active_group, group_count: 1 });
        }
        return Reduction::local(x, y);
    };
    groups.layout().check_group(active_group)?;

    let inner = groups.inner();
    let role = groups.role(active_group);
    let mut stages = Stages::empty();
    let mut value = 0.0;

    if role == Role::Participant {
        value = x.inner_product(y)?;
        stages |= Stages::LOCAL_COMPUTE;
        if inner.size() > 1 {
            value = inner.all_reduce(value);
            stages |= Stages::GROUP_REDUCE;
        }
        value = Scaling::new(x.global_n(), groups.part_global()).apply(value);
    }

    if let Some(roots) = groups.root_comm() {
        if roots.size() > 1 {
            let mut buf = [value];
            roots.broadcast(&mut buf, active_group);
            value = buf[0];
            stages |= Stages::CROSS_GROUP_EXCHANGE;
        }
    }

    if role == Role::Observer && inner.size() > 1 {
        let mut buf = [value];
        inner.broadcast(&mut buf, 0);
        value = buf[0];
        stages |= Stages::BROADCAST_TO_OBSERVERS;
    }
    trace!("rank {}: group {active_group} estimate {value}", groups.rank());
    Ok(Reduction { value, stages })
}
