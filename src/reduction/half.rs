//! Half-approximate reductions over a two-half hierarchy.
//!
//! `half` selects the participating half: `0` is the lower `ceil(P/2)` ranks, `1` the upper
//! ranks. The participating half reduces its own products, scales them to the full vector
//! length, and its root hands the estimate to the other half's root, which broadcasts it.
//!
//! [`half_local`] and [`half_exchange`] split the same round in two so a solver can compute
//! its own half while the other half's previous value is still in flight.

use log::trace;

use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::group::{LayoutKind, ProcessGroups, Role};
use crate::parallel::Comm;
use crate::reduction::{Reduction, Scaling, Stages, TAG_HALF, TAG_HALF_EXCHANGE};

fn check_half_layout<C: Comm>(groups: &ProcessGroups<C>) -> Result<(), KError> {
    if !matches!(groups.layout().kind(), LayoutKind::Half) || groups.group_count() != 2 {
        return Err(KError::LayoutMismatch("half reductions need a two-half hierarchy"));
    }
    Ok(())
}

/// Scaled estimate of `x · y` computed by half `half` only.
///
/// `groups` is `None` for a single process, where the exact local product is returned for
/// either half. A `half` other than `0` or `1` is rejected in both cases.
pub fn half_inner<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    x: &PartitionedVector,
    y: &PartitionedVector,
    half: usize,
) -> Result<Reduction, KError> {
    x.check_local_dims(y)?;
    if half >= 2 {
        return Err(KError::InvalidGroup { group: half, group_count: 2 });
    }
    let Some(groups) = groups else {
        return Reduction::local(x, y);
    };
    check_half_layout(groups)?;
    groups.layout().check_group(half)?;

    let inner = groups.inner();
    let mut stages = Stages::empty();
    let mut value = 0.0;
    match groups.role(half) {
        Role::Participant => {
            value = x.inner_product(y)?;
            stages |= Stages::LOCAL_COMPUTE;
            if inner.size() > 1 {
                value = inner.all_reduce(value);
                stages |= Stages::GROUP_REDUCE;
            }
            value = Scaling::new(x.global_n(), groups.part_global()).apply(value);
            if let Some(roots) = groups.root_comm() {
                roots.send(value, 1 - half, TAG_HALF);
                stages |= Stages::CROSS_GROUP_EXCHANGE;
            }
        }
        Role::Observer => {
            if let Some(roots) = groups.root_comm() {
                value = roots.receive(half, TAG_HALF);
                stages |= Stages::CROSS_GROUP_EXCHANGE;
            }
            if inner.size() > 1 {
                let mut buf = [value];
                inner.broadcast(&mut buf, 0);
                value = buf[0];
                stages |= Stages::BROADCAST_TO_OBSERVERS;
            }
        }
    }
    trace!("rank {}: half {half} estimate {value}", groups.rank());
    Ok(Reduction { value, stages })
}

/// Unscaled sum of `x · y` over this rank's own half.
pub fn half_local<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    x: &PartitionedVector,
    y: &PartitionedVector,
) -> Result<Reduction, KError> {
    x.check_local_dims(y)?;
    let Some(groups) = groups else {
        return Reduction::local(x, y);
    };
    check_half_layout(groups)?;

    let mut value = x.inner_product(y)?;
    let mut stages = Stages::LOCAL_COMPUTE;
    if groups.inner().size() > 1 {
        value = groups.inner().all_reduce(value);
        stages |= Stages::GROUP_REDUCE;
    }
    Ok(Reduction { value, stages })
}

/// Trades `my_half` for the other half's value.
///
/// The two roots swap values point-to-point and broadcast what they received to their
/// half. With a single process there is no other half and the result is zero.
pub fn half_exchange<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    my_half: f64,
) -> Result<Reduction, KError> {
    let Some(groups) = groups else {
        return Ok(Reduction { value: 0.0, stages: Stages::empty() });
    };
    check_half_layout(groups)?;

    let mut stages = Stages::empty();
    let mut other_half = 0.0;
    if let Some(roots) = groups.root_comm() {
        let other = 1 - groups.my_group();
        // Lower root sends first so blocking transports cannot deadlock.
        if groups.my_group() == 0 {
            roots.send(my_half, other, TAG_HALF_EXCHANGE);
            other_half = roots.receive(other, TAG_HALF_EXCHANGE);
        } else {
            other_half = roots.receive(other, TAG_HALF_EXCHANGE);
            roots.send(my_half, other, TAG_HALF_EXCHANGE);
        }
        stages |= Stages::CROSS_GROUP_EXCHANGE;
    }
    if groups.inner().size() > 1 {
        let mut buf = [other_half];
        groups.inner().broadcast(&mut buf, 0);
        other_half = buf[0];
        stages |= Stages::BROADCAST_TO_OBSERVERS;
    }
    Ok(Reduction { value: other_half, stages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ProcessGroupBuilder;
    use crate::parallel::ThreadUniverse;

    #[test]
    fn observers_skip_local_compute() {
        let stages = ThreadUniverse::new(4).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![1.0; 2]);
            let groups = ProcessGroupBuilder::new(&comm).half(x.local_n()).unwrap();
            half_inner(groups.as_ref(), &x, &x, 1).unwrap().stages
        });
        assert_eq!(stages[0], Stages::CROSS_GROUP_EXCHANGE | Stages::BROADCAST_TO_OBSERVERS);
        assert_eq!(stages[1], Stages::BROADCAST_TO_OBSERVERS);
        assert_eq!(
            stages[2],
            Stages::LOCAL_COMPUTE | Stages::GROUP_REDUCE | Stages::CROSS_GROUP_EXCHANGE
        );
        assert_eq!(stages[3], Stages::LOCAL_COMPUTE | Stages::GROUP_REDUCE);
    }

    #[test]
    fn rejects_half_selector_out_of_range() {
        let errs = ThreadUniverse::new(2).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![1.0]);
            let groups = ProcessGroupBuilder::new(&comm).half(1).unwrap();
            half_inner(groups.as_ref(), &x, &x, 2).err()
        });
        for err in errs {
            assert_eq!(err, Some(KError::InvalidGroup { group: 2, group_count: 2 }));
        }
    }

    #[test]
    fn single_process_rejects_the_same_selectors() {
        let results = ThreadUniverse::new(1).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![2.0]);
            let groups = ProcessGroupBuilder::new(&comm).half(1).unwrap();
            (
                half_inner(groups.as_ref(), &x, &x, 1).map(|r| r.value),
                half_inner(groups.as_ref(), &x, &x, 5).err(),
            )
        });
        assert_eq!(results[0].0, Ok(4.0));
        assert_eq!(results[0].1, Some(KError::InvalidGroup { group: 5, group_count: 2 }));
    }

    #[test]
    fn staggered_halves_add_up_to_exact_product() {
        let totals = ThreadUniverse::new(5).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![comm.rank() as f64; 3]);
            let groups = ProcessGroupBuilder::new(&comm).half(x.local_n()).unwrap();
            let mine = half_local(groups.as_ref(), &x, &x).unwrap().value;
            let other = half_exchange(groups.as_ref(), mine).unwrap().value;
            mine + other
        });
        // 3 * (0 + 1 + 4 + 9 + 16)
        assert_eq!(totals, vec![90.0; 5]);
    }

    #[test]
    fn rejects_non_half_hierarchy() {
        let errs = ThreadUniverse::new(4).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![1.0]);
            let groups = ProcessGroupBuilder::new(&comm).fractional(0.5, 1).unwrap();
            half_inner(groups.as_ref(), &x, &x, 0).err()
        });
        for err in errs {
            assert!(matches!(err, Some(KError::LayoutMismatch(_))));
        }
    }
}
