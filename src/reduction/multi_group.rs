//! Multi-group reduction: every group computes, roots trade partial sums.
//!
//! Each of the `k` groups reduces its own products. The roots then each broadcast their
//! group's value across the root group, and every root broadcasts the full vector of `k`
//! partials to its inner group. A rank combines its own group's fresh value with the other
//! groups' published values.
//!
//! When rounds overlap, a caller can publish an older value through [`exchange_partials`]
//! while computing the current one with [`group_local`]; the combined value then mixes this
//! round's own share with one-round-old shares from the other groups.

use log::trace;

use crate::core::vector::PartitionedVector;
use crate::error::KError;
use crate::group::ProcessGroups;
use crate::parallel::Comm;
use crate::reduction::{Reduction, Stages};

/// Unscaled sum of `x · y` over this rank's inner group.
pub fn group_local<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    x: &PartitionedVector,
    y: &PartitionedVector,
) -> Result<Reduction, KError> {
    x.check_local_dims(y)?;
    let Some(groups) = groups else {
        return Reduction::local(x, y);
    };
    let mut value = x.inner_product(y)?;
    let mut stages = Stages::LOCAL_COMPUTE;
    if groups.inner().size() > 1 {
        value = groups.inner().all_reduce(value);
        stages |= Stages::GROUP_REDUCE;
    }
    Ok(Reduction { value, stages })
}

/// Publishes `my_partial` for this rank's group and returns every group's published value,
/// indexed by group.
pub fn exchange_partials<C: Comm>(groups: &ProcessGroups<C>, my_partial: f64) -> Vec<f64> {
    let mut partials = vec![0.0; groups.group_count()];
    partials[groups.my_group()] = my_partial;
    if let Some(roots) = groups.root_comm() {
        for g in 0..partials.len() {
            roots.broadcast(&mut partials[g..=g], g);
        }
    }
    if groups.inner().size() > 1 {
        groups.inner().broadcast(&mut partials, 0);
    }
    partials
}

/// Sum of every group's partial except `my_group`'s.
pub fn sum_other_groups(partials: &[f64], my_group: usize) -> f64 {
    partials
        .iter()
        .enumerate()
        .filter(|&(g, _)| g != my_group)
        .map(|(_, v)| v)
        .sum()
}

/// Own group's fresh partial plus every other group's partial from the same exchange.
pub fn multi_group_inner<C: Comm>(
    groups: Option<&ProcessGroups<C>>,
    x: &PartitionedVector,
    y: &PartitionedVector,
) -> Result<Reduction, KError> {
    let own = group_local(groups, x, y)?;
    let Some(groups) = groups else {
        return Ok(own);
    };
    let partials = exchange_partials(groups, own.value);
    let mut stages = own.stages;
    if groups.group_count() > 1 {
        stages |= Stages::CROSS_GROUP_EXCHANGE;
    }
    if groups.inner().size() > 1 {
        stages |= Stages::BROADCAST_TO_OBSERVERS;
    }
    let value = own.value + sum_other_groups(&partials, groups.my_group());
    trace!("rank {}: partials {partials:?}", groups.rank());
    Ok(Reduction { value, stages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ProcessGroupBuilder;
    use crate::parallel::ThreadUniverse;

    #[test]
    fn exchange_collects_every_group_in_order() {
        let partials = ThreadUniverse::new(7).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![1.0; comm.rank() + 1]);
            let groups = ProcessGroupBuilder::new(&comm)
                .multi_group(1.0 / 3.0, x.local_n())
                .unwrap()
                .unwrap();
            let own = group_local(Some(&groups), &x, &x).unwrap().value;
            exchange_partials(&groups, own)
        });
        // Groups {0,1}, {2,3}, {4,5,6}; rank r owns r + 1 ones.
        for p in partials {
            assert_eq!(p, vec![3.0, 7.0, 18.0]);
        }
    }

    #[test]
    fn stale_partials_from_other_groups_are_mixed_in() {
        let values = ThreadUniverse::new(4).run(|comm| {
            let x = PartitionedVector::from_local(&comm, vec![2.0]);
            let groups = ProcessGroupBuilder::new(&comm).multi_group(0.5, 1).unwrap().unwrap();
            // Publish last round's value (pretend it was 1.0 per group).
            let fresh = group_local(Some(&groups), &x, &x).unwrap().value;
            let published = exchange_partials(&groups, 1.0);
            fresh + sum_other_groups(&published, groups.my_group())
        });
        // Own group: 4 + 4 fresh, other group: 1.0 stale.
        assert_eq!(values, vec![9.0; 4]);
    }

    #[test]
    fn sum_other_groups_skips_own_entry() {
        assert_eq!(sum_other_groups(&[1.0, 2.0, 4.0], 1), 5.0);
        assert_eq!(sum_other_groups(&[1.0], 0), 0.0);
    }
}
