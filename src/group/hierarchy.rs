//! Communicator hierarchies built from a [`GroupLayout`].

use log::debug;

use crate::error::KError;
use crate::group::layout::{GroupLayout, Role};
use crate::parallel::Comm;

const ROOT_COLOR: usize = 0;
const NON_ROOT_COLOR: usize = 1;

/// One rank's view of an inner-group / root-group hierarchy.
///
/// Owns both sub-communicators; dropping the value releases them. The root-group
/// communicator is only kept on group roots, where its rank `g` is the root of group `g`.
pub struct ProcessGroups<C: Comm> {
    layout: GroupLayout,
    rank: usize,
    my_group: usize,
    inner: C,
    root: Option<C>,
    part_global: usize,
}

impl<C: Comm> ProcessGroups<C> {
    /// Splits `comm` according to `layout` and sums `local_n` over this rank's inner group.
    ///
    /// Collective over `comm`: two splits and one inner-group reduction.
    pub fn build(comm: &C, layout: GroupLayout, local_n: usize) -> Result<Self, KError> {
        if layout.process_count() != comm.size() {
            return Err(KError::LayoutMismatch(
                "layout process count differs from communicator size",
            ));
        }
        let rank = comm.rank();
        let my_group = layout.group_of(rank);
        let is_root = layout.is_root(rank);

        let inner = comm.split(my_group, rank);
        let root_color = if is_root { ROOT_COLOR } else { NON_ROOT_COLOR };
        let root_comm = comm.split(root_color, rank);
        let root = is_root.then_some(root_comm);

        let part_global = inner.all_reduce_count(local_n);
        debug!(
            "rank {rank}: {:?} layout, group {my_group}/{} ({} ranks), part_global {part_global}",
            layout.kind(),
            layout.group_count(),
            inner.size(),
        );

        Ok(Self { layout, rank, my_group, inner, root, part_global })
    }

    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    /// Rank in the communicator the hierarchy was built from.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn my_group(&self) -> usize {
        self.my_group
    }

    pub fn group_count(&self) -> usize {
        self.layout.group_count()
    }

    /// Communicator of this rank's inner group.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Root-group communicator; `None` unless this rank is its group's root.
    pub fn root_comm(&self) -> Option<&C> {
        self.root.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }

    /// Number of vector entries owned by this rank's inner group.
    pub fn part_global(&self) -> usize {
        self.part_global
    }

    pub fn role(&self, active_group: usize) -> Role {
        if self.my_group == active_group {
            Role::Participant
        } else {
            Role::Observer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ThreadUniverse;

    #[test]
    fn builds_groups_and_part_global() {
        let views = ThreadUniverse::new(5).run(|comm| {
            let layout = GroupLayout::fractional(5, 0.4).unwrap();
            let groups = ProcessGroups::build(&comm, layout, comm.rank() + 1).unwrap();
            (
                groups.my_group(),
                groups.inner().size(),
                groups.is_root(),
                groups.root_comm().map(|c| c.rank()),
                groups.part_global(),
            )
        });
        // round(5 * 0.4) = 2, +1 for odd P -> groups {0,1,2} and {3,4}.
        assert_eq!(views[0], (0, 3, true, Some(0), 6));
        assert_eq!(views[2], (0, 3, false, None, 6));
        assert_eq!(views[3], (1, 2, true, Some(1), 9));
        assert_eq!(views[4], (1, 2, false, None, 9));
    }

    #[test]
    fn rejects_layout_for_other_process_count() {
        let results = ThreadUniverse::new(2).run(|comm| {
            ProcessGroups::build(&comm, GroupLayout::half(3), 1).err()
        });
        for err in results {
            assert!(matches!(err, Some(KError::LayoutMismatch(_))));
        }
    }
}
