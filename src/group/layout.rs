//! Group layouts: which contiguous block of ranks forms each inner group.
//!
//! Layouts are pure functions of the process count and the participation parameter, so
//! every rank derives the same partition without communicating.

use std::ops::Range;

use crate::error::KError;

/// Whether a rank contributes data to this round's partial sum or only receives the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Participant,
    Observer,
}

/// How a layout was derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayoutKind {
    /// Two contiguous halves, the first one rounded up.
    Half,
    /// Groups of `round(P * frac)` ranks, one of which is active per round.
    Fractional { frac: f64 },
    /// `floor(1 / frac)` groups, all of which compute every round.
    MultiGroup { frac: f64 },
}

/// Partition of `0..process_count` into contiguous, non-empty groups.
///
/// Group `g` starts at `roots()[g]`; its lowest rank is its root.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupLayout {
    kind: LayoutKind,
    process_count: usize,
    procs_in_group: usize,
    roots: Vec<usize>,
}

/// Rejects fractions outside `(0, 1]`.
pub fn validate_fraction(frac: f64) -> Result<f64, KError> {
    if frac.is_finite() && frac > 0.0 && frac <= 1.0 {
        Ok(frac)
    } else {
        Err(KError::InvalidFraction(frac))
    }
}

impl GroupLayout {
    /// Splits the ranks into a lower half of `ceil(P/2)` ranks and an upper half.
    ///
    /// With a single process there is only the lower half.
    pub fn half(process_count: usize) -> Self {
        let process_count = process_count.max(1);
        let half_procs = process_count.div_ceil(2);
        let roots = if process_count > 1 { vec![0, half_procs] } else { vec![0] };
        Self { kind: LayoutKind::Half, process_count, procs_in_group: half_procs, roots }
    }

    /// Groups of `round(P * frac)` ranks, grown by one when `P` is odd and never empty.
    /// The last group holds whatever remains.
    pub fn fractional(process_count: usize, frac: f64) -> Result<Self, KError> {
        let frac = validate_fraction(frac)?;
        let process_count = process_count.max(1);
        let mut procs_in_group = (process_count as f64 * frac).round() as usize;
        if process_count % 2 == 1 {
            procs_in_group += 1;
        }
        let procs_in_group = procs_in_group.clamp(1, process_count);
        let roots = (0..process_count).step_by(procs_in_group).collect();
        Ok(Self { kind: LayoutKind::Fractional { frac }, process_count, procs_in_group, roots })
    }

    /// `k = floor(1 / frac)` groups of `P / k` ranks; the last group absorbs the remainder.
    /// `k` is capped at `P` so that no group is empty.
    pub fn multi_group(process_count: usize, frac: f64) -> Result<Self, KError> {
        let frac = validate_fraction(frac)?;
        let process_count = process_count.max(1);
        // Guard against 1/frac landing just below an integer, e.g. frac = 0.1.
        let groups = ((1.0 / frac) + 1e-9).floor() as usize;
        let groups = groups.clamp(1, process_count);
        let procs_in_group = process_count / groups;
        let roots = (0..groups).map(|g| g * procs_in_group).collect();
        Ok(Self { kind: LayoutKind::MultiGroup { frac }, process_count, procs_in_group, roots })
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn group_count(&self) -> usize {
        self.roots.len()
    }

    /// Nominal group size (the last group may differ).
    pub fn procs_in_group(&self) -> usize {
        self.procs_in_group
    }

    /// Root (lowest) rank of every group, ascending.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Ranks belonging to group `g`.
    ///
    /// # Panics
    /// Panics if `g >= group_count()`.
    pub fn group_range(&self, g: usize) -> Range<usize> {
        let end = self.roots.get(g + 1).copied().unwrap_or(self.process_count);
        self.roots[g]..end
    }

    /// Group containing `rank`.
    pub fn group_of(&self, rank: usize) -> usize {
        self.roots.partition_point(|&root| root <= rank) - 1
    }

    pub fn root_of(&self, rank: usize) -> usize {
        self.roots[self.group_of(rank)]
    }

    pub fn is_root(&self, rank: usize) -> bool {
        self.roots.binary_search(&rank).is_ok()
    }

    /// Role of `rank` in a round where `active_group` computes.
    pub fn role(&self, rank: usize, active_group: usize) -> Role {
        if self.group_of(rank) == active_group {
            Role::Participant
        } else {
            Role::Observer
        }
    }

    /// Fails with [`KError::InvalidGroup`] unless `g` names an existing group.
    pub fn check_group(&self, g: usize) -> Result<(), KError> {
        if g < self.group_count() {
            Ok(())
        } else {
            Err(KError::InvalidGroup { group: g, group_count: self.group_count() })
        }
    }
}
