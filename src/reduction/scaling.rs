//! Rescaling of partial sums.
//!
//! A sum over `part_global` of the `global_n` entries is extrapolated to the full vector by
//! the factor `global_n / part_global`. The estimate is exact when the omitted products
//! average the same as the sampled ones (homogeneous data) and is otherwise a statistical
//! approximation. Callers that need a correct value must use an exact strategy.

use log::warn;
use num_traits::{Float, FromPrimitive};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scaling {
    pub global_n: usize,
    pub part_global: usize,
}

impl Scaling {
    pub fn new(global_n: usize, part_global: usize) -> Self {
        Self { global_n, part_global }
    }

    /// Sampled the whole vector.
    pub fn is_exact(&self) -> bool {
        self.part_global == self.global_n
    }

    /// `global_n / part_global`, or `None` if nothing was sampled.
    pub fn factor<T: Float + FromPrimitive>(&self) -> Option<T> {
        if self.part_global == 0 {
            return None;
        }
        Some(T::from_usize(self.global_n)? / T::from_usize(self.part_global)?)
    }

    /// Extrapolates `partial` to the full vector.
    ///
    /// An empty sample yields zero: there is nothing to extrapolate from, and every rank
    /// must still leave the round with the same value.
    pub fn apply<T: Float + FromPrimitive>(&self, partial: T) -> T {
        if self.is_exact() {
            return partial;
        }
        // Multiply before dividing so homogeneous data scales without rounding.
        match (T::from_usize(self.global_n), T::from_usize(self.part_global)) {
            (Some(global), Some(part)) if self.part_global > 0 => partial * global / part,
            _ => {
                warn!(
                    "partial inner product sampled 0 of {} entries; estimate set to zero",
                    self.global_n
                );
                T::zero()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scales_by_global_over_sampled() {
        let s = Scaling::new(8, 4);
        assert_eq!(s.apply(4.0_f64), 8.0);
        assert_eq!(s.factor::<f64>(), Some(2.0));
        assert!(!s.is_exact());
    }

    #[test]
    fn full_sample_is_identity() {
        let s = Scaling::new(7, 7);
        assert!(s.is_exact());
        assert_eq!(s.apply(0.1_f64), 0.1);
    }

    #[test]
    fn uneven_sample_ratio() {
        let s = Scaling::new(10, 3);
        assert_relative_eq!(s.apply(3.0_f32), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_sample_yields_zero() {
        let s = Scaling::new(10, 0);
        assert_eq!(s.factor::<f64>(), None);
        assert_eq!(s.apply(5.0_f64), 0.0);
    }
}
