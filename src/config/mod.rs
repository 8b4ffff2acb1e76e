//! Configuration types.

pub mod options;
pub use options::ReductionOptions;
