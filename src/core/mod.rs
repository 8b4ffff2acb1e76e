//! Core data model: the partitioned vector and the traits solver loops consume.

pub mod traits;
pub mod vector;
pub mod wrappers;

pub use traits::{Indexing, InnerProduct};
pub use vector::PartitionedVector;
pub use wrappers::{DistributedInnerProduct, ReductionMode};
