//! Context module for kreduce.
//!
//! This module provides the context/factory type a solver holds to run its inner products.
//! The context encapsulates strategy selection, parameter management, and the lifetime of
//! the sub-communicator hierarchy the approximate strategies need.
//!
//! Modules:
//! - [`reduce_context`]: Contains the `ReductionContext` struct.
//!
//! # Example
//! ```rust
//! use kreduce::{PartitionedVector, ReductionContext, ReductionKind, ReductionOptions, ThreadUniverse};
//!
//! let values = ThreadUniverse::new(4).run(|comm| {
//!     let x = PartitionedVector::from_local(&comm, vec![1.0, 1.0]);
//!     let opts = ReductionOptions::new(ReductionKind::Half);
//!     let mut ctx = ReductionContext::new(&comm, opts).unwrap();
//!     ctx.inner_product(&x, &x, 1).unwrap().value
//! });
//! assert_eq!(values, vec![8.0; 4]);
//! ```

pub mod reduce_context;
pub use reduce_context::ReductionContext;
