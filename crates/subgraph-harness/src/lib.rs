#![forbid(unsafe_code)]

//! Differential test harness for `subgraph-core`.
//!
//! Operation sequences ([`ops`]) are applied to a real container and to a
//! naive reference [`model`] by the [`driver`], which records every sink call
//! through [`recorder`] and stops at the first disagreement. [`minimize`]
//! shrinks a failing sequence to a small reproduction.
//!
//! The proptest suites and the fuzz target both build on this crate.

pub mod driver;
pub mod minimize;
pub mod model;
pub mod ops;
pub mod recorder;

pub use driver::{
    Divergence, Driver, Failure, check, check_and_shrink, check_and_shrink_with, check_with,
};
pub use minimize::{MinimizationResult, ReductionPhase, ReductionStep, minimize};
pub use model::{Model, ModelInterest};
pub use ops::{KEYS, Op, SUBSCRIBER_POOL};
pub use recorder::{Notification, RecordingSink};
