//! Metric data model.
//!
//! Probe results are normalized into [`Metric`]s and collected in an
//! [`Accumulator`] for the duration of one run.

mod accumulator;
mod models;

pub use accumulator::*;
pub use models::*;
