//! Analysis modules.
//!
//! Aggregations over the cohort table and the text formatting used to
//! present them.

pub mod aggregator;
pub mod format;

pub use aggregator::*;
