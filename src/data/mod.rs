//! Cohort summary data loading.

pub mod loader;

pub use loader::{load_cached, CohortTable};
