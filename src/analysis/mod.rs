//! Analysis modules.
//!
//! Extraction of ages from decoded rows and the distribution statistics.

pub mod aggregator;

pub use aggregator::*;
