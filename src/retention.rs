//! Retention domain: per-source age policy and the periodic sweeper that applies
//! it to the record store and the context cache.

pub mod policy;
pub mod sweeper;

pub use policy::RetentionPolicy;
pub use sweeper::{RetentionSweeper, SweepReport, SweeperHandle, DEFAULT_SWEEP_INTERVAL};
