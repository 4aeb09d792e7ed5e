//! Snapshot ingestion pipeline.
//!
//! - [`builder`] - Paired `fetchSpot`/`fetchOracle` reads assembled into one snapshot
//! - [`run`] - Validate, build, store, report the failing stage

mod builder;
mod run;

pub use builder::SnapshotBuilder;
pub use run::{log_outcome, IngestionRun, RunState};
