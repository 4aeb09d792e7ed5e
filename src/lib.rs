pub mod abis;
pub mod config;
pub mod cron;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod utils;

#[cfg(test)]
mod testing;

pub use crate::config::{PipelineConfig, Settings};
pub use cron::CronScheduler;
pub use db::{PostgresClient, Snapshot, SnapshotStore, StoreReceipt};
pub use error::{IngestionError, Stage};
pub use pipeline::{IngestionRun, SnapshotBuilder};
pub use reader::{AlloyChainReader, ChainReader};
