//! Cron scheduler that re-runs ingestion on a fixed cadence.
//!
//! Runs never overlap: a tick that fires while the previous run is still in
//! flight is skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::db::SnapshotStore;
use crate::pipeline::{IngestionRun, RunState};
use crate::reader::ChainReader;

/// Scheduler owning the shared pipeline for the lifetime of the process.
pub struct CronScheduler<R, S> {
    pipeline: Arc<IngestionRun<R, S>>,
    interval: Duration,
    in_flight: Arc<Mutex<()>>,
}

impl<R, S> CronScheduler<R, S>
where
    R: ChainReader + 'static,
    S: SnapshotStore + 'static,
{
    pub fn new(pipeline: Arc<IngestionRun<R, S>>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Runs once immediately, then every `interval` until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        tick(&self.pipeline, &self.in_flight).await;

        let mut scheduler = JobScheduler::new().await?;
        self.register_ingestion_job(&scheduler).await?;

        scheduler.start().await?;
        info!("Cron scheduler started");

        // Wait for cancellation
        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;

        // Let an in-flight run finish its write
        let _guard = self.in_flight.lock().await;
        Ok(())
    }

    async fn register_ingestion_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let pipeline = self.pipeline.clone();
        let in_flight = self.in_flight.clone();
        let interval = self.interval;

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let pipeline = pipeline.clone();
            let in_flight = in_flight.clone();
            Box::pin(async move {
                tick(&pipeline, &in_flight).await;
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered ingestion job (every {}s)", interval.as_secs());
        Ok(())
    }
}

/// Outcome logging happens inside `IngestionRun::run_with_state`.
async fn tick<R: ChainReader, S: SnapshotStore>(
    pipeline: &IngestionRun<R, S>,
    in_flight: &Mutex<()>,
) -> bool {
    let Ok(_guard) = in_flight.try_lock() else {
        warn!("Previous ingestion run still in flight, skipping tick");
        return false;
    };

    let (state, _) = pipeline.run_with_state().await;
    state == RunState::Succeeded
}
