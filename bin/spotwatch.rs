use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use spotwatch::pipeline::RunState;
use spotwatch::{AlloyChainReader, CronScheduler, IngestionRun, PostgresClient, Settings, Stage};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Clients are only built from a valid configuration; the run re-validates
    // and reports the same error under the config stage.
    let config = match settings.validate() {
        Ok(config) => config,
        Err(e) => {
            let err = spotwatch::IngestionError::from(e);
            spotwatch::pipeline::log_outcome(RunState::Failed(Stage::Config), &Err(err));
            anyhow::bail!("Ingestion run failed at config stage");
        },
    };

    let reader = AlloyChainReader::new(config.rpc_url.clone(), config.rpc_timeout);

    let store = PostgresClient::new(config.database.clone(), config.pool_size)
        .await
        .context("Failed to initialize database connection")?;
    store.health_check().await?;
    store.migrate().await?;

    let pipeline = Arc::new(IngestionRun::new(settings, reader, store));

    match config.interval {
        None => {
            let receipt = pipeline.run().await;
            receipt
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Ingestion run failed at {} stage", e.stage()))
        },
        Some(interval) => run_scheduled(pipeline, interval).await,
    }
}

async fn run_scheduled(
    pipeline: Arc<IngestionRun<AlloyChainReader, PostgresClient>>,
    interval: std::time::Duration,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let scheduler = CronScheduler::new(pipeline.clone(), interval);
    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move { scheduler.run(cron_token).await });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Snapshotter running every {:?}. Press Ctrl+C to stop.", interval);

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    info!("Waiting for cron scheduler to stop...");
    cron_handle
        .await
        .context("Cron scheduler task panicked")?
        .context("Cron scheduler failed")?;

    pipeline.store().pool.close();
    info!("Snapshotter stopped");
    Ok(())
}
