use std::fmt;

use log::{debug, error, info, warn};
use tokio::time::{timeout_at, Instant};

use crate::config::{network_name, Settings};
use crate::db::{SnapshotStore, StoreReceipt};
use crate::error::{IngestionError, Stage};
use crate::pipeline::SnapshotBuilder;
use crate::reader::ChainReader;

/// Lifecycle of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Validating,
    Reading,
    Storing,
    Succeeded,
    Failed(Stage),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed(_))
    }

    /// Forward-only transitions; any non-terminal state may fail.
    pub fn can_advance_to(&self, next: RunState) -> bool {
        match (self, next) {
            (RunState::NotStarted, RunState::Validating)
            | (RunState::Validating, RunState::Reading)
            | (RunState::Reading, RunState::Storing)
            | (RunState::Storing, RunState::Succeeded) => true,
            (current, RunState::Failed(_)) => !current.is_terminal(),
            _ => false,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.can_advance_to(next),
            "invalid run transition {} -> {}",
            self,
            next
        );
        debug!("Run state {} -> {}", self, next);
        *self = next;
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => f.write_str("not-started"),
            RunState::Validating => f.write_str("validating"),
            RunState::Reading => f.write_str("reading"),
            RunState::Storing => f.write_str("storing"),
            RunState::Succeeded => f.write_str("succeeded"),
            RunState::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}

/// One end-to-end cycle: validate settings, build a snapshot, append it.
///
/// Reader and store are injected and outlive individual runs. A run holds no
/// state of its own, so `run()` can be invoked repeatedly by a scheduler.
/// There is no retry loop here; a failed run is retried by invoking `run()`
/// again.
pub struct IngestionRun<R, S> {
    settings: Settings,
    reader: R,
    store: S,
}

impl<R: ChainReader, S: SnapshotStore> IngestionRun<R, S> {
    pub fn new(settings: Settings, reader: R, store: S) -> Self {
        Self {
            settings,
            reader,
            store,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self) -> Result<StoreReceipt, IngestionError> {
        let (_, outcome) = self.run_with_state().await;
        outcome
    }

    /// Same as [`run`](Self::run), also returning the terminal [`RunState`].
    pub async fn run_with_state(&self) -> (RunState, Result<StoreReceipt, IngestionError>) {
        let mut state = RunState::NotStarted;
        let outcome = self.execute(&mut state).await;

        match &outcome {
            Ok(_) => state.advance(RunState::Succeeded),
            Err(e) => state.advance(RunState::Failed(e.stage())),
        }
        log_outcome(state, &outcome);

        (state, outcome)
    }

    async fn execute(&self, state: &mut RunState) -> Result<StoreReceipt, IngestionError> {
        state.advance(RunState::Validating);
        let config = self.settings.validate()?;

        match network_name(config.chain_id) {
            Some(name) => info!(
                "Starting ingestion run for {} on {} ({})",
                config.contract_address, name, config.chain_id
            ),
            None => warn!(
                "Starting ingestion run for {} on unknown chain {}",
                config.contract_address, config.chain_id
            ),
        }

        // One deadline bounds the whole run
        let after = config.run_timeout;
        let deadline = Instant::now() + after;

        state.advance(RunState::Reading);
        let snapshot = timeout_at(deadline, SnapshotBuilder::new(&self.reader, &config).build())
            .await
            .map_err(|_| IngestionError::Timeout {
                stage: Stage::Read,
                after,
            })??;

        // An expired deadline here may race a committed insert
        state.advance(RunState::Storing);
        let receipt = timeout_at(deadline, self.store.append(&snapshot))
            .await
            .map_err(|_| IngestionError::Timeout {
                stage: Stage::Store,
                after,
            })??;

        Ok(receipt)
    }
}

/// Log a run outcome with its terminal state. A duplicate block is expected
/// when the chain has not advanced since the previous run and is logged as a
/// warning.
pub fn log_outcome(state: RunState, outcome: &Result<StoreReceipt, IngestionError>) {
    match outcome {
        Ok(receipt) => info!(
            "Run {}: stored snapshot #{} for chain {} block {}",
            state, receipt.id, receipt.chain_id, receipt.block_number
        ),
        Err(e) if e.is_duplicate() => {
            warn!("Run {}: skipped snapshot: {}", state, error_chain(e))
        },
        Err(e) => error!(
            "Run {} (retryable: {}): {}",
            state,
            e.is_retryable(),
            error_chain(e)
        ),
    }
}

fn error_chain(e: &IngestionError) -> String {
    let mut rendered = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
