//! Error taxonomy for the snapshot pipeline.
//!
//! Every failure surfaces to the caller tagged with the [`Stage`] it came from,
//! so a scheduler can tell a transient RPC fault from a permanent configuration
//! fault without string matching.

use std::fmt;
use std::time::Duration;

use alloy::transports::TransportError;
use thiserror::Error;

/// Stage of an ingestion run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Config,
    Read,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Config => "config",
            Stage::Read => "read",
            Stage::Store => "store",
        })
    }
}

/// Missing or malformed setting. Never retryable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("malformed setting {key}: {reason}")]
    Malformed { key: &'static str, reason: String },
    #[error("failed to load configuration sources")]
    Load(#[from] ::config::ConfigError),
}

impl ConfigError {
    pub(crate) fn malformed(key: &'static str, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single read against the chain endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{method} failed at the transport layer")]
    Transport {
        method: &'static str,
        #[source]
        source: TransportError,
    },
    /// The node answered with a JSON-RPC error object. Contract reverts land here.
    #[error("{method} rejected by node (code {code}): {message}")]
    Node {
        method: &'static str,
        code: i64,
        message: String,
    },
    #[error("{method} timed out after {after:?}")]
    Timeout {
        method: &'static str,
        after: Duration,
    },
    /// The queried node has not seen this height yet.
    #[error("block {0} not found on node")]
    BlockNotFound(u64),
}

impl RpcError {
    /// Classifies an alloy transport error for `method`.
    pub(crate) fn from_transport(method: &'static str, err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Node {
                method,
                code: payload.code,
                message: payload.message.to_string(),
            },
            None => Self::Transport {
                method,
                source: err,
            },
        }
    }
}

/// Failure to assemble a consistent snapshot. Nothing is written when this occurs.
#[derive(Debug, Error)]
pub enum SnapshotBuildError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("{function} returned data that does not decode as uint256")]
    Decode {
        function: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },
    #[error("endpoint serves chain {actual}, expected chain {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("node returned block {actual} when asked for block {requested}")]
    BlockMismatch { requested: u64, actual: u64 },
    #[error("block {number} carries unrepresentable timestamp {timestamp}")]
    InvalidBlockTimestamp { number: u64, timestamp: u64 },
}

/// Persistence rejected the write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The uniqueness constraint on `(contract_address, chain_id, block_number)` fired.
    #[error("snapshot for chain {chain_id} block {block_number} is already recorded")]
    Duplicate { chain_id: u64, block_number: u64 },
    #[error("failed to acquire a database connection")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("database rejected the write")]
    Rejected(#[from] tokio_postgres::Error),
}

/// Outcome of a failed ingestion run.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("configuration invalid")]
    Config(#[from] ConfigError),
    #[error("snapshot read failed")]
    Read(#[from] SnapshotBuildError),
    #[error("snapshot store failed")]
    Store(#[from] StoreError),
    /// The run deadline expired. A store-stage timeout does not prove that
    /// nothing was written: the insert may have committed before its reply
    /// arrived. A retry then reports the block as a duplicate.
    #[error("{stage} stage timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

impl IngestionError {
    pub fn stage(&self) -> Stage {
        match self {
            IngestionError::Config(_) => Stage::Config,
            IngestionError::Read(_) => Stage::Read,
            IngestionError::Store(_) => Stage::Store,
            IngestionError::Timeout { stage, .. } => *stage,
        }
    }

    /// Whether re-invoking the whole run may succeed.
    ///
    /// Decode and chain mismatches point at a wrong contract, ABI or endpoint
    /// and will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestionError::Config(_) => false,
            IngestionError::Read(e) => matches!(
                e,
                SnapshotBuildError::Rpc(_) | SnapshotBuildError::BlockMismatch { .. }
            ),
            IngestionError::Store(_) => true,
            IngestionError::Timeout { .. } => true,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestionError::Store(StoreError::Duplicate { .. }))
    }
}
