use std::future::Future;

use crate::error::StoreError;

pub mod models;
pub mod postgres;

pub use models::{Snapshot, SnapshotRow};
pub use postgres::PostgresClient;

/// Append-only persistence for snapshots.
///
/// One call, one write, no internal retries. No update or delete is exposed.
pub trait SnapshotStore: Send + Sync {
    fn append(
        &self,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<StoreReceipt, StoreError>> + Send;
}

/// Acknowledgement of a stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Row id assigned by the store
    pub id: i64,
    pub chain_id: u64,
    pub block_number: u64,
}
