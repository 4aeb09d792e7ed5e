use log::error;
use tokio_postgres::error::SqlState;

use crate::db::models::Snapshot;
use crate::db::postgres::PostgresClient;
use crate::db::{SnapshotStore, StoreReceipt};
use crate::error::StoreError;

impl PostgresClient {
    // ==================== PRICE HISTORY ====================

    /// Insert one snapshot row, returning its generated id.
    ///
    /// Plain INSERT: a second snapshot for the same
    /// `(contract_address, chain_id, block_number)` trips the unique constraint
    /// and is reported as [`StoreError::Duplicate`].
    pub async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64, StoreError> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO price_history (
                contract_address, chain_id, block_number, timestamp, block_timestamp,
                fetch_spot, fetch_oracle, amount_in, token0_address, token1_address
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
        "#;

        let row = snapshot.to_row();
        // Validated to fit BIGINT at config time
        let chain_id = snapshot.chain_id() as i64;
        let timestamp = snapshot.timestamp();
        let block_timestamp = snapshot.block_timestamp();

        let inserted = client
            .query_one(
                query,
                &[
                    &row.contract_address,
                    &chain_id,
                    &row.block_number,
                    &timestamp,
                    &block_timestamp,
                    &row.fetch_spot,
                    &row.fetch_oracle,
                    &row.amount_in,
                    &row.token0_address,
                    &row.token1_address,
                ],
            )
            .await;

        match inserted {
            Ok(result) => Ok(result.get("id")),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate {
                    chain_id: snapshot.chain_id(),
                    block_number: snapshot.block_number(),
                })
            },
            Err(e) => {
                error!(
                    "Failed to insert snapshot for block {}: {:?}",
                    snapshot.block_number(),
                    e
                );
                Err(e.into())
            },
        }
    }
}

impl SnapshotStore for PostgresClient {
    async fn append(&self, snapshot: &Snapshot) -> Result<StoreReceipt, StoreError> {
        let id = self.insert_snapshot(snapshot).await?;

        Ok(StoreReceipt {
            id,
            chain_id: snapshot.chain_id(),
            block_number: snapshot.block_number(),
        })
    }
}
