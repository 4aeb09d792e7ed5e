use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::{checksummed, iso8601};

/// One spot/oracle valuation of a token pair at a specific block.
///
/// Population: built once per ingestion run by the snapshot builder, appended
/// once to the store, never updated.
///
/// Fields are private so a snapshot cannot be altered after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    // Identifiers
    contract_address: Address,
    chain_id: u64,
    block_number: u64,

    // Valuation inputs (same order and amount for both calls)
    token0_address: Address,
    token1_address: Address,
    amount_in: U256,

    // Valuation outputs, both as of `block_number`
    fetch_spot: U256,
    fetch_oracle: U256,

    block_timestamp: DateTime<Utc>,
    /// Ingestion time, distinct from `block_timestamp`
    timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn new(
        contract_address: Address,
        chain_id: u64,
        block_number: u64,
        token0_address: Address,
        token1_address: Address,
        amount_in: U256,
        fetch_spot: U256,
        fetch_oracle: U256,
        block_timestamp: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            contract_address,
            chain_id,
            block_number,
            token0_address,
            token1_address,
            amount_in,
            fetch_spot,
            fetch_oracle,
            block_timestamp,
            timestamp,
        }
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn token0_address(&self) -> Address {
        self.token0_address
    }

    pub fn token1_address(&self) -> Address {
        self.token1_address
    }

    pub fn amount_in(&self) -> U256 {
        self.amount_in
    }

    pub fn fetch_spot(&self) -> U256 {
        self.fetch_spot
    }

    pub fn fetch_oracle(&self) -> U256 {
        self.fetch_oracle
    }

    pub fn block_timestamp(&self) -> DateTime<Utc> {
        self.block_timestamp
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Wire form of the `price_history` row.
    pub fn to_row(&self) -> SnapshotRow {
        SnapshotRow {
            contract_address: checksummed(&self.contract_address),
            chain_id: self.chain_id,
            block_number: self.block_number.to_string(),
            timestamp: iso8601(&self.timestamp),
            block_timestamp: iso8601(&self.block_timestamp),
            fetch_spot: self.fetch_spot.to_string(),
            fetch_oracle: self.fetch_oracle.to_string(),
            amount_in: self.amount_in.to_string(),
            token0_address: checksummed(&self.token0_address),
            token1_address: checksummed(&self.token1_address),
        }
    }
}

/// Persisted row shape of a [`Snapshot`].
///
/// Integers wider than a native column are decimal strings; times are
/// ISO-8601 UTC.
///
/// Query Patterns:
///   - "Spot vs oracle for contract X on chain Y over time"
///   - "Latest recorded block for contract X"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub contract_address: String,
    pub chain_id: u64,
    pub block_number: String,
    pub timestamp: String,
    pub block_timestamp: String,
    pub fetch_spot: String,
    pub fetch_oracle: String,
    pub amount_in: String,
    pub token0_address: String,
    pub token1_address: String,
}
