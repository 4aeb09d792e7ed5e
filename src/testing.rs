//! Test doubles for the reader and store seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

use crate::abis::ILpManager;
use crate::config::{PipelineConfig, Settings};
use crate::db::models::Snapshot;
use crate::db::{SnapshotStore, StoreReceipt};
use crate::error::{RpcError, StoreError};
use crate::reader::{BlockStamp, ChainReader, ReadAt};

pub const EXAMPLE_CONTRACT: &str = "0xD6DaB267b7C23EdB2ed5605d9f3f37420e88e291";
pub const EXAMPLE_TOKEN0: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const EXAMPLE_TOKEN1: &str = "0xa411c9Aa00E020e4f88Bc19996d29c5B7ADB4ACf";
pub const EXAMPLE_CHAIN_ID: u64 = 8453;
pub const EXAMPLE_BLOCK: u64 = 12_345_678;
/// 2024-01-01T00:00:00Z
pub const EXAMPLE_BLOCK_TIMESTAMP: u64 = 1_704_067_200;

pub fn example_settings() -> Settings {
    Settings {
        rpc_url: Some("https://mainnet.base.org".to_string()),
        contract_address: Some(EXAMPLE_CONTRACT.to_string()),
        chain_id: Some(EXAMPLE_CHAIN_ID.to_string()),
        database_url: Some("postgres://spotwatch@localhost:5432/postgres".to_string()),
        database_password: Some("secret".to_string()),
        token0_address: Some(EXAMPLE_TOKEN0.to_string()),
        token1_address: Some(EXAMPLE_TOKEN1.to_string()),
        token0_decimals: Some("8".to_string()),
        ..Settings::default()
    }
}

pub fn example_config() -> PipelineConfig {
    example_settings()
        .validate()
        .expect("example settings are valid")
}

/// What the mock contract answers for one valuation function.
#[derive(Debug, Clone)]
pub enum Valuation {
    Value(U256),
    /// Raw return data, for exercising decode failures
    Raw(Vec<u8>),
    Revert,
}

#[derive(Debug, Clone)]
pub struct ViewCall {
    pub contract: Address,
    pub calldata: Bytes,
    pub at: ReadAt,
}

pub struct MockChainReader {
    chain_id: u64,
    height: u64,
    block_timestamp: u64,
    spot: Valuation,
    oracle: Valuation,
    blocks_available: bool,
    delay: Option<Duration>,
    view_calls: Mutex<Vec<ViewCall>>,
    blocks_requested: Mutex<Vec<u64>>,
    requests: AtomicUsize,
}

impl MockChainReader {
    /// Answers with the reference scenario: spot 0.995e18, oracle 1e18 at block 12345678.
    pub fn example() -> Self {
        Self {
            chain_id: EXAMPLE_CHAIN_ID,
            height: EXAMPLE_BLOCK,
            block_timestamp: EXAMPLE_BLOCK_TIMESTAMP,
            spot: Valuation::Value(U256::from(995_000_000_000_000_000u128)),
            oracle: Valuation::Value(U256::from(1_000_000_000_000_000_000u128)),
            blocks_available: true,
            delay: None,
            view_calls: Mutex::new(Vec::new()),
            blocks_requested: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_spot(mut self, spot: Valuation) -> Self {
        self.spot = spot;
        self
    }

    pub fn with_oracle(mut self, oracle: Valuation) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn without_blocks(mut self) -> Self {
        self.blocks_available = false;
        self
    }

    pub fn view_calls(&self) -> Vec<ViewCall> {
        self.view_calls.lock().unwrap().clone()
    }

    pub fn blocks_requested(&self) -> Vec<u64> {
        self.blocks_requested.lock().unwrap().clone()
    }

    /// Total requests of any kind.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ChainReader for MockChainReader {
    async fn call_view(
        &self,
        contract: Address,
        calldata: Bytes,
        at: ReadAt,
    ) -> Result<Bytes, RpcError> {
        self.request().await;
        self.view_calls.lock().unwrap().push(ViewCall {
            contract,
            calldata: calldata.clone(),
            at,
        });

        let valuation = match calldata.get(..4) {
            Some(selector) if selector == ILpManager::fetchSpotCall::SELECTOR => &self.spot,
            Some(selector) if selector == ILpManager::fetchOracleCall::SELECTOR => &self.oracle,
            _ => {
                return Err(RpcError::Node {
                    method: "eth_call",
                    code: -32000,
                    message: "execution reverted: unknown selector".to_string(),
                })
            },
        };

        match valuation {
            Valuation::Value(value) => Ok(value.abi_encode().into()),
            Valuation::Raw(raw) => Ok(Bytes::from(raw.clone())),
            Valuation::Revert => Err(RpcError::Node {
                method: "eth_call",
                code: 3,
                message: "execution reverted".to_string(),
            }),
        }
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.request().await;
        Ok(self.height)
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockStamp, RpcError> {
        self.request().await;
        self.blocks_requested.lock().unwrap().push(number);
        if !self.blocks_available {
            return Err(RpcError::BlockNotFound(number));
        }
        Ok(BlockStamp {
            number,
            timestamp: self.block_timestamp,
        })
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.request().await;
        Ok(self.chain_id)
    }
}

/// In-memory store enforcing the same uniqueness key as `price_history`.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Snapshot>>,
    append_calls: AtomicUsize,
    /// Applied after the row is written, like a commit whose reply is slow
    ack_delay: Option<Duration>,
}

impl InMemoryStore {
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = Some(delay);
        self
    }

    pub fn rows(&self) -> Vec<Snapshot> {
        self.rows.lock().unwrap().clone()
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for InMemoryStore {
    async fn append(&self, snapshot: &Snapshot) -> Result<StoreReceipt, StoreError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        let id = {
            let mut rows = self.rows.lock().unwrap();
            let exists = rows.iter().any(|row| {
                row.contract_address() == snapshot.contract_address()
                    && row.chain_id() == snapshot.chain_id()
                    && row.block_number() == snapshot.block_number()
            });
            if exists {
                return Err(StoreError::Duplicate {
                    chain_id: snapshot.chain_id(),
                    block_number: snapshot.block_number(),
                });
            }

            rows.push(snapshot.clone());
            rows.len() as i64
        };

        if let Some(delay) = self.ack_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(StoreReceipt {
            id,
            chain_id: snapshot.chain_id(),
            block_number: snapshot.block_number(),
        })
    }
}
