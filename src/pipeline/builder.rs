//! Assembles one internally consistent [`Snapshot`] from paired chain reads.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use log::{debug, info};

use crate::abis::ILpManager;
use crate::config::{BlockPinning, PipelineConfig};
use crate::db::models::Snapshot;
use crate::error::SnapshotBuildError;
use crate::reader::{BlockStamp, ChainReader, ReadAt};
use crate::utils::{format_amount, timestamp_from_unix};

pub struct SnapshotBuilder<'a, R> {
    reader: &'a R,
    config: &'a PipelineConfig,
}

impl<'a, R: ChainReader> SnapshotBuilder<'a, R> {
    pub fn new(reader: &'a R, config: &'a PipelineConfig) -> Self {
        Self { reader, config }
    }

    /// Read spot and oracle valuations and the block they belong to.
    ///
    /// Either both valuations are read and decoded, or no snapshot is
    /// returned.
    pub async fn build(&self) -> Result<Snapshot, SnapshotBuildError> {
        let actual = self.reader.chain_id().await?;
        if actual != self.config.chain_id {
            return Err(SnapshotBuildError::ChainMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }

        let (fetch_spot, fetch_oracle, block) = match self.config.block_pinning {
            BlockPinning::Pinned => {
                let height = self.reader.block_number().await?;
                let (spot, oracle) = self.fetch_valuations(ReadAt::Height(height)).await?;
                let block = self.block_at(height).await?;
                (spot, oracle, block)
            },
            BlockPinning::Latest => {
                // Calls may be served from a later tip than `height`
                let (spot, oracle) = self.fetch_valuations(ReadAt::Latest).await?;
                let height = self.reader.block_number().await?;
                let block = self.block_at(height).await?;
                (spot, oracle, block)
            },
        };

        let block_timestamp = timestamp_from_unix(block.timestamp).ok_or(
            SnapshotBuildError::InvalidBlockTimestamp {
                number: block.number,
                timestamp: block.timestamp,
            },
        )?;

        let pair = &self.config.pair;
        info!(
            "Block {}: fetchSpot={} fetchOracle={} for {} of token0",
            block.number,
            fetch_spot,
            fetch_oracle,
            format_amount(pair.amount_in, pair.token0_decimals)
        );

        Ok(Snapshot::new(
            self.config.contract_address,
            self.config.chain_id,
            block.number,
            pair.token0,
            pair.token1,
            pair.amount_in,
            fetch_spot,
            fetch_oracle,
            block_timestamp,
            Utc::now(),
        ))
    }

    /// Issue both valuation calls concurrently with identical arguments.
    async fn fetch_valuations(&self, at: ReadAt) -> Result<(U256, U256), SnapshotBuildError> {
        let pair = &self.config.pair;
        let contract: Address = self.config.contract_address;

        let spot_call = ILpManager::fetchSpotCall {
            token0: pair.token0,
            token1: pair.token1,
            amountIn: pair.amount_in,
        };
        let oracle_call = ILpManager::fetchOracleCall {
            token0: pair.token0,
            token1: pair.token1,
            amountIn: pair.amount_in,
        };

        debug!("Reading valuations at {:?}", at);

        let (spot_raw, oracle_raw) = tokio::try_join!(
            self.reader
                .call_view(contract, spot_call.abi_encode().into(), at),
            self.reader
                .call_view(contract, oracle_call.abi_encode().into(), at),
        )?;

        let spot = ILpManager::fetchSpotCall::abi_decode_returns(&spot_raw).map_err(|source| {
            SnapshotBuildError::Decode {
                function: "fetchSpot",
                source,
            }
        })?;
        let oracle =
            ILpManager::fetchOracleCall::abi_decode_returns(&oracle_raw).map_err(|source| {
                SnapshotBuildError::Decode {
                    function: "fetchOracle",
                    source,
                }
            })?;

        Ok((spot, oracle))
    }

    /// Header for `height`, rejecting a node that answers with another block.
    async fn block_at(&self, height: u64) -> Result<BlockStamp, SnapshotBuildError> {
        let block = self.reader.block_by_number(height).await?;
        if block.number != height {
            return Err(SnapshotBuildError::BlockMismatch {
                requested: height,
                actual: block.number,
            });
        }
        Ok(block)
    }
}
