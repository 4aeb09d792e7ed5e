use std::future::IntoFuture;
use std::time::Duration;

use alloy::consensus::BlockHeader as _;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::transports::TransportResult;
use url::Url;

use super::{BlockStamp, ChainReader, ReadAt};
use crate::error::RpcError;

/// [`ChainReader`] over an HTTP JSON-RPC endpoint.
///
/// Built once at startup and shared across runs. Holds no state besides the
/// provider, so runs never observe each other's reads.
#[derive(Clone)]
pub struct AlloyChainReader {
    provider: DynProvider,
    /// Upper bound for each individual RPC call
    timeout: Duration,
}

impl AlloyChainReader {
    /// Does not touch the network; the first request opens the connection.
    pub fn new(rpc_url: Url, timeout: Duration) -> Self {
        let client = ProviderBuilder::new().connect_http(rpc_url);

        Self {
            provider: DynProvider::new(client),
            timeout,
        }
    }

    async fn timed<T, F>(&self, method: &'static str, request: F) -> Result<T, RpcError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::from_transport(method, e)),
            Err(_) => Err(RpcError::Timeout {
                method,
                after: self.timeout,
            }),
        }
    }
}

impl ChainReader for AlloyChainReader {
    async fn call_view(
        &self,
        contract: Address,
        calldata: Bytes,
        at: ReadAt,
    ) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default()
            .to(contract)
            .input(TransactionInput::new(calldata));

        self.timed("eth_call", self.provider.call(tx).block(at.into()))
            .await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.timed("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockStamp, RpcError> {
        let block = self
            .timed(
                "eth_getBlockByNumber",
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(number)),
            )
            .await?
            .ok_or(RpcError::BlockNotFound(number))?;

        Ok(BlockStamp {
            number: block.header.number(),
            timestamp: block.header.timestamp(),
        })
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.timed("eth_chainId", self.provider.get_chain_id())
            .await
    }
}
