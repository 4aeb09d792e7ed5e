//! Read-only access to a JSON-RPC chain endpoint.
//!
//! [`ChainReader`] is the seam between the pipeline and the network: the
//! production implementation is [`AlloyChainReader`], tests substitute doubles.
//! Implementations must not cache; every call is a fresh read so that the
//! valuation results and the block they are attributed to come from the same
//! node state.

use std::future::Future;

use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes};

use crate::error::RpcError;

mod rpc;

pub use rpc::AlloyChainReader;

/// Block state a view call is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadAt {
    Latest,
    Height(u64),
}

impl From<ReadAt> for BlockId {
    fn from(at: ReadAt) -> Self {
        match at {
            ReadAt::Latest => BlockId::latest(),
            ReadAt::Height(number) => BlockId::number(number),
        }
    }
}

/// Height and header timestamp (unix seconds) of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStamp {
    pub number: u64,
    pub timestamp: u64,
}

pub trait ChainReader: Send + Sync {
    /// `eth_call` against `contract`. `calldata` is the 4-byte selector followed
    /// by ABI-encoded arguments. Never submits a transaction.
    fn call_view(
        &self,
        contract: Address,
        calldata: Bytes,
        at: ReadAt,
    ) -> impl Future<Output = Result<Bytes, RpcError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Fails with [`RpcError::BlockNotFound`] if the node has not seen `number` yet.
    fn block_by_number(
        &self,
        number: u64,
    ) -> impl Future<Output = Result<BlockStamp, RpcError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;
}
