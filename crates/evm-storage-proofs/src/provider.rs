use alloy_primitives::{Address, B256};
use alloy_rpc_types::EIP1186AccountProofResponse;
use anyhow::Result;
use async_trait::async_trait;

use crate::BlockHeader;

/// Read access to one execution chain. Every state read is pinned to an explicit height.
#[async_trait]
pub trait ChainStateProvider: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64>;

    async fn header(&self, number: u64) -> Result<BlockHeader>;

    /// Number of the block that included `tx_hash`.
    async fn transaction_block(&self, tx_hash: B256) -> Result<u64>;

    async fn account_proof(&self, address: Address, slots: Vec<B256>, number: u64) -> Result<EIP1186AccountProofResponse>;
}
