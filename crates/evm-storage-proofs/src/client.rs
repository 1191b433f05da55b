use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy_primitives::{Address, B256};
use alloy_rpc_types::EIP1186AccountProofResponse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::{BlockHeader, ChainStateProvider};

/// JSON-RPC backed chain reader.
#[derive(Clone)]
pub struct EvmClient {
    pub provider: DynProvider,
}

impl EvmClient {
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        Self {
            provider: provider.erased(),
        }
    }

    pub fn connect_http(url: Url) -> Self {
        Self::new(ProviderBuilder::new().connect_http(url))
    }

    // Get a Patricia Trie merkle proof for some keys under some account for a given block height.
    pub async fn get_proof(&self, keys: Vec<B256>, contract: Address, height: u64) -> Result<EIP1186AccountProofResponse> {
        let proof = self.provider.get_proof(contract, keys).block_id(height.into()).await?;
        Ok(proof)
    }

    pub async fn get_state_root(&self, height: u64) -> Result<B256> {
        Ok(self.header(height).await?.state_root)
    }
}

#[async_trait]
impl ChainStateProvider for EvmClient {
    async fn latest_block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn header(&self, number: u64) -> Result<BlockHeader> {
        let block = self
            .provider
            .get_block(number.into())
            .await?
            .with_context(|| format!("block {number} not found"))?;
        let header = BlockHeader::from(&block.header.inner);
        header.check_hash(block.header.hash)?;
        Ok(header)
    }

    async fn transaction_block(&self, tx_hash: B256) -> Result<u64> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await?
            .with_context(|| format!("transaction {tx_hash} not found"))?;
        receipt
            .block_number
            .with_context(|| format!("transaction {tx_hash} is still pending"))
    }

    async fn account_proof(&self, address: Address, slots: Vec<B256>, number: u64) -> Result<EIP1186AccountProofResponse> {
        self.get_proof(slots, address, number).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::proof::verify_response;

    // Requires a node at 127.0.0.1:8545.
    #[tokio::test]
    #[ignore]
    async fn test_live_node_proof_verifies() {
        let client = EvmClient::connect_http(Url::from_str("http://127.0.0.1:8545").unwrap());
        let height = client.latest_block_number().await.unwrap();
        let contract = Address::from_str("0x4200000000000000000000000000000000000016").unwrap();

        let proof = client.get_proof(vec![B256::ZERO], contract, height).await.unwrap();
        let state_root = client.get_state_root(height).await.unwrap();
        verify_response(&proof, state_root).unwrap();
    }
}
