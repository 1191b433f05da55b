use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use evm_storage_proofs::ChainStateProvider;
use evm_storage_proofs::client::EvmClient;
use intent_ledger::rpc::{connect_http, connect_http_with_signer};
use intent_ledger::{
    BlockhashOracle, InboxLedger, IntentSourceLedger, LocalChain, ProverLedger, RpcContract, RpcReader,
    SettlementReader,
};
use url::Url;

use crate::config::{ChainSettings, ContractAddresses, ProvingSettings};

/// Handles for one chain: state reads pinned to explicit heights, plus the ledger contracts
/// reachable through its signer.
#[derive(Clone)]
pub struct ChainContext {
    pub chain_id: u64,
    pub provider: Arc<dyn ChainStateProvider>,
    pub settlement: Arc<dyn SettlementReader>,
    pub oracle: Arc<dyn BlockhashOracle>,
    pub intent_source: Arc<dyn IntentSourceLedger>,
    pub inbox: Arc<dyn InboxLedger>,
    pub prover: Arc<dyn ProverLedger>,
    pub contracts: ContractAddresses,
    pub proving: Option<ProvingSettings>,
}

impl ChainContext {
    /// Connects to a JSON-RPC node, signing with the configured key when one is set.
    pub fn connect(chain_id: u64, settings: &ChainSettings) -> Result<Self> {
        let url: Url = settings
            .rpc_url
            .parse()
            .with_context(|| format!("invalid rpc url for chain {chain_id}"))?;
        let provider = match settings.signer()? {
            Some(signer) => connect_http_with_signer(url, signer),
            None => connect_http(url),
        };
        let contract = |address: Address| Arc::new(RpcContract::new(provider.clone(), address));
        let reader = Arc::new(RpcReader::new(provider.clone()));

        Ok(Self {
            chain_id,
            provider: Arc::new(EvmClient::new(provider.clone())),
            settlement: reader.clone(),
            oracle: reader,
            intent_source: contract(settings.contracts.intent_source),
            inbox: contract(settings.contracts.inbox),
            prover: contract(settings.contracts.prover),
            contracts: settings.contracts,
            proving: settings.proving.clone(),
        })
    }

    /// Wraps an in-memory chain, sending transactions as `sender`.
    pub async fn local(
        chain: &LocalChain,
        sender: Address,
        contracts: ContractAddresses,
        proving: Option<ProvingSettings>,
    ) -> Self {
        let signer = chain.signer(sender);
        Self {
            chain_id: chain.chain_id().await,
            provider: Arc::new(chain.clone()),
            settlement: Arc::new(chain.clone()),
            oracle: Arc::new(chain.clone()),
            intent_source: Arc::new(signer.at(contracts.intent_source)),
            inbox: Arc::new(signer.at(contracts.inbox)),
            prover: Arc::new(signer.at(contracts.prover)),
            contracts,
            proving,
        }
    }

    pub fn game_search(&self) -> (u32, u64) {
        self.proving
            .as_ref()
            .map(|proving| (proving.game_type, proving.game_scan_depth))
            .unwrap_or((0, 50))
    }
}
