//! Reference ledgers backed by an in-memory chain with real world state.
//!
//! Every transaction runs against a copy of the chain state and is committed, and mined into
//! its own block, only if it succeeds. Contract storage that proofs point into (the inbox's
//! `fulfilled` mapping, output proposals, dispute games) is written into the world state with
//! the same layout the deployed contracts use, so proofs served by [`LocalChain`] verify.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::rpc::types::EIP1186AccountProofResponse;
use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use evm_storage_proofs::memory::MemoryChain;
use evm_storage_proofs::{BlockHeader, ChainStateProvider};
use intent_types::{ChainConfigurations, LedgerEvent, LedgerResult, Reason, Receipt};
use tokio::sync::Mutex;
use tracing::debug;

mod inbox;
mod intent_source;
mod prover;
mod settlement;
mod token;

pub use token::transfer_calldata;

use inbox::InboxState;
use intent_source::IntentSourceState;
use prover::ProverState;
use settlement::SettlementState;
use token::Erc20;

#[derive(Clone, Debug)]
pub(crate) struct ChainState {
    chain_id: u64,
    now: u64,
    world: MemoryChain,
    deployments: u64,
    transactions: u64,
    events: Vec<(u64, LedgerEvent)>,
    tokens: BTreeMap<Address, Erc20>,
    intent_sources: BTreeMap<Address, IntentSourceState>,
    inboxes: BTreeMap<Address, InboxState>,
    provers: BTreeMap<Address, ProverState>,
    blockhash_oracles: BTreeMap<Address, (u64, B256)>,
    settlement: SettlementState,
}

impl ChainState {
    fn new(chain_id: u64, genesis_timestamp: u64) -> Self {
        Self {
            chain_id,
            now: genesis_timestamp,
            world: MemoryChain::new(chain_id, genesis_timestamp),
            deployments: 0,
            transactions: 0,
            events: Vec::new(),
            tokens: BTreeMap::new(),
            intent_sources: BTreeMap::new(),
            inboxes: BTreeMap::new(),
            provers: BTreeMap::new(),
            blockhash_oracles: BTreeMap::new(),
            settlement: SettlementState::default(),
        }
    }

    /// Deterministic contract address for the next deployment.
    fn next_address(&mut self) -> Address {
        self.deployments += 1;
        let salt = keccak256((U256::from(self.chain_id), U256::from(self.deployments)).abi_encode_params());
        Address::from_slice(&salt[12..])
    }

    fn deploy(&mut self, label: &str) -> Address {
        let address = self.next_address();
        self.deploy_at(address, label);
        address
    }

    fn deploy_at(&mut self, address: Address, label: &str) {
        self.world.set_code(address, label.as_bytes());
    }

    /// Mines the pending changes into a block carrying one transaction.
    fn seal(&mut self, events: Vec<LedgerEvent>) -> Receipt {
        self.transactions += 1;
        let tx_hash = keccak256((U256::from(self.chain_id), U256::from(self.transactions)).abi_encode_params());
        self.world.include_transaction(tx_hash);
        let block_number = self.world.mine(self.now);
        self.events.extend(events.iter().cloned().map(|event| (block_number, event)));
        Receipt {
            tx_hash,
            block_number,
            events,
        }
    }
}

/// A chain hosting any number of ledger contracts.
#[derive(Clone)]
pub struct LocalChain {
    state: Arc<Mutex<ChainState>>,
}

impl LocalChain {
    pub fn new(chain_id: u64, genesis_timestamp: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::new(chain_id, genesis_timestamp))),
        }
    }

    /// A handle that sends transactions as `from`.
    pub fn signer(&self, from: Address) -> LocalSigner {
        LocalSigner {
            chain: self.clone(),
            from,
        }
    }

    pub async fn chain_id(&self) -> u64 {
        self.state.lock().await.chain_id
    }

    pub async fn now(&self) -> u64 {
        self.state.lock().await.now
    }

    /// Moves the clock forward; later blocks carry the new timestamp.
    pub async fn advance_time(&self, seconds: u64) -> u64 {
        let mut state = self.state.lock().await;
        state.now += seconds;
        state.now
    }

    /// Mines an empty block at the current time.
    pub async fn mine(&self) -> u64 {
        let mut state = self.state.lock().await;
        let now = state.now;
        state.world.mine(now)
    }

    /// Events committed so far, with the block that emitted them.
    pub async fn events(&self) -> Vec<(u64, LedgerEvent)> {
        self.state.lock().await.events.clone()
    }

    pub async fn deploy_token(&self) -> Address {
        let mut state = self.state.lock().await;
        let address = state.deploy("erc20");
        state.tokens.insert(address, Erc20::default());
        address
    }

    pub async fn mint(&self, token: Address, to: Address, amount: U256) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        state
            .tokens
            .get_mut(&token)
            .ok_or(Reason::UnknownContract(token))?
            .mint(to, amount);
        Ok(())
    }

    pub async fn balance_of(&self, token: Address, owner: Address) -> LedgerResult<U256> {
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .get(&token)
            .ok_or(Reason::UnknownContract(token))?
            .balance_of(owner))
    }

    /// Registry requiring every intent to live at least `minimum_duration` seconds.
    pub async fn deploy_intent_source(&self, minimum_duration: u64) -> Address {
        let mut state = self.state.lock().await;
        let address = state.deploy("intent-source");
        state
            .intent_sources
            .insert(address, IntentSourceState::new(minimum_duration));
        address
    }

    pub async fn deploy_inbox(&self) -> Address {
        let mut state = self.state.lock().await;
        let address = state.deploy("inbox");
        state.inboxes.insert(address, InboxState::default());
        address
    }

    pub async fn deploy_prover(&self, configurations: ChainConfigurations) -> Address {
        let mut state = self.state.lock().await;
        let address = state.deploy("prover");
        state.provers.insert(address, ProverState::new(configurations));
        address
    }

    /// Installs a blockhash oracle at a fixed (predeploy) address.
    pub async fn deploy_blockhash_oracle(&self, address: Address) {
        let mut state = self.state.lock().await;
        state.deploy_at(address, "blockhash-oracle");
        state.blockhash_oracles.insert(address, (0, B256::ZERO));
    }

    /// Records the settlement block mirrored by `oracle`, as a sequencer deposit would.
    pub async fn set_settlement_block(&self, oracle: Address, number: u64, hash: B256) -> LedgerResult<Receipt> {
        self.transact(move |state| {
            let entry = state
                .blockhash_oracles
                .get_mut(&oracle)
                .ok_or(Reason::UnknownContract(oracle))?;
            *entry = (number, hash);
            Ok(((), Vec::new()))
        })
        .await
        .map(|(_, receipt)| receipt)
    }

    /// Runs `apply` against a copy of the state and commits it in a new block on success.
    pub(crate) async fn transact<T, F>(&self, apply: F) -> LedgerResult<(T, Receipt)>
    where
        T: Send,
        F: FnOnce(&mut ChainState) -> LedgerResult<(T, Vec<LedgerEvent>)> + Send,
    {
        let mut state = self.state.lock().await;
        // The event log is append-only and only touched by `seal`, so it stays out of the copy.
        let log = std::mem::take(&mut state.events);
        let mut draft = state.clone();
        let (value, events) = match apply(&mut draft) {
            Ok(applied) => applied,
            Err(reason) => {
                state.events = log;
                return Err(reason);
            }
        };
        draft.events = log;
        let receipt = draft.seal(events);
        debug!(
            chain_id = draft.chain_id,
            block = receipt.block_number,
            events = receipt.events.len(),
            "committed local transaction"
        );
        *state = draft;
        Ok((value, receipt))
    }

    pub(crate) async fn read<T>(&self, view: impl FnOnce(&ChainState) -> T + Send) -> T {
        let state = self.state.lock().await;
        view(&state)
    }
}

#[async_trait]
impl ChainStateProvider for LocalChain {
    async fn latest_block_number(&self) -> Result<u64> {
        Ok(self.state.lock().await.world.latest_block_number())
    }

    async fn header(&self, number: u64) -> Result<BlockHeader> {
        let state = self.state.lock().await;
        state
            .world
            .block_header(number)
            .cloned()
            .ok_or_else(|| anyhow!("block {number} not found on chain {}", state.chain_id))
    }

    async fn transaction_block(&self, tx_hash: B256) -> Result<u64> {
        let state = self.state.lock().await;
        state
            .world
            .transaction_block(tx_hash)
            .ok_or_else(|| anyhow!("transaction {tx_hash} not found"))
    }

    async fn account_proof(&self, address: Address, slots: Vec<B256>, number: u64) -> Result<EIP1186AccountProofResponse> {
        let state = self.state.lock().await;
        state
            .world
            .account_proof(address, &slots, number)
            .ok_or_else(|| anyhow!("block {number} not found on chain {}", state.chain_id))
    }
}

/// Sends transactions to a [`LocalChain`] from one account.
#[derive(Clone)]
pub struct LocalSigner {
    chain: LocalChain,
    from: Address,
}

impl LocalSigner {
    pub fn address(&self) -> Address {
        self.from
    }

    pub fn chain(&self) -> &LocalChain {
        &self.chain
    }

    pub async fn approve(&self, token: Address, spender: Address, amount: U256) -> LedgerResult<Receipt> {
        let from = self.from;
        self.chain
            .transact(move |state| {
                state
                    .tokens
                    .get_mut(&token)
                    .ok_or(Reason::UnknownContract(token))?
                    .approve(from, spender, amount);
                Ok(((), Vec::new()))
            })
            .await
            .map(|(_, receipt)| receipt)
    }
}

/// A signer bound to one deployed contract.
#[derive(Clone)]
pub struct LocalContract {
    signer: LocalSigner,
    address: Address,
}

impl LocalSigner {
    pub fn at(&self, address: Address) -> LocalContract {
        LocalContract {
            signer: self.clone(),
            address,
        }
    }
}

impl LocalContract {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sender(&self) -> Address {
        self.signer.from
    }

    pub(crate) fn chain(&self) -> &LocalChain {
        &self.signer.chain
    }
}
