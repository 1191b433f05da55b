//! An in-memory execution chain that keeps real Merkle-Patricia world state.
//!
//! Every mined block snapshots the accounts, so proofs can be served for any historical
//! height exactly as an archive node would.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_rpc_types::{EIP1186AccountProofResponse, EIP1186StorageProof};
use alloy_trie::{EMPTY_ROOT_HASH, HashBuilder, KECCAK_EMPTY, Nibbles, proof::ProofRetainer};
use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::{BlockHeader, ChainStateProvider, proof};

/// keccak256(rlp([])), the ommers hash of every post-merge block.
const EMPTY_OMMERS_HASH: B256 = alloy_primitives::b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");
const GAS_LIMIT: u64 = 30_000_000;
const BASE_FEE: u64 = 1_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
    pub storage: BTreeMap<B256, U256>,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
            storage: BTreeMap::new(),
        }
    }
}

impl AccountState {
    fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == KECCAK_EMPTY && self.storage.is_empty()
    }

    fn storage_leaves(&self) -> BTreeMap<B256, Vec<u8>> {
        self.storage
            .iter()
            .map(|(slot, value)| (keccak256(slot), proof::rlp_word(*value)))
            .collect()
    }

    fn storage_root(&self) -> B256 {
        trie_with_proofs(&self.storage_leaves(), &[]).0
    }
}

#[derive(Clone, Debug)]
struct MinedBlock {
    header: BlockHeader,
    hash: B256,
    accounts: BTreeMap<Address, AccountState>,
}

#[derive(Clone, Debug)]
pub struct MemoryChain {
    chain_id: u64,
    accounts: BTreeMap<Address, AccountState>,
    // Snapshots are immutable once mined and shared between clones of the chain.
    blocks: Vec<Arc<MinedBlock>>,
    transactions: HashMap<B256, u64>,
    pending: Vec<B256>,
}

impl MemoryChain {
    /// Creates the chain with an empty genesis block at `genesis_timestamp`.
    pub fn new(chain_id: u64, genesis_timestamp: u64) -> Self {
        let mut chain = Self {
            chain_id,
            accounts: BTreeMap::new(),
            blocks: Vec::new(),
            transactions: HashMap::new(),
            pending: Vec::new(),
        };
        chain.mine(genesis_timestamp);
        chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn account(&self, address: Address) -> Option<&AccountState> {
        self.accounts.get(&address)
    }

    pub fn storage(&self, address: Address, slot: B256) -> U256 {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&slot).copied())
            .unwrap_or_default()
    }

    /// Writes a storage word; zero deletes the slot.
    pub fn set_storage(&mut self, address: Address, slot: B256, value: U256) {
        let account = self.accounts.entry(address).or_default();
        if value.is_zero() {
            account.storage.remove(&slot);
        } else {
            account.storage.insert(slot, value);
        }
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Marks `address` as a contract account with the given runtime code.
    pub fn set_code(&mut self, address: Address, code: &[u8]) {
        let account = self.accounts.entry(address).or_default();
        account.code_hash = keccak256(code);
        account.nonce = account.nonce.max(1);
    }

    /// Queues a transaction hash for inclusion in the next mined block.
    pub fn include_transaction(&mut self, tx_hash: B256) {
        self.pending.push(tx_hash);
    }

    /// Seals the current state into a new block and returns its number.
    pub fn mine(&mut self, timestamp: u64) -> u64 {
        let number = self.blocks.len() as u64;
        let parent_hash = self.blocks.last().map(|block| block.hash).unwrap_or_default();
        let header = BlockHeader {
            parent_hash,
            ommers_hash: EMPTY_OMMERS_HASH,
            state_root: self.state_root(),
            transactions_root: EMPTY_ROOT_HASH,
            receipts_root: EMPTY_ROOT_HASH,
            number,
            gas_limit: GAS_LIMIT,
            gas_used: 21_000 * self.pending.len() as u64,
            timestamp,
            extra_data: Bytes::copy_from_slice(&self.chain_id.to_be_bytes()),
            base_fee_per_gas: Some(BASE_FEE),
            withdrawals_root: Some(EMPTY_ROOT_HASH),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(0),
            parent_beacon_block_root: Some(keccak256(number.to_be_bytes())),
            ..Default::default()
        };
        let hash = header.hash_slow();
        for tx_hash in self.pending.drain(..) {
            self.transactions.insert(tx_hash, number);
        }
        self.blocks.push(Arc::new(MinedBlock {
            header,
            hash,
            accounts: self.accounts.clone(),
        }));
        number
    }

    pub fn latest_block_number(&self) -> u64 {
        self.blocks.len().saturating_sub(1) as u64
    }

    pub fn block_header(&self, number: u64) -> Option<&BlockHeader> {
        self.blocks.get(number as usize).map(|block| &block.header)
    }

    pub fn block_hash(&self, number: u64) -> Option<B256> {
        self.blocks.get(number as usize).map(|block| block.hash)
    }

    pub fn transaction_block(&self, tx_hash: B256) -> Option<u64> {
        self.transactions.get(&tx_hash).copied()
    }

    /// Storage word as of block `number`; `None` if the block does not exist.
    pub fn storage_at(&self, address: Address, slot: B256, number: u64) -> Option<U256> {
        let block = self.blocks.get(number as usize)?;
        Some(
            block
                .accounts
                .get(&address)
                .and_then(|account| account.storage.get(&slot).copied())
                .unwrap_or_default(),
        )
    }

    /// EIP-1186 proof of `address` and `slots` at block `number`.
    pub fn account_proof(&self, address: Address, slots: &[B256], number: u64) -> Option<EIP1186AccountProofResponse> {
        let block = self.blocks.get(number as usize)?;
        let account = block.accounts.get(&address).cloned().unwrap_or_default();

        let state_leaves = state_leaves(&block.accounts);
        let (_, mut account_proofs) = trie_with_proofs(&state_leaves, &[keccak256(address)]);

        let hashed_slots: Vec<B256> = slots.iter().map(keccak256).collect();
        let (storage_hash, storage_proofs) = trie_with_proofs(&account.storage_leaves(), &hashed_slots);
        let storage_proof = slots
            .iter()
            .zip(storage_proofs)
            .map(|(slot, proof)| EIP1186StorageProof {
                key: (*slot).into(),
                value: account.storage.get(slot).copied().unwrap_or_default(),
                proof,
            })
            .collect();

        Some(EIP1186AccountProofResponse {
            address,
            balance: account.balance,
            code_hash: account.code_hash,
            nonce: account.nonce,
            storage_hash,
            account_proof: account_proofs.pop().unwrap_or_default(),
            storage_proof,
        })
    }

    fn state_root(&self) -> B256 {
        trie_with_proofs(&state_leaves(&self.accounts), &[]).0
    }
}

fn state_leaves(accounts: &BTreeMap<Address, AccountState>) -> BTreeMap<B256, Vec<u8>> {
    accounts
        .iter()
        .filter(|(_, account)| !account.is_empty())
        .map(|(address, account)| {
            let leaf = proof::rlp_account(account.nonce, account.balance, account.storage_root(), account.code_hash);
            (keccak256(address), leaf)
        })
        .collect()
}

/// Builds a trie over hashed keys (already sorted by the map) and retains the proof
/// nodes for each target, root first.
fn trie_with_proofs(leaves: &BTreeMap<B256, Vec<u8>>, targets: &[B256]) -> (B256, Vec<Vec<Bytes>>) {
    let target_keys: Vec<Nibbles> = targets.iter().map(|key| Nibbles::unpack(key)).collect();
    let retainer = ProofRetainer::new(target_keys.clone());
    let mut builder = HashBuilder::default().with_proof_retainer(retainer);

    for (key, value) in leaves {
        builder.add_leaf(Nibbles::unpack(key), value);
    }

    let root = builder.root();
    let proof_nodes = builder.take_proof_nodes();
    let proofs = target_keys
        .iter()
        .map(|target| {
            proof_nodes
                .matching_nodes_sorted(target)
                .into_iter()
                .map(|(_, node)| node)
                .collect()
        })
        .collect();

    (root, proofs)
}

#[async_trait]
impl ChainStateProvider for MemoryChain {
    async fn latest_block_number(&self) -> Result<u64> {
        Ok(MemoryChain::latest_block_number(self))
    }

    async fn header(&self, number: u64) -> Result<BlockHeader> {
        self.block_header(number)
            .cloned()
            .ok_or_else(|| anyhow!("block {number} not found on chain {}", self.chain_id))
    }

    async fn transaction_block(&self, tx_hash: B256) -> Result<u64> {
        MemoryChain::transaction_block(self, tx_hash).ok_or_else(|| anyhow!("transaction {tx_hash} not found"))
    }

    async fn account_proof(&self, address: Address, slots: Vec<B256>, number: u64) -> Result<EIP1186AccountProofResponse> {
        MemoryChain::account_proof(self, address, &slots, number)
            .ok_or_else(|| anyhow!("block {number} not found on chain {}", self.chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{verify_account, verify_response, verify_storage_word};
    use alloy_primitives::address;

    const CONTRACT: Address = address!("4200000000000000000000000000000000000016");

    #[test]
    fn test_headers_chain_and_hash() {
        let mut chain = MemoryChain::new(10, 100);
        chain.set_storage(CONTRACT, B256::ZERO, U256::from(1));
        let tx = B256::repeat_byte(9);
        chain.include_transaction(tx);
        let number = chain.mine(102);

        let header = chain.block_header(number).unwrap();
        assert_eq!(number, 1);
        assert_eq!(header.parent_hash, chain.block_hash(0).unwrap());
        assert_eq!(header.hash_slow(), chain.block_hash(1).unwrap());
        assert_ne!(header.state_root, chain.block_header(0).unwrap().state_root);
        assert_eq!(chain.transaction_block(tx), Some(1));
    }

    #[test]
    fn test_clones_share_mined_history() {
        let mut chain = MemoryChain::new(10, 100);
        chain.set_storage(CONTRACT, B256::ZERO, U256::from(1));
        chain.mine(102);

        let mut draft = chain.clone();
        assert!(Arc::ptr_eq(&chain.blocks[1], &draft.blocks[1]));
        draft.set_storage(CONTRACT, B256::ZERO, U256::from(2));
        draft.mine(104);

        assert_eq!(chain.latest_block_number(), 1);
        assert_eq!(draft.storage_at(CONTRACT, B256::ZERO, 1), Some(U256::from(1)));
        assert_eq!(draft.storage_at(CONTRACT, B256::ZERO, 2), Some(U256::from(2)));
    }

    #[test]
    fn test_single_slot_account_proves() {
        let mut chain = MemoryChain::new(10, 100);
        chain.set_storage(CONTRACT, B256::ZERO, U256::from(0xdead));
        let number = chain.mine(102);
        let root = chain.block_header(number).unwrap().state_root;

        let response = chain.account_proof(CONTRACT, &[B256::ZERO], number).unwrap();
        verify_response(&response, root).unwrap();
        assert_eq!(response.storage_proof[0].value, U256::from(0xdead));
    }

    #[test]
    fn test_historical_proofs_are_pinned() {
        let mut chain = MemoryChain::new(1, 0);
        chain.set_storage(CONTRACT, B256::ZERO, U256::from(1));
        let first = chain.mine(12);
        chain.set_storage(CONTRACT, B256::ZERO, U256::from(2));
        let second = chain.mine(24);

        let old = chain.account_proof(CONTRACT, &[B256::ZERO], first).unwrap();
        let new = chain.account_proof(CONTRACT, &[B256::ZERO], second).unwrap();
        assert_eq!(old.storage_proof[0].value, U256::from(1));
        assert_eq!(new.storage_proof[0].value, U256::from(2));

        let first_root = chain.block_header(first).unwrap().state_root;
        verify_response(&old, first_root).unwrap();
        assert!(verify_response(&new, first_root).is_err());
        assert!(
            verify_storage_word(B256::ZERO, U256::from(2), &old.storage_proof[0].proof, old.storage_hash).is_err()
        );
    }

    #[test]
    fn test_empty_accounts_are_not_in_state() {
        let mut chain = MemoryChain::new(1, 0);
        chain.set_balance(Address::repeat_byte(1), U256::from(5));
        let number = chain.mine(12);
        let root = chain.block_header(number).unwrap().state_root;

        let absent = chain.account_proof(CONTRACT, &[], number).unwrap();
        assert_eq!(absent.storage_hash, EMPTY_ROOT_HASH);
        let leaf = proof::response_account(&absent);
        assert!(verify_account(CONTRACT, &leaf, &absent.account_proof, root).is_err());
    }

    #[tokio::test]
    async fn test_provider_reads() {
        let mut chain = MemoryChain::new(8453, 0);
        chain.set_code(CONTRACT, b"code");
        chain.mine(2);

        let provider: &dyn ChainStateProvider = &chain;
        assert_eq!(provider.latest_block_number().await.unwrap(), 1);
        assert_eq!(provider.header(1).await.unwrap().number, 1);
        assert!(provider.header(2).await.is_err());
        assert!(provider.transaction_block(B256::ZERO).await.is_err());

        let response = provider.account_proof(CONTRACT, vec![], 1).await.unwrap();
        assert_eq!(response.nonce, 1);
        assert_eq!(response.code_hash, keccak256(b"code"));
    }
}
