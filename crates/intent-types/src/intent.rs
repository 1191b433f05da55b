use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::reason::Reason;

/// An intent as held by the source-chain registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub creator: Address,
    pub destination_chain_id: u64,
    pub inbox: Address,
    pub targets: Vec<Address>,
    pub data: Vec<Bytes>,
    pub reward_tokens: Vec<Address>,
    pub reward_amounts: Vec<U256>,
    pub expiry_time: u64,
    pub prover: Address,
    pub nonce: B256,
    pub has_been_withdrawn: bool,
}

impl Intent {
    pub fn intermediate_hash(&self, source_chain_id: u64) -> B256 {
        intermediate_hash(
            source_chain_id,
            self.destination_chain_id,
            &self.targets,
            &self.data,
            self.expiry_time,
            self.nonce,
        )
    }

    /// Identity of the intent when created on `source_chain_id`.
    pub fn hash(&self, source_chain_id: u64) -> B256 {
        intent_hash(self.inbox, self.intermediate_hash(source_chain_id))
    }
}

/// Arguments of `createIntent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIntent {
    pub destination_chain_id: u64,
    pub inbox: Address,
    pub targets: Vec<Address>,
    pub data: Vec<Bytes>,
    pub reward_tokens: Vec<Address>,
    pub reward_amounts: Vec<U256>,
    pub expiry_time: u64,
    pub prover: Address,
}

impl CreateIntent {
    /// Shape checks that do not depend on ledger state.
    pub fn validate(&self) -> Result<(), Reason> {
        if self.targets.is_empty() || self.targets.len() != self.data.len() {
            return Err(Reason::CalldataMismatch);
        }
        if self.reward_tokens.is_empty() || self.reward_tokens.len() != self.reward_amounts.len() {
            return Err(Reason::RewardsMismatch);
        }
        Ok(())
    }

    pub fn into_intent(self, creator: Address, nonce: B256) -> Intent {
        Intent {
            creator,
            destination_chain_id: self.destination_chain_id,
            inbox: self.inbox,
            targets: self.targets,
            data: self.data,
            reward_tokens: self.reward_tokens,
            reward_amounts: self.reward_amounts,
            expiry_time: self.expiry_time,
            prover: self.prover,
            nonce,
            has_been_withdrawn: false,
        }
    }
}

/// Arguments of `fulfill` on the destination inbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillRequest {
    pub source_chain_id: u64,
    pub targets: Vec<Address>,
    pub data: Vec<Bytes>,
    pub expiry_time: u64,
    pub nonce: B256,
    pub claimant: Address,
    pub expected_hash: B256,
}

impl FulfillRequest {
    /// Builds the request a solver submits for `intent`, expecting its registry hash.
    pub fn for_intent(intent: &Intent, source_chain_id: u64, claimant: Address) -> Self {
        Self {
            source_chain_id,
            targets: intent.targets.clone(),
            data: intent.data.clone(),
            expiry_time: intent.expiry_time,
            nonce: intent.nonce,
            claimant,
            expected_hash: intent.hash(source_chain_id),
        }
    }

    /// Hash of the request as seen by the inbox deployed at `inbox`.
    pub fn hash_at(&self, inbox: Address, destination_chain_id: u64) -> B256 {
        intent_hash(
            inbox,
            intermediate_hash(
                self.source_chain_id,
                destination_chain_id,
                &self.targets,
                &self.data,
                self.expiry_time,
                self.nonce,
            ),
        )
    }
}

/// `keccak256(abi.encode(sourceChainId, destinationChainId, targets, data, expiryTime, nonce))`
pub fn intermediate_hash(
    source_chain_id: u64,
    destination_chain_id: u64,
    targets: &[Address],
    data: &[Bytes],
    expiry_time: u64,
    nonce: B256,
) -> B256 {
    let encoded = (
        U256::from(source_chain_id),
        U256::from(destination_chain_id),
        targets.to_vec(),
        data.to_vec(),
        U256::from(expiry_time),
        nonce,
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// `keccak256(abi.encode(inbox, intermediateHash))`
pub fn intent_hash(inbox: Address, intermediate_hash: B256) -> B256 {
    keccak256((inbox, intermediate_hash).abi_encode_params())
}

/// Registry nonce for the `counter`-th intent on `chain_id`.
pub fn intent_nonce(counter: u64, chain_id: u64) -> B256 {
    keccak256((U256::from(counter), U256::from(chain_id)).abi_encode_params())
}
