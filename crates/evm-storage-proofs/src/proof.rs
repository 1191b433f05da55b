use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_rpc_types::EIP1186AccountProofResponse;
use alloy_trie::{Nibbles, TrieAccount, proof::verify_proof};
use thiserror::Error;

use crate::digest_keccak;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("storage proof for slot {slot} rejected: {reason}")]
    Storage { slot: B256, reason: String },

    #[error("account proof for {address} rejected: {reason}")]
    Account { address: Address, reason: String },

    #[error("proof response is missing slot {0}")]
    MissingSlot(B256),

    #[error("malformed rlp: {0}")]
    Rlp(String),

    #[error("header {number} re-encodes to {computed} but the node reports {reported}")]
    HeaderHash { number: u64, computed: B256, reported: B256 },
}

/// Checks that `expected_value` is the leaf stored at `keccak256(slot)` under `storage_root`.
///
/// `expected_value` is the raw leaf payload, i.e. the RLP encoding of the word with its
/// leading zero bytes stripped. An empty value asserts that the slot is absent.
pub fn verify_storage(slot: B256, expected_value: &[u8], proof: &[Bytes], storage_root: B256) -> Result<(), ProofError> {
    let expected = (!expected_value.is_empty()).then(|| expected_value.to_vec());
    verify_proof(storage_root, Nibbles::unpack(digest_keccak(slot.as_slice())), expected, proof).map_err(|e| {
        ProofError::Storage {
            slot,
            reason: e.to_string(),
        }
    })
}

/// Storage proof for a full word value; zero means "slot absent".
pub fn verify_storage_word(slot: B256, value: U256, proof: &[Bytes], storage_root: B256) -> Result<(), ProofError> {
    let expected = if value.is_zero() { Vec::new() } else { rlp_word(value) };
    verify_storage(slot, &expected, proof, storage_root)
}

/// Checks that `rlp_account` is the leaf stored at `keccak256(address)` under `state_root`.
pub fn verify_account(address: Address, rlp_account: &[u8], proof: &[Bytes], state_root: B256) -> Result<(), ProofError> {
    verify_proof(
        state_root,
        Nibbles::unpack(digest_keccak(address.as_slice())),
        Some(rlp_account.to_vec()),
        proof,
    )
    .map_err(|e| ProofError::Account {
        address,
        reason: e.to_string(),
    })
}

/// Leaf encoding of a storage word.
pub fn rlp_word(value: U256) -> Vec<u8> {
    alloy_rlp::encode(value)
}

/// RLP encoding of the `(nonce, balance, storageRoot, codeHash)` account tuple.
pub fn rlp_account(nonce: u64, balance: U256, storage_root: B256, code_hash: B256) -> Vec<u8> {
    alloy_rlp::encode(TrieAccount {
        nonce,
        balance,
        storage_root,
        code_hash,
    })
}

pub fn decode_account(rlp_account: &[u8]) -> Result<TrieAccount, ProofError> {
    alloy_rlp::decode_exact(rlp_account).map_err(|e| ProofError::Rlp(e.to_string()))
}

/// Account leaf as stored in the last node of the account proof.
pub fn stored_account(account_proof: &[Bytes]) -> Result<Vec<u8>, ProofError> {
    let last = account_proof.last().ok_or_else(|| ProofError::Rlp("empty account proof".into()))?;
    let leaf_node: Vec<Bytes> = alloy_rlp::decode_exact(last).map_err(|e| ProofError::Rlp(e.to_string()))?;
    leaf_node
        .last()
        .map(|value| value.to_vec())
        .ok_or_else(|| ProofError::Rlp("empty trie node".into()))
}

/// Account tuple as reported by an EIP-1186 response.
pub fn response_account(response: &EIP1186AccountProofResponse) -> Vec<u8> {
    rlp_account(response.nonce, response.balance, response.storage_hash, response.code_hash)
}

/// Proof nodes and value for one slot of an EIP-1186 response.
pub fn storage_entry(response: &EIP1186AccountProofResponse, slot: B256) -> Result<(U256, Vec<Bytes>), ProofError> {
    response
        .storage_proof
        .iter()
        .find(|entry| entry.key.as_b256() == slot)
        .map(|entry| (entry.value, entry.proof.clone()))
        .ok_or(ProofError::MissingSlot(slot))
}

/// Verifies the account half and every storage entry of an EIP-1186 response against `state_root`.
pub fn verify_response(response: &EIP1186AccountProofResponse, state_root: B256) -> Result<(), ProofError> {
    verify_account(response.address, &response_account(response), &response.account_proof, state_root)?;
    for entry in &response.storage_proof {
        verify_storage_word(entry.key.as_b256(), entry.value, &entry.proof, response.storage_hash)?;
    }
    Ok(())
}
