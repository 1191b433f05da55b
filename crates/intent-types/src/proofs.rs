//! Proof bundles submitted to the prover ledger and the rules that accept them.
//!
//! Each `verify_*` function is pure: it checks the bundle against the roots the bundle itself
//! names. Whether those roots are trusted is the ledger's decision.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use evm_storage_proofs::BlockHeader;
use evm_storage_proofs::proof::{decode_account, rlp_word, verify_account, verify_storage};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainConfiguration, ProvingMechanism};
use crate::game::{GameId, GameStatusSlot};
use crate::intent::intent_hash;
use crate::output::{
    FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, FAULT_DISPUTE_GAME_STATUS_SLOT, address_word, dispute_game_slot,
    generate_output_root, inbox_fulfilled_slot, l2_output_slot,
};
use crate::reason::Reason;

/// A `(blockNumber, blockHash, stateRoot)` triple the prover trusts for some chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenState {
    pub block_number: u64,
    pub block_hash: B256,
    pub state_root: B256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedrockProof {
    pub chain_id: u64,
    pub rlp_header: Bytes,
    pub l2_state_root: B256,
    pub message_passer_storage_root: B256,
    pub output_index: U256,
    pub oracle_storage_proof: Vec<Bytes>,
    pub rlp_oracle_account: Bytes,
    pub oracle_account_proof: Vec<Bytes>,
    pub settlement_state_root: B256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputeGameFactoryProof {
    pub message_passer_storage_root: B256,
    pub latest_block_hash: B256,
    pub game_index: U256,
    pub game_id: GameId,
    pub storage_proof: Vec<Bytes>,
    pub rlp_account: Bytes,
    pub account_proof: Vec<Bytes>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultDisputeGameProof {
    pub game_state_root: B256,
    pub root_claim_storage_proof: Vec<Bytes>,
    pub status: GameStatusSlot,
    pub status_storage_proof: Vec<Bytes>,
    pub rlp_account: Bytes,
    pub account_proof: Vec<Bytes>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CannonProof {
    pub chain_id: u64,
    pub rlp_header: Bytes,
    pub l2_state_root: B256,
    pub factory: DisputeGameFactoryProof,
    pub game: FaultDisputeGameProof,
    pub settlement_state_root: B256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentProof {
    pub destination_chain_id: u64,
    pub claimant: Address,
    pub inbox: Address,
    pub intermediate_hash: B256,
    pub storage_proof: Vec<Bytes>,
    pub rlp_inbox_account: Bytes,
    pub inbox_account_proof: Vec<Bytes>,
    pub l2_state_root: B256,
}

/// Accepts a settlement-chain header whose hash equals what the blockhash oracle reports.
pub fn verify_settlement_header(rlp_header: &[u8], oracle_hash: B256) -> Result<ProvenState, Reason> {
    let header = BlockHeader::decode_rlp(rlp_header)?;
    let block_hash = keccak256(rlp_header);
    if block_hash != oracle_hash {
        return Err(Reason::SettlementBlockHashMismatch {
            expected: oracle_hash,
            actual: block_hash,
        });
    }
    Ok(ProvenState {
        block_number: header.number,
        block_hash,
        state_root: header.state_root,
    })
}

pub fn verify_bedrock(proof: &BedrockProof, config: &ChainConfiguration) -> Result<ProvenState, Reason> {
    expect_mechanism(proof.chain_id, config, ProvingMechanism::Bedrock)?;
    let state = destination_state(&proof.rlp_header, proof.l2_state_root)?;

    let output_root = generate_output_root(
        config.output_root_version,
        proof.l2_state_root,
        proof.message_passer_storage_root,
        state.block_hash,
    );
    let oracle = decode_account(&proof.rlp_oracle_account)?;
    verify_storage(
        l2_output_slot(proof.output_index),
        &rlp_word(U256::from_be_bytes(output_root.0)),
        &proof.oracle_storage_proof,
        oracle.storage_root,
    )?;
    verify_account(
        config.settlement_contract,
        &proof.rlp_oracle_account,
        &proof.oracle_account_proof,
        proof.settlement_state_root,
    )?;
    Ok(state)
}

pub fn verify_cannon(proof: &CannonProof, config: &ChainConfiguration) -> Result<ProvenState, Reason> {
    expect_mechanism(proof.chain_id, config, ProvingMechanism::Cannon)?;
    let state = destination_state(&proof.rlp_header, proof.l2_state_root)?;
    let factory = &proof.factory;
    let game = &proof.game;

    if factory.latest_block_hash != state.block_hash {
        return Err(Reason::BlockHashMismatch {
            expected: factory.latest_block_hash,
            actual: state.block_hash,
        });
    }
    let root_claim = generate_output_root(
        config.output_root_version,
        proof.l2_state_root,
        factory.message_passer_storage_root,
        state.block_hash,
    );

    let factory_account = decode_account(&factory.rlp_account)?;
    verify_storage(
        dispute_game_slot(factory.game_index),
        &rlp_word(factory.game_id.as_word()),
        &factory.storage_proof,
        factory_account.storage_root,
    )?;
    verify_account(
        config.settlement_contract,
        &factory.rlp_account,
        &factory.account_proof,
        proof.settlement_state_root,
    )?;

    let game_proxy = factory.game_id.game_proxy();
    let game_account = decode_account(&game.rlp_account)?;
    if game_account.storage_root != game.game_state_root {
        return Err(Reason::StateRootMismatch {
            header: game_account.storage_root,
            claimed: game.game_state_root,
        });
    }
    verify_storage(
        FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT,
        &rlp_word(U256::from_be_bytes(root_claim.0)),
        &game.root_claim_storage_proof,
        game.game_state_root,
    )?;
    verify_storage(
        FAULT_DISPUTE_GAME_STATUS_SLOT,
        &rlp_word(game.status.to_word()),
        &game.status_storage_proof,
        game.game_state_root,
    )?;
    verify_account(game_proxy, &game.rlp_account, &game.account_proof, proof.settlement_state_root)?;

    if !game.status.is_finalized() {
        return Err(Reason::GameNotResolved {
            game: game_proxy,
            status: game.status.game_status,
        });
    }
    Ok(state)
}

/// Checks the fulfillment record against `l2_state_root` and returns the proven intent hash.
pub fn verify_intent(proof: &IntentProof) -> Result<B256, Reason> {
    if proof.claimant.is_zero() {
        return Err(Reason::ZeroClaimant);
    }
    let hash = intent_hash(proof.inbox, proof.intermediate_hash);
    let inbox = decode_account(&proof.rlp_inbox_account)?;
    verify_storage(
        inbox_fulfilled_slot(hash),
        &rlp_word(address_word(proof.claimant)),
        &proof.storage_proof,
        inbox.storage_root,
    )?;
    verify_account(proof.inbox, &proof.rlp_inbox_account, &proof.inbox_account_proof, proof.l2_state_root)?;
    Ok(hash)
}

fn expect_mechanism(chain_id: u64, config: &ChainConfiguration, expected: ProvingMechanism) -> Result<(), Reason> {
    if config.proving_mechanism != expected {
        return Err(Reason::WrongProvingMechanism { chain_id, expected });
    }
    Ok(())
}

fn destination_state(rlp_header: &[u8], l2_state_root: B256) -> Result<ProvenState, Reason> {
    let header = BlockHeader::decode_rlp(rlp_header)?;
    if header.state_root != l2_state_root {
        return Err(Reason::StateRootMismatch {
            header: header.state_root,
            claimed: l2_state_root,
        });
    }
    Ok(ProvenState {
        block_number: header.number,
        block_hash: keccak256(rlp_header),
        state_root: header.state_root,
    })
}
