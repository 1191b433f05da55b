use alloy_primitives::{Address, B256};
use evm_storage_proofs::proof::{response_account, storage_entry};
use intent_types::output::{inbox_fulfilled_slot, word_address};
use intent_types::proofs::verify_intent;
use intent_types::{Intent, IntentProof, LedgerResult, ProvenState, Reason, Receipt};
use tracing::info;

use super::context::ChainContext;

/// Proves the inbox's fulfillment record for `intent_hash` against the proven destination
/// state and records the claimant on the source prover.
pub async fn prove_intent(
    source: &ChainContext,
    destination: &ChainContext,
    intent: &Intent,
    intent_hash: B256,
    destination_state: &ProvenState,
) -> LedgerResult<(Address, Receipt)> {
    let slot = inbox_fulfilled_slot(intent_hash);
    let response = destination
        .provider
        .account_proof(intent.inbox, vec![slot], destination_state.block_number)
        .await?;
    let (record, storage_proof) = storage_entry(&response, slot)?;
    if record.is_zero() {
        return Err(Reason::IntentNotFulfilled(intent_hash));
    }
    let claimant = word_address(record);

    let proof = IntentProof {
        destination_chain_id: destination.chain_id,
        claimant,
        inbox: intent.inbox,
        intermediate_hash: intent.intermediate_hash(source.chain_id),
        storage_proof,
        rlp_inbox_account: response_account(&response).into(),
        inbox_account_proof: response.account_proof.clone(),
        l2_state_root: destination_state.state_root,
    };
    verify_intent(&proof)?;
    let receipt = source.prover.prove_intent(proof).await?;

    info!(hash = %intent_hash, %claimant, block = receipt.block_number, "intent proven");
    Ok((claimant, receipt))
}
