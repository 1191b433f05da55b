//! World-state proofs for chains whose outputs are committed to an L2OutputOracle.

use alloy_primitives::B256;
use evm_storage_proofs::proof::{response_account, storage_entry};
use intent_types::chain::L2_TO_L1_MESSAGE_PASSER;
use intent_types::output::{generate_output_root, l2_output_slot};
use intent_types::proofs::verify_bedrock;
use intent_types::{BedrockProof, ChainConfiguration, LedgerResult, ProvenState, Reason};
use tracing::{debug, info};

use super::context::ChainContext;

/// Proves the destination block covered by the first output proposed at or after
/// `fulfillment_block`, as the oracle stood at the `anchor` settlement block.
pub async fn prove_world_state(
    source: &ChainContext,
    settlement: &ChainContext,
    destination: &ChainContext,
    config: &ChainConfiguration,
    anchor: &ProvenState,
    fulfillment_block: u64,
) -> LedgerResult<ProvenState> {
    let oracle = config.settlement_contract;
    let output = settlement
        .settlement
        .output_after(oracle, fulfillment_block, anchor.block_number)
        .await?;
    debug!(index = %output.index, l2_block = output.l2_block_number, "found covering output");

    let slot = l2_output_slot(output.index);
    let (oracle_proof, header, message_passer) = tokio::try_join!(
        settlement.provider.account_proof(oracle, vec![slot], anchor.block_number),
        destination.provider.header(output.l2_block_number),
        destination
            .provider
            .account_proof(L2_TO_L1_MESSAGE_PASSER, Vec::new(), output.l2_block_number),
    )?;

    let computed = generate_output_root(
        config.output_root_version,
        header.state_root,
        message_passer.storage_hash,
        header.hash_slow(),
    );
    let (committed, oracle_storage_proof) = storage_entry(&oracle_proof, slot)?;
    let committed = B256::from(committed);
    if computed != committed {
        return Err(Reason::OutputRootMismatch { computed, committed });
    }

    let proof = BedrockProof {
        chain_id: destination.chain_id,
        rlp_header: header.encode_rlp(),
        l2_state_root: header.state_root,
        message_passer_storage_root: message_passer.storage_hash,
        output_index: output.index,
        oracle_storage_proof,
        rlp_oracle_account: response_account(&oracle_proof).into(),
        oracle_account_proof: oracle_proof.account_proof.clone(),
        settlement_state_root: anchor.state_root,
    };
    let proven = verify_bedrock(&proof, config)?;
    source.prover.prove_world_state_bedrock(proof).await?;

    info!(
        destination_chain = destination.chain_id,
        block = proven.block_number,
        state_root = %proven.state_root,
        "destination state proven through output oracle"
    );
    Ok(proven)
}
