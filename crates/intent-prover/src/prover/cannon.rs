//! World-state proofs for chains whose outputs are claimed by fault dispute games.

use alloy_primitives::{Address, B256, U256};
use evm_storage_proofs::proof::{response_account, storage_entry};
use intent_ledger::GameSummary;
use intent_types::chain::L2_TO_L1_MESSAGE_PASSER;
use intent_types::output::{
    FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, FAULT_DISPUTE_GAME_STATUS_SLOT, dispute_game_slot, generate_output_root,
};
use intent_types::proofs::{DisputeGameFactoryProof, FaultDisputeGameProof, verify_cannon};
use intent_types::{CannonProof, ChainConfiguration, GameStatusSlot, LedgerResult, ProvenState, Reason};
use tracing::{debug, info};

use super::context::ChainContext;

/// Picks the newest finalized game of `game_type` claiming a block at or after
/// `fulfillment_block`, searching at most `depth` games back from the newest.
pub async fn find_resolved_game(
    settlement: &ChainContext,
    factory: Address,
    game_type: u32,
    depth: u64,
    fulfillment_block: u64,
    at: u64,
) -> LedgerResult<GameSummary> {
    let count = settlement.settlement.game_count(factory, at).await?;
    if count.is_zero() {
        return Err(Reason::NoGameCovering(fulfillment_block));
    }
    let games = settlement
        .settlement
        .latest_games(factory, game_type, count - U256::from(1), depth, at)
        .await?;

    let mut pending = None;
    for game in games.into_iter().filter(|game| game.l2_block_number >= fulfillment_block) {
        let proxy = game.game_id.game_proxy();
        let status = settlement.settlement.game_status(proxy, at).await?;
        if status.is_finalized() {
            debug!(index = %game.index, l2_block = game.l2_block_number, "found resolved game");
            return Ok(game);
        }
        pending.get_or_insert((proxy, status.game_status));
    }
    match pending {
        Some((game, status)) => Err(Reason::GameNotResolved { game, status }),
        None => Err(Reason::NoGameCovering(fulfillment_block)),
    }
}

/// Proves the destination block claimed by a finalized dispute game, as the factory stood at
/// the `anchor` settlement block. `game_index` skips the search.
pub async fn prove_world_state(
    source: &ChainContext,
    settlement: &ChainContext,
    destination: &ChainContext,
    config: &ChainConfiguration,
    anchor: &ProvenState,
    fulfillment_block: u64,
    game_index: Option<U256>,
) -> LedgerResult<ProvenState> {
    let factory = config.settlement_contract;
    let at = anchor.block_number;
    let (game_type, depth) = destination.game_search();
    let game = match game_index {
        Some(index) => settlement
            .settlement
            .latest_games(factory, game_type, index, 1, at)
            .await?
            .into_iter()
            .find(|game| game.index == index)
            .ok_or(Reason::NoGameCovering(fulfillment_block))?,
        None => find_resolved_game(settlement, factory, game_type, depth, fulfillment_block, at).await?,
    };
    if game.l2_block_number < fulfillment_block {
        return Err(Reason::NoGameCovering(fulfillment_block));
    }

    let proxy = game.game_id.game_proxy();
    let factory_slot = dispute_game_slot(game.index);
    let (factory_proof, game_proof, header, message_passer) = tokio::try_join!(
        settlement.provider.account_proof(factory, vec![factory_slot], at),
        settlement.provider.account_proof(
            proxy,
            vec![FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, FAULT_DISPUTE_GAME_STATUS_SLOT],
            at
        ),
        destination.provider.header(game.l2_block_number),
        destination
            .provider
            .account_proof(L2_TO_L1_MESSAGE_PASSER, Vec::new(), game.l2_block_number),
    )?;

    let block_hash = header.hash_slow();
    let computed = generate_output_root(
        config.output_root_version,
        header.state_root,
        message_passer.storage_hash,
        block_hash,
    );
    let (root_claim, root_claim_storage_proof) = storage_entry(&game_proof, FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT)?;
    let root_claim = B256::from(root_claim);
    if computed != root_claim {
        return Err(Reason::OutputRootMismatch {
            computed,
            committed: root_claim,
        });
    }
    let (status_word, status_storage_proof) = storage_entry(&game_proof, FAULT_DISPUTE_GAME_STATUS_SLOT)?;
    let status = GameStatusSlot::from_word(status_word).ok_or(Reason::UnknownContract(proxy))?;
    let (_, factory_storage_proof) = storage_entry(&factory_proof, factory_slot)?;

    let proof = CannonProof {
        chain_id: destination.chain_id,
        rlp_header: header.encode_rlp(),
        l2_state_root: header.state_root,
        factory: DisputeGameFactoryProof {
            message_passer_storage_root: message_passer.storage_hash,
            latest_block_hash: block_hash,
            game_index: game.index,
            game_id: game.game_id,
            storage_proof: factory_storage_proof,
            rlp_account: response_account(&factory_proof).into(),
            account_proof: factory_proof.account_proof.clone(),
        },
        game: FaultDisputeGameProof {
            game_state_root: game_proof.storage_hash,
            root_claim_storage_proof,
            status,
            status_storage_proof,
            rlp_account: response_account(&game_proof).into(),
            account_proof: game_proof.account_proof.clone(),
        },
        settlement_state_root: anchor.state_root,
    };
    let proven = verify_cannon(&proof, config)?;
    source.prover.prove_world_state_cannon(proof).await?;

    info!(
        destination_chain = destination.chain_id,
        block = proven.block_number,
        game = %proxy,
        "destination state proven through dispute game"
    );
    Ok(proven)
}
