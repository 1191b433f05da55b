//! Settlement-layer contracts: the L2OutputOracle, the DisputeGameFactory with its games, and the
//! source chain's blockhash oracle.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use intent_types::output::{
    DISPUTE_GAME_LIST_SLOT_NUMBER, FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, FAULT_DISPUTE_GAME_STATUS_SLOT,
    L2_OUTPUT_SLOT_NUMBER, dispute_game_slot, l2_output_slot, output_metadata_word, split_output_metadata,
};
use intent_types::{GameId, GameStatus, GameStatusSlot, LedgerResult, Reason, Receipt};

use super::{ChainState, LocalChain};
use crate::ports::{BlockhashOracle, GameSummary, OutputProposal, SettlementReader};

/// Values that deployed games keep in immutable arguments rather than storage.
#[derive(Clone, Debug, Default)]
pub(crate) struct SettlementState {
    game_l2_blocks: BTreeMap<Address, u64>,
}

fn length_slot(slot_number: u64) -> B256 {
    B256::from(U256::from(slot_number))
}

fn next_word(slot: B256) -> B256 {
    B256::from(U256::from_be_bytes(slot.0).wrapping_add(U256::from(1)))
}

impl ChainState {
    fn storage_at(&self, address: Address, slot: B256, at: u64) -> LedgerResult<U256> {
        self.world
            .storage_at(address, slot, at)
            .ok_or_else(|| Reason::Rpc(format!("block {at} not found on chain {}", self.chain_id)))
    }
}

impl LocalChain {
    pub async fn deploy_output_oracle(&self, address: Address) {
        self.state.lock().await.deploy_at(address, "l2-output-oracle");
    }

    pub async fn deploy_dispute_game_factory(&self, address: Address) {
        self.state.lock().await.deploy_at(address, "dispute-game-factory");
    }

    /// Appends an output proposal for `l2_block_number`; returns its index.
    pub async fn propose_l2_output(&self, oracle: Address, output_root: B256, l2_block_number: u64) -> LedgerResult<U256> {
        let (index, _) = self
            .transact(move |state| {
                let length = state.world.storage(oracle, length_slot(L2_OUTPUT_SLOT_NUMBER));
                let slot = l2_output_slot(length);
                state.world.set_storage(oracle, slot, U256::from_be_bytes(output_root.0));
                state
                    .world
                    .set_storage(oracle, next_word(slot), output_metadata_word(state.now, l2_block_number));
                state
                    .world
                    .set_storage(oracle, length_slot(L2_OUTPUT_SLOT_NUMBER), length + U256::from(1));
                Ok((length, Vec::new()))
            })
            .await?;
        Ok(index)
    }

    /// Creates an in-progress fault dispute game claiming `root_claim` for `l2_block_number`.
    pub async fn create_dispute_game(
        &self,
        factory: Address,
        game_type: u32,
        root_claim: B256,
        l2_block_number: u64,
    ) -> LedgerResult<(U256, Address)> {
        let (created, _) = self
            .transact(move |state| {
                let index = state.world.storage(factory, length_slot(DISPUTE_GAME_LIST_SLOT_NUMBER));
                let game = Address::from_slice(&keccak256((factory, index).abi_encode_params())[12..]);
                state.deploy_at(game, "fault-dispute-game");

                let now = state.now;
                state
                    .world
                    .set_storage(factory, dispute_game_slot(index), GameId::pack(game_type, now, game).as_word());
                state
                    .world
                    .set_storage(factory, length_slot(DISPUTE_GAME_LIST_SLOT_NUMBER), index + U256::from(1));
                state
                    .world
                    .set_storage(game, FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, U256::from_be_bytes(root_claim.0));
                let status = GameStatusSlot {
                    created_at: now,
                    resolved_at: 0,
                    game_status: GameStatus::InProgress,
                    initialized: true,
                    l2_block_number_challenged: false,
                };
                state.world.set_storage(game, FAULT_DISPUTE_GAME_STATUS_SLOT, status.to_word());
                state.settlement.game_l2_blocks.insert(game, l2_block_number);
                Ok(((index, game), Vec::new()))
            })
            .await?;
        Ok(created)
    }

    pub async fn resolve_dispute_game(&self, game: Address, outcome: GameStatus) -> LedgerResult<Receipt> {
        let (_, receipt) = self
            .transact(move |state| {
                let word = state.world.storage(game, FAULT_DISPUTE_GAME_STATUS_SLOT);
                let mut status = GameStatusSlot::from_word(word)
                    .filter(|status| status.initialized)
                    .ok_or(Reason::UnknownContract(game))?;
                status.resolved_at = state.now;
                status.game_status = outcome;
                state.world.set_storage(game, FAULT_DISPUTE_GAME_STATUS_SLOT, status.to_word());
                Ok(((), Vec::new()))
            })
            .await?;
        Ok(receipt)
    }
}

#[async_trait]
impl SettlementReader for LocalChain {
    async fn output_after(&self, oracle: Address, l2_block_number: u64, at: u64) -> LedgerResult<OutputProposal> {
        self.read(move |state| {
            let length = state.storage_at(oracle, length_slot(L2_OUTPUT_SLOT_NUMBER), at)?;
            let length = u64::try_from(length).map_err(|_| Reason::UnknownContract(oracle))?;
            for index in 0..length {
                let slot = l2_output_slot(U256::from(index));
                let (timestamp, proposed_block) = split_output_metadata(state.storage_at(oracle, next_word(slot), at)?);
                if proposed_block >= l2_block_number {
                    return Ok(OutputProposal {
                        index: U256::from(index),
                        output_root: B256::from(state.storage_at(oracle, slot, at)?),
                        timestamp,
                        l2_block_number: proposed_block,
                    });
                }
            }
            Err(Reason::OutputNotYetProposed(l2_block_number))
        })
        .await
    }

    async fn game_count(&self, factory: Address, at: u64) -> LedgerResult<U256> {
        self.read(move |state| state.storage_at(factory, length_slot(DISPUTE_GAME_LIST_SLOT_NUMBER), at))
            .await
    }

    async fn latest_games(
        &self,
        factory: Address,
        game_type: u32,
        start: U256,
        count: u64,
        at: u64,
    ) -> LedgerResult<Vec<GameSummary>> {
        self.read(move |state| {
            let mut games = Vec::new();
            let mut index = start;
            loop {
                if games.len() as u64 >= count {
                    break;
                }
                let game_id = GameId(B256::from(state.storage_at(factory, dispute_game_slot(index), at)?));
                let (kind, _, proxy) = game_id.unpack();
                if !proxy.is_zero() && kind == game_type {
                    games.push(GameSummary {
                        index,
                        game_id,
                        root_claim: B256::from(state.storage_at(proxy, FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT, at)?),
                        l2_block_number: state.settlement.game_l2_blocks.get(&proxy).copied().unwrap_or_default(),
                    });
                }
                if index.is_zero() {
                    break;
                }
                index -= U256::from(1);
            }
            Ok(games)
        })
        .await
    }

    async fn game_status(&self, game: Address, at: u64) -> LedgerResult<GameStatusSlot> {
        self.read(move |state| {
            GameStatusSlot::from_word(state.storage_at(game, FAULT_DISPUTE_GAME_STATUS_SLOT, at)?)
                .filter(|status| status.initialized)
                .ok_or(Reason::UnknownContract(game))
        })
        .await
    }
}

#[async_trait]
impl BlockhashOracle for LocalChain {
    async fn settlement_block(&self, oracle: Address) -> LedgerResult<(u64, B256)> {
        self.read(move |state| {
            state
                .blockhash_oracles
                .get(&oracle)
                .copied()
                .ok_or(Reason::UnknownContract(oracle))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORACLE: Address = Address::repeat_byte(0x0a);
    const FACTORY: Address = Address::repeat_byte(0xfa);

    #[tokio::test]
    async fn test_output_after_respects_pinned_block() {
        let l1 = LocalChain::new(1, 100);
        l1.deploy_output_oracle(ORACLE).await;
        l1.propose_l2_output(ORACLE, B256::repeat_byte(1), 50).await.unwrap();
        let pinned = l1.mine().await;
        l1.propose_l2_output(ORACLE, B256::repeat_byte(2), 100).await.unwrap();
        let latest = l1.mine().await;

        let first = l1.output_after(ORACLE, 40, latest).await.unwrap();
        assert_eq!((first.index, first.l2_block_number), (U256::ZERO, 50));
        let second = l1.output_after(ORACLE, 51, latest).await.unwrap();
        assert_eq!(second.output_root, B256::repeat_byte(2));
        assert_eq!(second.timestamp, 100);

        assert_eq!(
            l1.output_after(ORACLE, 51, pinned).await.unwrap_err(),
            Reason::OutputNotYetProposed(51)
        );
        assert!(l1.output_after(ORACLE, 101, latest).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_games_are_listed_newest_first() {
        let l1 = LocalChain::new(1, 100);
        l1.deploy_dispute_game_factory(FACTORY).await;
        let (_, first) = l1.create_dispute_game(FACTORY, 0, B256::repeat_byte(1), 10).await.unwrap();
        l1.create_dispute_game(FACTORY, 1, B256::repeat_byte(2), 20).await.unwrap();
        let (_, third) = l1.create_dispute_game(FACTORY, 0, B256::repeat_byte(3), 30).await.unwrap();
        l1.advance_time(50).await;
        l1.resolve_dispute_game(first, GameStatus::DefenderWins).await.unwrap();
        let at = l1.mine().await;

        let count = l1.game_count(FACTORY, at).await.unwrap();
        assert_eq!(count, U256::from(3));
        let games = l1.latest_games(FACTORY, 0, count - U256::from(1), 5, at).await.unwrap();
        let blocks: Vec<u64> = games.iter().map(|game| game.l2_block_number).collect();
        assert_eq!(blocks, vec![30, 10]);
        assert_eq!(games[0].game_id.game_proxy(), third);
        assert_eq!(games[1].root_claim, B256::repeat_byte(1));

        // The type-1 game in between does not use up the requested count.
        let two = l1.latest_games(FACTORY, 0, count - U256::from(1), 2, at).await.unwrap();
        assert_eq!(two, games);
        let one = l1.latest_games(FACTORY, 0, count - U256::from(1), 1, at).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].game_id.game_proxy(), third);

        let resolved = l1.game_status(first, at).await.unwrap();
        assert!(resolved.is_finalized());
        assert_eq!(resolved.resolved_at, 150);
        assert!(!l1.game_status(third, at).await.unwrap().is_finalized());
        assert_eq!(
            l1.game_status(Address::repeat_byte(1), at).await.unwrap_err(),
            Reason::UnknownContract(Address::repeat_byte(1))
        );
    }
}
