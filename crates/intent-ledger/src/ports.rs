use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use intent_types::{
    BedrockProof, CannonProof, ChainConfiguration, CreateIntent, FulfillRequest, GameId, GameStatusSlot, Intent,
    IntentProof, LedgerResult, ProvenState, Receipt,
};

/// The source-chain intent registry, as seen by one sender.
#[async_trait]
pub trait IntentSourceLedger: Send + Sync {
    /// Registers an intent and escrows its rewards; returns the intent hash.
    async fn create_intent(&self, request: CreateIntent) -> LedgerResult<(B256, Receipt)>;

    /// Pays the rewards to the proven claimant, or back to the creator after expiry.
    async fn withdraw_rewards(&self, intent_hash: B256) -> LedgerResult<Receipt>;

    async fn get_intent(&self, intent_hash: B256) -> LedgerResult<Intent>;
}

/// The destination-chain fulfillment log.
#[async_trait]
pub trait InboxLedger: Send + Sync {
    async fn fulfill(&self, request: FulfillRequest) -> LedgerResult<Receipt>;

    /// Claimant recorded for `intent_hash`, if fulfilled.
    async fn fulfilled(&self, intent_hash: B256) -> LedgerResult<Option<Address>>;
}

/// The source-chain prover that accumulates trusted state roots and proven intents.
#[async_trait]
pub trait ProverLedger: Send + Sync {
    async fn prove_settlement_layer_state(&self, rlp_header: Bytes) -> LedgerResult<Receipt>;

    async fn prove_world_state_bedrock(&self, proof: BedrockProof) -> LedgerResult<Receipt>;

    async fn prove_world_state_cannon(&self, proof: CannonProof) -> LedgerResult<Receipt>;

    async fn prove_intent(&self, proof: IntentProof) -> LedgerResult<Receipt>;

    async fn proven_intent(&self, intent_hash: B256) -> LedgerResult<Option<Address>>;

    /// Most recent state proven for `chain_id`.
    async fn latest_proven_state(&self, chain_id: u64) -> LedgerResult<Option<ProvenState>>;

    async fn chain_configuration(&self, chain_id: u64) -> LedgerResult<ChainConfiguration>;
}

/// Reads the settlement block a chain's blockhash oracle currently mirrors.
#[async_trait]
pub trait BlockhashOracle: Send + Sync {
    /// `(number, hash)` of the settlement block reported by `oracle`.
    async fn settlement_block(&self, oracle: Address) -> LedgerResult<(u64, B256)>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputProposal {
    pub index: U256,
    pub output_root: B256,
    pub timestamp: u64,
    pub l2_block_number: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameSummary {
    pub index: U256,
    pub game_id: GameId,
    pub root_claim: B256,
    pub l2_block_number: u64,
}

/// Settlement-chain contract reads, all pinned to the settlement block `at`.
#[async_trait]
pub trait SettlementReader: Send + Sync {
    /// First output proposal covering `l2_block_number`, or `OutputNotYetProposed`.
    async fn output_after(&self, oracle: Address, l2_block_number: u64, at: u64) -> LedgerResult<OutputProposal>;

    async fn game_count(&self, factory: Address, at: u64) -> LedgerResult<U256>;

    /// Up to `count` games of `game_type`, searching backwards from index `start`. As in
    /// `findLatestGames`, `count` bounds the matches: games of other types are skipped uncounted.
    async fn latest_games(
        &self,
        factory: Address,
        game_type: u32,
        start: U256,
        count: u64,
        at: u64,
    ) -> LedgerResult<Vec<GameSummary>>;

    async fn game_status(&self, game: Address, at: u64) -> LedgerResult<GameStatusSlot>;
}
