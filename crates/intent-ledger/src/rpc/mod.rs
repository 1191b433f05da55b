//! Ledgers reached over JSON-RPC through the deployed contracts.

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use intent_types::{
    BedrockProof, CannonProof, ChainConfiguration, CreateIntent, FulfillRequest, GameStatusSlot, Intent, IntentProof,
    LedgerResult, ProvenState, ProvingMechanism, Reason, Receipt,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::bindings::{
    IDisputeGameFactory, IL1Block, IL2OutputOracle, Inbox, IntentSource,
    Prover::{self, DisputeGameFactoryProofData, FaultDisputeGameProofData, FaultDisputeGameStatusSlotData},
};
use crate::ports::{
    BlockhashOracle, GameSummary, InboxLedger, IntentSourceLedger, OutputProposal, ProverLedger, SettlementReader,
};

pub mod receipt;
pub mod revert;

pub use revert::{decode_revert_data, from_contract_error, replayed_revert};

fn rpc_error(err: impl std::fmt::Display) -> Reason {
    Reason::Rpc(err.to_string())
}

/// Read-only connection to a chain.
pub fn connect_http(url: Url) -> DynProvider {
    ProviderBuilder::new().connect_http(url).erased()
}

/// Connection that signs transactions with `signer`.
pub fn connect_http_with_signer(url: Url, signer: PrivateKeySigner) -> DynProvider {
    ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(url)
        .erased()
}

/// One deployed ledger contract.
#[derive(Clone)]
pub struct RpcContract {
    provider: DynProvider,
    address: Address,
}

impl RpcContract {
    pub fn new(provider: DynProvider, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn confirm(&self, input: Bytes, pending: PendingTransactionBuilder<Ethereum>) -> LedgerResult<Receipt> {
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, contract = %self.address, "waiting for receipt");
        let receipt = pending.get_receipt().await.map_err(rpc_error)?;
        if !receipt.status() {
            let block = receipt.block_number.unwrap_or_default();
            warn!(%tx_hash, block, "transaction reverted, replaying for its revert data");
            // Replayed against the parent state, the closest to what the transaction saw.
            let replay = TransactionRequest::default()
                .from(receipt.from())
                .to(self.address)
                .input(input.into());
            let result = self.provider.call(replay).block(block.saturating_sub(1).into()).await;
            return Err(replayed_revert(result));
        }
        Ok(receipt::to_receipt(&receipt))
    }
}

#[async_trait]
impl IntentSourceLedger for RpcContract {
    async fn create_intent(&self, request: CreateIntent) -> LedgerResult<(B256, Receipt)> {
        request.validate()?;
        let source = IntentSource::new(self.address, self.provider.clone());
        let call = source.createIntent(
            U256::from(request.destination_chain_id),
            request.inbox,
            request.targets,
            request.data,
            request.reward_tokens,
            request.reward_amounts,
            U256::from(request.expiry_time),
            request.prover,
        );
        let pending = call.send().await.map_err(from_contract_error)?;
        let receipt = self.confirm(call.calldata().clone(), pending).await?;
        let hash = receipt::created_intent(&receipt)
            .ok_or_else(|| Reason::Rpc(format!("no IntentCreated event in {}", receipt.tx_hash)))?;
        info!(%hash, block = receipt.block_number, "intent created");
        Ok((hash, receipt))
    }

    async fn withdraw_rewards(&self, intent_hash: B256) -> LedgerResult<Receipt> {
        let source = IntentSource::new(self.address, self.provider.clone());
        let call = source.withdrawRewards(intent_hash);
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn get_intent(&self, intent_hash: B256) -> LedgerResult<Intent> {
        let source = IntentSource::new(self.address, self.provider.clone());
        let intent = source
            .getIntent(intent_hash)
            .call()
            .await
            .map_err(from_contract_error)?;
        if intent.creator.is_zero() {
            return Err(Reason::IntentNotFound(intent_hash));
        }
        Ok(Intent {
            creator: intent.creator,
            destination_chain_id: intent.destinationChainID.saturating_to(),
            inbox: intent.inbox,
            targets: intent.targets,
            data: intent.data,
            reward_tokens: intent.rewardTokens,
            reward_amounts: intent.rewardAmounts,
            expiry_time: intent.expiryTime.saturating_to(),
            prover: intent.prover,
            nonce: intent.nonce,
            has_been_withdrawn: intent.hasBeenWithdrawn,
        })
    }
}

#[async_trait]
impl InboxLedger for RpcContract {
    async fn fulfill(&self, request: FulfillRequest) -> LedgerResult<Receipt> {
        let inbox = Inbox::new(self.address, self.provider.clone());
        let call = inbox.fulfill(
            U256::from(request.source_chain_id),
            request.targets,
            request.data,
            U256::from(request.expiry_time),
            request.nonce,
            request.claimant,
            request.expected_hash,
        );
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn fulfilled(&self, intent_hash: B256) -> LedgerResult<Option<Address>> {
        let inbox = Inbox::new(self.address, self.provider.clone());
        let claimant = inbox.fulfilled(intent_hash).call().await.map_err(from_contract_error)?;
        Ok((!claimant.is_zero()).then_some(claimant))
    }
}

fn status_slot_data(status: &GameStatusSlot) -> FaultDisputeGameStatusSlotData {
    FaultDisputeGameStatusSlotData {
        createdAt: status.created_at,
        resolvedAt: status.resolved_at,
        gameStatus: status.game_status as u8,
        initialized: status.initialized,
        l2BlockNumberChallenged: status.l2_block_number_challenged,
    }
}

#[async_trait]
impl ProverLedger for RpcContract {
    async fn prove_settlement_layer_state(&self, rlp_header: Bytes) -> LedgerResult<Receipt> {
        let prover = Prover::new(self.address, self.provider.clone());
        let call = prover.proveSettlementLayerState(rlp_header);
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn prove_world_state_bedrock(&self, proof: BedrockProof) -> LedgerResult<Receipt> {
        let prover = Prover::new(self.address, self.provider.clone());
        let call = prover.proveWorldStateBedrock(
            U256::from(proof.chain_id),
            proof.rlp_header,
            proof.l2_state_root,
            proof.message_passer_storage_root,
            proof.output_index,
            proof.oracle_storage_proof,
            proof.rlp_oracle_account,
            proof.oracle_account_proof,
            proof.settlement_state_root,
        );
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn prove_world_state_cannon(&self, proof: CannonProof) -> LedgerResult<Receipt> {
        let prover = Prover::new(self.address, self.provider.clone());
        let factory = DisputeGameFactoryProofData {
            messagePasserStateRoot: proof.factory.message_passer_storage_root,
            latestBlockHash: proof.factory.latest_block_hash,
            gameIndex: proof.factory.game_index,
            gameId: proof.factory.game_id.0,
            disputeFaultGameStorageProof: proof.factory.storage_proof,
            rlpEncodedDisputeGameFactoryData: proof.factory.rlp_account,
            disputeGameFactoryAccountProof: proof.factory.account_proof,
        };
        let game = FaultDisputeGameProofData {
            faultDisputeGameStateRoot: proof.game.game_state_root,
            faultDisputeGameRootClaimStorageProof: proof.game.root_claim_storage_proof,
            faultDisputeGameStatusSlotData: status_slot_data(&proof.game.status),
            faultDisputeGameStatusStorageProof: proof.game.status_storage_proof,
            rlpEncodedFaultDisputeGameData: proof.game.rlp_account,
            faultDisputeGameAccountProof: proof.game.account_proof,
        };
        let call = prover.proveWorldStateCannon(
            U256::from(proof.chain_id),
            proof.rlp_header,
            proof.l2_state_root,
            factory,
            game,
            proof.settlement_state_root,
        );
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn prove_intent(&self, proof: IntentProof) -> LedgerResult<Receipt> {
        let prover = Prover::new(self.address, self.provider.clone());
        let call = prover.proveIntent(
            U256::from(proof.destination_chain_id),
            proof.claimant,
            proof.inbox,
            proof.intermediate_hash,
            proof.storage_proof,
            proof.rlp_inbox_account,
            proof.inbox_account_proof,
            proof.l2_state_root,
        );
        let pending = call.send().await.map_err(from_contract_error)?;
        self.confirm(call.calldata().clone(), pending).await
    }

    async fn proven_intent(&self, intent_hash: B256) -> LedgerResult<Option<Address>> {
        let prover = Prover::new(self.address, self.provider.clone());
        let claimant = prover
            .provenIntents(intent_hash)
            .call()
            .await
            .map_err(from_contract_error)?;
        Ok((!claimant.is_zero()).then_some(claimant))
    }

    async fn latest_proven_state(&self, chain_id: u64) -> LedgerResult<Option<ProvenState>> {
        let prover = Prover::new(self.address, self.provider.clone());
        let state = prover
            .provenStates(U256::from(chain_id))
            .call()
            .await
            .map_err(from_contract_error)?;
        if state.stateRoot.is_zero() {
            return Ok(None);
        }
        Ok(Some(ProvenState {
            block_number: state.blockNumber.saturating_to(),
            block_hash: state.blockHash,
            state_root: state.stateRoot,
        }))
    }

    async fn chain_configuration(&self, chain_id: u64) -> LedgerResult<ChainConfiguration> {
        let prover = Prover::new(self.address, self.provider.clone());
        let config = prover
            .chainConfigurations(U256::from(chain_id))
            .call()
            .await
            .map_err(from_contract_error)?;
        let proving_mechanism = match config.provingMechanism {
            1 => ProvingMechanism::Bedrock,
            2 => ProvingMechanism::Cannon,
            _ => return Err(Reason::UnsupportedChain(chain_id)),
        };
        Ok(ChainConfiguration {
            proving_mechanism,
            settlement_chain_id: config.settlementChainId.saturating_to(),
            settlement_contract: config.settlementContract,
            blockhash_oracle: config.blockhashOracle,
            output_root_version: config.outputRootVersionNumber,
        })
    }
}

/// Settlement and blockhash-oracle reads against a JSON-RPC node.
#[derive(Clone)]
pub struct RpcReader {
    provider: DynProvider,
}

impl RpcReader {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SettlementReader for RpcReader {
    async fn output_after(&self, oracle: Address, l2_block_number: u64, at: u64) -> LedgerResult<OutputProposal> {
        let oracle = IL2OutputOracle::new(oracle, self.provider.clone());
        let latest = oracle
            .latestBlockNumber()
            .block(at.into())
            .call()
            .await
            .map_err(from_contract_error)?;
        if latest < U256::from(l2_block_number) {
            return Err(Reason::OutputNotYetProposed(l2_block_number));
        }
        let index = oracle
            .getL2OutputIndexAfter(U256::from(l2_block_number))
            .block(at.into())
            .call()
            .await
            .map_err(from_contract_error)?;
        let output = oracle
            .getL2Output(index)
            .block(at.into())
            .call()
            .await
            .map_err(from_contract_error)?;
        Ok(OutputProposal {
            index,
            output_root: output.outputRoot,
            timestamp: u64::try_from(output.timestamp).unwrap_or(u64::MAX),
            l2_block_number: u64::try_from(output.l2BlockNumber).unwrap_or(u64::MAX),
        })
    }

    async fn game_count(&self, factory: Address, at: u64) -> LedgerResult<U256> {
        IDisputeGameFactory::new(factory, self.provider.clone())
            .gameCount()
            .block(at.into())
            .call()
            .await
            .map_err(from_contract_error)
    }

    async fn latest_games(
        &self,
        factory: Address,
        game_type: u32,
        start: U256,
        count: u64,
        at: u64,
    ) -> LedgerResult<Vec<GameSummary>> {
        let games = IDisputeGameFactory::new(factory, self.provider.clone())
            .findLatestGames(game_type, start, U256::from(count))
            .block(at.into())
            .call()
            .await
            .map_err(from_contract_error)?;
        Ok(games
            .into_iter()
            .map(|game| GameSummary {
                index: game.index,
                game_id: intent_types::GameId(game.metadata),
                root_claim: game.rootClaim,
                // extraData starts with the disputed l2 block number.
                l2_block_number: game
                    .extraData
                    .get(..32)
                    .map(|word| U256::from_be_slice(word).saturating_to())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn game_status(&self, game: Address, at: u64) -> LedgerResult<GameStatusSlot> {
        let word = self
            .provider
            .get_storage_at(game, U256::ZERO)
            .block_id(at.into())
            .await
            .map_err(rpc_error)?;
        GameStatusSlot::from_word(word)
            .filter(|status| status.initialized)
            .ok_or(Reason::UnknownContract(game))
    }
}

#[async_trait]
impl BlockhashOracle for RpcReader {
    async fn settlement_block(&self, oracle: Address) -> LedgerResult<(u64, B256)> {
        let at = self.provider.get_block_number().await.map_err(rpc_error)?;
        let oracle = IL1Block::new(oracle, self.provider.clone());
        let number = oracle.number().block(at.into()).call().await.map_err(from_contract_error)?;
        let hash = oracle.hash().block(at.into()).call().await.map_err(from_contract_error)?;
        Ok((number, hash))
    }
}
