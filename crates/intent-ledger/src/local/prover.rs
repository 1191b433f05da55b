use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use intent_types::proofs::{verify_bedrock, verify_cannon, verify_intent, verify_settlement_header};
use intent_types::{
    BedrockProof, CannonProof, ChainConfiguration, ChainConfigurations, IntentProof, LedgerEvent, LedgerResult,
    ProvenState, Reason, Receipt,
};
use tracing::{debug, info};

use super::{ChainState, LocalContract};
use crate::ports::ProverLedger;

#[derive(Clone, Debug)]
pub(crate) struct ProverState {
    configurations: ChainConfigurations,
    /// Per chain, every state ever proven, keyed by block number. Entries are never removed.
    proven_states: BTreeMap<u64, BTreeMap<u64, ProvenState>>,
    proven_intents: BTreeMap<B256, Address>,
}

impl ProverState {
    pub(crate) fn new(configurations: ChainConfigurations) -> Self {
        Self {
            configurations,
            proven_states: BTreeMap::new(),
            proven_intents: BTreeMap::new(),
        }
    }

    pub(crate) fn proven_intent(&self, intent_hash: B256) -> Option<Address> {
        self.proven_intents.get(&intent_hash).copied()
    }

    fn configuration(&self, chain_id: u64) -> LedgerResult<&ChainConfiguration> {
        self.configurations
            .get(&chain_id)
            .ok_or(Reason::UnsupportedChain(chain_id))
    }

    fn is_proven(&self, chain_id: u64, state_root: B256) -> bool {
        self.proven_states
            .get(&chain_id)
            .is_some_and(|states| states.values().any(|state| state.state_root == state_root))
    }

    /// Returns false when the block was already recorded.
    fn record(&mut self, chain_id: u64, state: ProvenState) -> bool {
        let states = self.proven_states.entry(chain_id).or_default();
        if states.contains_key(&state.block_number) {
            return false;
        }
        states.insert(state.block_number, state);
        true
    }

    fn latest(&self, chain_id: u64) -> Option<ProvenState> {
        self.proven_states
            .get(&chain_id)
            .and_then(|states| states.values().next_back().copied())
    }
}

fn prover(state: &mut ChainState, address: Address) -> LedgerResult<&mut ProverState> {
    state.provers.get_mut(&address).ok_or(Reason::UnknownContract(address))
}

fn prove_settlement_layer_state(state: &mut ChainState, address: Address, rlp_header: Bytes) -> LedgerResult<Vec<LedgerEvent>> {
    let chain_id = state.chain_id;
    let config = prover(state, address)?.configuration(chain_id)?.clone();
    let (_, oracle_hash) = *state
        .blockhash_oracles
        .get(&config.blockhash_oracle)
        .ok_or(Reason::UnknownContract(config.blockhash_oracle))?;

    let proven = verify_settlement_header(&rlp_header, oracle_hash)?;
    let mut events = Vec::new();
    if prover(state, address)?.record(config.settlement_chain_id, proven) {
        events.push(LedgerEvent::SettlementStateProven {
            chain_id: config.settlement_chain_id,
            block_number: proven.block_number,
            state_root: proven.state_root,
        });
    }
    Ok(events)
}

fn prove_world_state(
    state: &mut ChainState,
    address: Address,
    chain_id: u64,
    settlement_state_root: B256,
    verify: impl FnOnce(&ChainConfiguration) -> LedgerResult<ProvenState>,
) -> LedgerResult<Vec<LedgerEvent>> {
    let prover = prover(state, address)?;
    let config = prover.configuration(chain_id)?;
    if !prover.is_proven(config.settlement_chain_id, settlement_state_root) {
        return Err(Reason::SettlementStateNotProven {
            chain_id: config.settlement_chain_id,
            state_root: settlement_state_root,
        });
    }
    let proven = verify(config)?;

    let mut events = Vec::new();
    if prover.record(chain_id, proven) {
        events.push(LedgerEvent::WorldStateProven {
            chain_id,
            block_number: proven.block_number,
            state_root: proven.state_root,
        });
    }
    Ok(events)
}

fn prove_intent(state: &mut ChainState, address: Address, proof: IntentProof) -> LedgerResult<Vec<LedgerEvent>> {
    let prover = prover(state, address)?;
    if !prover.is_proven(proof.destination_chain_id, proof.l2_state_root) {
        return Err(Reason::DestinationStateNotProven {
            chain_id: proof.destination_chain_id,
            state_root: proof.l2_state_root,
        });
    }
    let hash = verify_intent(&proof)?;
    match prover.proven_intents.get(&hash) {
        Some(existing) if *existing == proof.claimant => {
            debug!(%hash, "intent already proven for this claimant");
            Ok(Vec::new())
        }
        Some(existing) => Err(Reason::IntentAlreadyProven(hash, *existing)),
        None => {
            prover.proven_intents.insert(hash, proof.claimant);
            Ok(vec![LedgerEvent::IntentProven {
                hash,
                claimant: proof.claimant,
            }])
        }
    }
}

impl LocalContract {
    async fn submit(
        &self,
        apply: impl FnOnce(&mut ChainState, Address) -> LedgerResult<Vec<LedgerEvent>> + Send,
    ) -> LedgerResult<Receipt> {
        let address = self.address();
        let (_, receipt) = self
            .chain()
            .transact(move |state| Ok(((), apply(state, address)?)))
            .await?;
        Ok(receipt)
    }
}

#[async_trait]
impl ProverLedger for LocalContract {
    async fn prove_settlement_layer_state(&self, rlp_header: Bytes) -> LedgerResult<Receipt> {
        let receipt = self
            .submit(move |state, address| prove_settlement_layer_state(state, address, rlp_header))
            .await?;
        info!(block = receipt.block_number, "settlement layer state proven");
        Ok(receipt)
    }

    async fn prove_world_state_bedrock(&self, proof: BedrockProof) -> LedgerResult<Receipt> {
        self.submit(move |state, address| {
            prove_world_state(state, address, proof.chain_id, proof.settlement_state_root, |config| {
                verify_bedrock(&proof, config)
            })
        })
        .await
    }

    async fn prove_world_state_cannon(&self, proof: CannonProof) -> LedgerResult<Receipt> {
        self.submit(move |state, address| {
            prove_world_state(state, address, proof.chain_id, proof.settlement_state_root, |config| {
                verify_cannon(&proof, config)
            })
        })
        .await
    }

    async fn prove_intent(&self, proof: IntentProof) -> LedgerResult<Receipt> {
        self.submit(move |state, address| prove_intent(state, address, proof)).await
    }

    async fn proven_intent(&self, intent_hash: B256) -> LedgerResult<Option<Address>> {
        let address = self.address();
        self.chain()
            .read(move |state| {
                Ok(state
                    .provers
                    .get(&address)
                    .ok_or(Reason::UnknownContract(address))?
                    .proven_intent(intent_hash))
            })
            .await
    }

    async fn latest_proven_state(&self, chain_id: u64) -> LedgerResult<Option<ProvenState>> {
        let address = self.address();
        self.chain()
            .read(move |state| {
                Ok(state
                    .provers
                    .get(&address)
                    .ok_or(Reason::UnknownContract(address))?
                    .latest(chain_id))
            })
            .await
    }

    async fn chain_configuration(&self, chain_id: u64) -> LedgerResult<ChainConfiguration> {
        let address = self.address();
        self.chain()
            .read(move |state| {
                state
                    .provers
                    .get(&address)
                    .ok_or(Reason::UnknownContract(address))?
                    .configuration(chain_id)
                    .cloned()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use evm_storage_proofs::ChainStateProvider;
    use intent_types::chain::L1_BLOCK_ORACLE;
    use intent_types::ProvingMechanism;

    use super::*;
    use crate::local::LocalChain;

    const RELAYER: Address = Address::repeat_byte(0x11);

    fn configurations() -> ChainConfigurations {
        let mut configurations = ChainConfigurations::new();
        configurations.insert(
            10,
            ChainConfiguration {
                proving_mechanism: ProvingMechanism::Cannon,
                settlement_chain_id: 1,
                settlement_contract: Address::repeat_byte(0xfa),
                blockhash_oracle: L1_BLOCK_ORACLE,
                output_root_version: B256::ZERO,
            },
        );
        configurations
    }

    async fn setup() -> (LocalChain, LocalChain, LocalContract) {
        let l1 = LocalChain::new(1, 0);
        let source = LocalChain::new(10, 0);
        source.deploy_blockhash_oracle(L1_BLOCK_ORACLE).await;
        let prover = source.deploy_prover(configurations()).await;
        (l1, source.clone(), source.signer(RELAYER).at(prover))
    }

    #[tokio::test]
    async fn test_settlement_state_follows_oracle() {
        let (l1, source, prover) = setup().await;
        let number = l1.mine().await;
        let header = l1.header(number).await.unwrap();

        let err = prover.prove_settlement_layer_state(header.encode_rlp()).await.unwrap_err();
        assert!(matches!(err, Reason::SettlementBlockHashMismatch { .. }));

        source
            .set_settlement_block(L1_BLOCK_ORACLE, number, header.hash_slow())
            .await
            .unwrap();
        let receipt = prover.prove_settlement_layer_state(header.encode_rlp()).await.unwrap();
        assert_eq!(
            receipt.events,
            vec![LedgerEvent::SettlementStateProven {
                chain_id: 1,
                block_number: number,
                state_root: header.state_root
            }]
        );
        assert_eq!(
            prover.latest_proven_state(1).await.unwrap().map(|state| state.state_root),
            Some(header.state_root)
        );

        // Proving the same block again changes nothing.
        let again = prover.prove_settlement_layer_state(header.encode_rlp()).await.unwrap();
        assert!(again.events.is_empty());
    }

    #[tokio::test]
    async fn test_world_state_requires_proven_settlement_root() {
        let (_, _, prover) = setup().await;
        let unknown_root = B256::repeat_byte(0x99);
        let proof = CannonProof {
            chain_id: 10,
            rlp_header: Bytes::new(),
            l2_state_root: B256::ZERO,
            factory: intent_types::proofs::DisputeGameFactoryProof {
                message_passer_storage_root: B256::ZERO,
                latest_block_hash: B256::ZERO,
                game_index: U256::ZERO,
                game_id: intent_types::GameId(B256::ZERO),
                storage_proof: vec![],
                rlp_account: Bytes::new(),
                account_proof: vec![],
            },
            game: intent_types::proofs::FaultDisputeGameProof {
                game_state_root: B256::ZERO,
                root_claim_storage_proof: vec![],
                status: intent_types::GameStatusSlot::from_word(U256::ZERO).unwrap(),
                status_storage_proof: vec![],
                rlp_account: Bytes::new(),
                account_proof: vec![],
            },
            settlement_state_root: unknown_root,
        };
        assert_eq!(
            prover.prove_world_state_cannon(proof.clone()).await.unwrap_err(),
            Reason::SettlementStateNotProven {
                chain_id: 1,
                state_root: unknown_root
            }
        );

        let mut unsupported = proof;
        unsupported.chain_id = 42;
        assert_eq!(
            prover.prove_world_state_cannon(unsupported).await.unwrap_err(),
            Reason::UnsupportedChain(42)
        );
        assert_eq!(prover.chain_configuration(42).await.unwrap_err(), Reason::UnsupportedChain(42));
        assert_eq!(
            prover.chain_configuration(10).await.unwrap().proving_mechanism,
            ProvingMechanism::Cannon
        );
    }

    #[tokio::test]
    async fn test_intent_requires_proven_destination_root() {
        let (_, _, prover) = setup().await;
        let proof = IntentProof {
            destination_chain_id: 10,
            claimant: RELAYER,
            inbox: Address::repeat_byte(0xb0),
            intermediate_hash: B256::repeat_byte(1),
            storage_proof: vec![],
            rlp_inbox_account: Bytes::new(),
            inbox_account_proof: vec![],
            l2_state_root: B256::repeat_byte(2),
        };
        assert!(matches!(
            prover.prove_intent(proof).await.unwrap_err(),
            Reason::DestinationStateNotProven { chain_id: 10, .. }
        ));
        assert_eq!(prover.proven_intent(B256::repeat_byte(1)).await.unwrap(), None);
    }
}
