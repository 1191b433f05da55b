use alloy_primitives::{Address, B256, U256};
use intent_types::{ChainConfiguration, LedgerResult, ProvenState, ProvingMechanism, Reason, Receipt};
use tracing::{debug, info, warn};

use super::context::ChainContext;
use super::retry::{RetrySettings, retry_transient};
use super::intent::prove_intent;
use super::{anchor, bedrock, cannon};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProveRequest {
    pub intent_hash: B256,
    /// Transaction that fulfilled the intent on the destination chain.
    pub fulfillment_tx: B256,
    /// Dispute game to prove through instead of searching for one.
    pub game_index: Option<U256>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofOutcome {
    /// The source prover already recorded a claimant; nothing was submitted.
    AlreadyProven { claimant: Address },
    Proven {
        claimant: Address,
        /// Set when a new settlement anchor was proven for this run.
        settlement: Option<ProvenState>,
        destination: ProvenState,
        receipt: Receipt,
    },
}

impl ProofOutcome {
    pub fn claimant(&self) -> Address {
        match self {
            ProofOutcome::AlreadyProven { claimant } | ProofOutcome::Proven { claimant, .. } => *claimant,
        }
    }
}

/// Drives one intent from its fulfillment on `destination` to a recorded claimant on `source`,
/// anchoring through `settlement`.
pub struct IntentProver {
    source: ChainContext,
    settlement: ChainContext,
    destination: ChainContext,
    retry: RetrySettings,
}

impl IntentProver {
    pub fn new(source: ChainContext, settlement: ChainContext, destination: ChainContext, retry: RetrySettings) -> Self {
        Self {
            source,
            settlement,
            destination,
            retry,
        }
    }

    pub async fn prove(&self, request: &ProveRequest) -> LedgerResult<ProofOutcome> {
        let hash = request.intent_hash;
        if let Some(claimant) = self.source.prover.proven_intent(hash).await? {
            info!(%hash, %claimant, "intent already proven");
            return Ok(ProofOutcome::AlreadyProven { claimant });
        }

        let intent = self.source.intent_source.get_intent(hash).await?;
        if intent.destination_chain_id != self.destination.chain_id {
            return Err(Reason::UnsupportedChain(intent.destination_chain_id));
        }
        let expected = intent.hash(self.source.chain_id);
        if expected != hash {
            return Err(Reason::InvalidHash { expected });
        }

        let (source_config, destination_config) = tokio::try_join!(
            self.source.prover.chain_configuration(self.source.chain_id),
            self.source.prover.chain_configuration(self.destination.chain_id),
        )?;
        for config in [&source_config, &destination_config] {
            if config.settlement_chain_id != self.settlement.chain_id {
                return Err(Reason::UnsupportedChain(config.settlement_chain_id));
            }
        }
        self.check_local_configuration(&destination_config);

        let fulfillment_block = retry_transient(&self.retry, "fulfillment", || {
            self.fulfillment_block(request.fulfillment_tx, hash)
        })
        .await?;
        debug!(%hash, block = fulfillment_block, "fulfillment located");

        let (settlement, destination) = match self.reusable_state(fulfillment_block).await? {
            Some(proven) => (None, proven),
            None => {
                let (anchor, proven) = retry_transient(&self.retry, "world state", || {
                    self.prove_world_state(&source_config, &destination_config, fulfillment_block, request.game_index)
                })
                .await?;
                (Some(anchor), proven)
            }
        };

        let (claimant, receipt) = retry_transient(&self.retry, "intent", || {
            prove_intent(&self.source, &self.destination, &intent, hash, &destination)
        })
        .await?;

        Ok(ProofOutcome::Proven {
            claimant,
            settlement,
            destination,
            receipt,
        })
    }

    async fn fulfillment_block(&self, fulfillment_tx: B256, hash: B256) -> LedgerResult<u64> {
        let (block, claimant) = tokio::try_join!(
            async { Ok::<_, Reason>(self.destination.provider.transaction_block(fulfillment_tx).await?) },
            self.destination.inbox.fulfilled(hash),
        )?;
        if claimant.is_none() {
            return Err(Reason::IntentNotFulfilled(hash));
        }
        Ok(block)
    }

    /// A destination state already proven at or after the fulfillment covers it too.
    async fn reusable_state(&self, fulfillment_block: u64) -> LedgerResult<Option<ProvenState>> {
        let latest = self.source.prover.latest_proven_state(self.destination.chain_id).await?;
        Ok(latest.filter(|state| state.block_number >= fulfillment_block))
    }

    /// Anchors a fresh settlement block, then proves the destination against it. Retried as a
    /// unit so a stale anchor is replaced on the next attempt.
    async fn prove_world_state(
        &self,
        source_config: &ChainConfiguration,
        destination_config: &ChainConfiguration,
        fulfillment_block: u64,
        game_index: Option<U256>,
    ) -> LedgerResult<(ProvenState, ProvenState)> {
        let anchor = anchor::prove_settlement_state(&self.source, &self.settlement, source_config).await?;
        let proven = match destination_config.proving_mechanism {
            ProvingMechanism::Bedrock => {
                bedrock::prove_world_state(
                    &self.source,
                    &self.settlement,
                    &self.destination,
                    destination_config,
                    &anchor,
                    fulfillment_block,
                )
                .await?
            }
            ProvingMechanism::Cannon => {
                cannon::prove_world_state(
                    &self.source,
                    &self.settlement,
                    &self.destination,
                    destination_config,
                    &anchor,
                    fulfillment_block,
                    game_index,
                )
                .await?
            }
        };
        Ok((anchor, proven))
    }

    fn check_local_configuration(&self, on_chain: &ChainConfiguration) {
        if let Some(proving) = &self.destination.proving {
            if proving.chain_configuration() != *on_chain {
                warn!(
                    chain = self.destination.chain_id,
                    "local proving settings differ from the prover's registered configuration; using the registered one"
                );
            }
        }
    }
}
