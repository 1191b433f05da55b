use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use intent_types::intent::intent_nonce;
use intent_types::{CreateIntent, Intent, LedgerEvent, LedgerResult, Reason, Receipt};
use tracing::info;

use super::{ChainState, LocalContract};
use crate::ports::IntentSourceLedger;

#[derive(Clone, Debug)]
pub(crate) struct IntentSourceState {
    minimum_duration: u64,
    counter: u64,
    intents: BTreeMap<B256, Intent>,
}

impl IntentSourceState {
    pub(crate) fn new(minimum_duration: u64) -> Self {
        Self {
            minimum_duration,
            counter: 0,
            intents: BTreeMap::new(),
        }
    }
}

fn registry(state: &mut ChainState, address: Address) -> LedgerResult<&mut IntentSourceState> {
    state
        .intent_sources
        .get_mut(&address)
        .ok_or(Reason::UnknownContract(address))
}

fn create_intent(
    state: &mut ChainState,
    address: Address,
    creator: Address,
    request: CreateIntent,
) -> LedgerResult<(B256, Vec<LedgerEvent>)> {
    request.validate()?;
    let chain_id = state.chain_id;
    let now = state.now;

    let source = registry(state, address)?;
    let minimum = now.saturating_add(source.minimum_duration);
    if request.expiry_time < minimum {
        return Err(Reason::ExpiryTooSoon {
            expiry_time: request.expiry_time,
            minimum,
        });
    }
    let nonce = intent_nonce(source.counter, chain_id);
    source.counter += 1;
    let intent = request.into_intent(creator, nonce);
    let hash = intent.hash(chain_id);
    source.intents.insert(hash, intent.clone());

    for (token, amount) in intent.reward_tokens.iter().zip(&intent.reward_amounts) {
        state
            .tokens
            .get_mut(token)
            .ok_or(Reason::UnknownContract(*token))?
            .transfer_from(*token, address, creator, address, *amount)?;
    }

    let event = LedgerEvent::IntentCreated {
        hash,
        creator,
        destination_chain_id: intent.destination_chain_id,
        targets: intent.targets,
        data: intent.data,
        reward_tokens: intent.reward_tokens,
        reward_amounts: intent.reward_amounts,
        expiry_time: intent.expiry_time,
        nonce,
    };
    Ok((hash, vec![event]))
}

fn withdraw_rewards(state: &mut ChainState, address: Address, intent_hash: B256) -> LedgerResult<Vec<LedgerEvent>> {
    let now = state.now;
    let intent = registry(state, address)?
        .intents
        .get(&intent_hash)
        .cloned()
        .ok_or(Reason::IntentNotFound(intent_hash))?;
    if intent.has_been_withdrawn {
        return Err(Reason::NothingToWithdraw);
    }

    let claimant = state
        .provers
        .get(&intent.prover)
        .ok_or(Reason::UnknownContract(intent.prover))?
        .proven_intent(intent_hash);
    let recipient = match claimant {
        Some(claimant) => claimant,
        None if now >= intent.expiry_time => intent.creator,
        None => return Err(Reason::UnauthorizedWithdrawal),
    };

    if let Some(stored) = registry(state, address)?.intents.get_mut(&intent_hash) {
        stored.has_been_withdrawn = true;
    }
    for (token, amount) in intent.reward_tokens.iter().zip(&intent.reward_amounts) {
        state
            .tokens
            .get_mut(token)
            .ok_or(Reason::UnknownContract(*token))?
            .transfer(*token, address, recipient, *amount)?;
    }
    Ok(vec![LedgerEvent::Withdrawal {
        hash: intent_hash,
        recipient,
    }])
}

#[async_trait]
impl IntentSourceLedger for LocalContract {
    async fn create_intent(&self, request: CreateIntent) -> LedgerResult<(B256, Receipt)> {
        let (address, creator) = (self.address(), self.sender());
        let (hash, receipt) = self
            .chain()
            .transact(move |state| {
                let (hash, events) = create_intent(state, address, creator, request)?;
                Ok((hash, events))
            })
            .await?;
        info!(%hash, block = receipt.block_number, "intent created");
        Ok((hash, receipt))
    }

    async fn withdraw_rewards(&self, intent_hash: B256) -> LedgerResult<Receipt> {
        let address = self.address();
        let (_, receipt) = self
            .chain()
            .transact(move |state| Ok(((), withdraw_rewards(state, address, intent_hash)?)))
            .await?;
        Ok(receipt)
    }

    async fn get_intent(&self, intent_hash: B256) -> LedgerResult<Intent> {
        let address = self.address();
        self.chain()
            .read(move |state| {
                state
                    .intent_sources
                    .get(&address)
                    .ok_or(Reason::UnknownContract(address))?
                    .intents
                    .get(&intent_hash)
                    .cloned()
                    .ok_or(Reason::IntentNotFound(intent_hash))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::local::{LocalChain, transfer_calldata};

    const CREATOR: Address = Address::repeat_byte(0xc0);
    const SOLVER: Address = Address::repeat_byte(0x50);

    struct Fixture {
        chain: LocalChain,
        source: LocalContract,
        token: Address,
        prover: Address,
    }

    async fn fixture() -> Fixture {
        let chain = LocalChain::new(10, 1_000);
        let address = chain.deploy_intent_source(60).await;
        let token = chain.deploy_token().await;
        let prover = chain.deploy_prover(Default::default()).await;
        chain.mint(token, CREATOR, U256::from(1_000)).await.unwrap();
        let signer = chain.signer(CREATOR);
        signer.approve(token, address, U256::from(1_000)).await.unwrap();
        Fixture {
            source: signer.at(address),
            chain,
            token,
            prover,
        }
    }

    fn request(fixture: &Fixture, expiry_time: u64) -> CreateIntent {
        CreateIntent {
            destination_chain_id: 8453,
            inbox: Address::repeat_byte(0xb0),
            targets: vec![Address::repeat_byte(0x70)],
            data: vec![transfer_calldata(SOLVER, U256::from(5))],
            reward_tokens: vec![fixture.token],
            reward_amounts: vec![U256::from(100)],
            expiry_time,
            prover: fixture.prover,
        }
    }

    #[tokio::test]
    async fn test_create_escrows_rewards() {
        let fixture = fixture().await;
        let (hash, receipt) = fixture.source.create_intent(request(&fixture, 2_000)).await.unwrap();

        let intent = fixture.source.get_intent(hash).await.unwrap();
        assert_eq!(intent.hash(10), hash);
        assert_eq!(intent.nonce, intent_nonce(0, 10));
        assert!(matches!(receipt.events[0], LedgerEvent::IntentCreated { hash: h, .. } if h == hash));
        assert_eq!(
            fixture.chain.balance_of(fixture.token, fixture.source.address()).await.unwrap(),
            U256::from(100)
        );
        assert_eq!(fixture.chain.balance_of(fixture.token, CREATOR).await.unwrap(), U256::from(900));

        let (second, _) = fixture.source.create_intent(request(&fixture, 2_000)).await.unwrap();
        assert_ne!(second, hash);
    }

    #[tokio::test]
    async fn test_create_rejections_leave_no_trace() {
        let fixture = fixture().await;
        let before = fixture.chain.events().await.len();

        let err = fixture.source.create_intent(request(&fixture, 1_059)).await.unwrap_err();
        assert_eq!(
            err,
            Reason::ExpiryTooSoon {
                expiry_time: 1_059,
                minimum: 1_060
            }
        );

        let mut mismatched = request(&fixture, 2_000);
        mismatched.data.clear();
        assert_eq!(fixture.source.create_intent(mismatched).await.unwrap_err(), Reason::CalldataMismatch);

        let mut greedy = request(&fixture, 2_000);
        greedy.reward_amounts = vec![U256::from(5_000)];
        assert!(matches!(
            fixture.source.create_intent(greedy).await.unwrap_err(),
            Reason::InsufficientFunds { .. }
        ));

        assert_eq!(fixture.chain.events().await.len(), before);
        assert_eq!(fixture.chain.balance_of(fixture.token, CREATOR).await.unwrap(), U256::from(1_000));
        // A failed create must not consume a nonce.
        let (hash, _) = fixture.source.create_intent(request(&fixture, 2_000)).await.unwrap();
        assert_eq!(fixture.source.get_intent(hash).await.unwrap().nonce, intent_nonce(0, 10));
    }

    #[tokio::test]
    async fn test_withdraw_after_expiry_refunds_creator() {
        let fixture = fixture().await;
        let (hash, _) = fixture.source.create_intent(request(&fixture, 2_000)).await.unwrap();

        assert_eq!(
            fixture.source.withdraw_rewards(hash).await.unwrap_err(),
            Reason::UnauthorizedWithdrawal
        );
        fixture.chain.advance_time(1_000).await;
        let receipt = fixture.source.withdraw_rewards(hash).await.unwrap();
        assert_eq!(
            receipt.events,
            vec![LedgerEvent::Withdrawal {
                hash,
                recipient: CREATOR
            }]
        );
        assert_eq!(fixture.chain.balance_of(fixture.token, CREATOR).await.unwrap(), U256::from(1_000));
        assert!(fixture.source.get_intent(hash).await.unwrap().has_been_withdrawn);
        assert_eq!(fixture.source.withdraw_rewards(hash).await.unwrap_err(), Reason::NothingToWithdraw);
    }

    #[tokio::test]
    async fn test_unknown_intent() {
        let fixture = fixture().await;
        let missing = B256::repeat_byte(1);
        assert_eq!(fixture.source.get_intent(missing).await.unwrap_err(), Reason::IntentNotFound(missing));
        assert_eq!(
            fixture.source.withdraw_rewards(missing).await.unwrap_err(),
            Reason::IntentNotFound(missing)
        );
    }
}
