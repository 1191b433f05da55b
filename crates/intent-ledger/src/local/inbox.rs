use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use intent_types::output::{address_word, inbox_fulfilled_slot, word_address};
use intent_types::{FulfillRequest, LedgerEvent, LedgerResult, Reason, Receipt};
use tracing::info;

use super::{ChainState, LocalContract, token};
use crate::ports::InboxLedger;

/// The fulfillment records themselves live in world storage under the `fulfilled` mapping.
#[derive(Clone, Debug, Default)]
pub(crate) struct InboxState;

fn fulfilled(state: &ChainState, inbox: Address, intent_hash: B256) -> LedgerResult<Option<Address>> {
    if !state.inboxes.contains_key(&inbox) {
        return Err(Reason::UnknownContract(inbox));
    }
    let word = state.world.storage(inbox, inbox_fulfilled_slot(intent_hash));
    Ok((!word.is_zero()).then(|| word_address(word)))
}

fn fulfill(state: &mut ChainState, inbox: Address, request: FulfillRequest) -> LedgerResult<(B256, Vec<LedgerEvent>)> {
    if state.now >= request.expiry_time {
        return Err(Reason::IntentExpired);
    }
    if request.targets.len() != request.data.len() {
        return Err(Reason::CalldataMismatch);
    }
    let hash = request.hash_at(inbox, state.chain_id);
    if hash != request.expected_hash {
        return Err(Reason::InvalidHash {
            expected: request.expected_hash,
        });
    }
    if fulfilled(state, inbox, hash)?.is_some() {
        return Err(Reason::IntentAlreadyFulfilled(hash));
    }
    if request.claimant.is_zero() {
        return Err(Reason::ZeroClaimant);
    }

    state
        .world
        .set_storage(inbox, inbox_fulfilled_slot(hash), address_word(request.claimant));
    for (index, (target, data)) in request.targets.iter().zip(&request.data).enumerate() {
        token::execute_call(&mut state.tokens, inbox, *target, data).map_err(|reason| Reason::IntentCallFailed {
            index,
            target: *target,
            reason,
        })?;
    }

    Ok((
        hash,
        vec![LedgerEvent::Fulfillment {
            hash,
            source_chain_id: request.source_chain_id,
            claimant: request.claimant,
        }],
    ))
}

#[async_trait]
impl InboxLedger for LocalContract {
    async fn fulfill(&self, request: FulfillRequest) -> LedgerResult<Receipt> {
        let inbox = self.address();
        let (hash, receipt) = self.chain().transact(move |state| fulfill(state, inbox, request)).await?;
        info!(%hash, block = receipt.block_number, "intent fulfilled");
        Ok(receipt)
    }

    async fn fulfilled(&self, intent_hash: B256) -> LedgerResult<Option<Address>> {
        let inbox = self.address();
        self.chain().read(move |state| fulfilled(state, inbox, intent_hash)).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use evm_storage_proofs::ChainStateProvider;
    use evm_storage_proofs::proof::verify_response;

    use super::*;
    use crate::local::{LocalChain, transfer_calldata};

    const SOLVER: Address = Address::repeat_byte(0x50);
    const RECIPIENT: Address = Address::repeat_byte(0x77);

    async fn setup() -> (LocalChain, LocalContract, Address) {
        let chain = LocalChain::new(8453, 1_000);
        let inbox = chain.deploy_inbox().await;
        let token = chain.deploy_token().await;
        chain.mint(token, inbox, U256::from(10)).await.unwrap();
        (chain.clone(), chain.signer(SOLVER).at(inbox), token)
    }

    fn request(inbox: Address, token: Address, amount: u64) -> FulfillRequest {
        let mut request = FulfillRequest {
            source_chain_id: 10,
            targets: vec![token],
            data: vec![transfer_calldata(RECIPIENT, U256::from(amount))],
            expiry_time: 2_000,
            nonce: B256::repeat_byte(3),
            claimant: SOLVER,
            expected_hash: B256::ZERO,
        };
        request.expected_hash = request.hash_at(inbox, 8453);
        request
    }

    #[tokio::test]
    async fn test_fulfill_records_claimant_in_storage() {
        let (chain, inbox, token) = setup().await;
        let request = request(inbox.address(), token, 10);
        let hash = request.expected_hash;

        let receipt = inbox.fulfill(request.clone()).await.unwrap();
        assert_eq!(inbox.fulfilled(hash).await.unwrap(), Some(SOLVER));
        assert_eq!(chain.balance_of(token, RECIPIENT).await.unwrap(), U256::from(10));

        let slot = inbox_fulfilled_slot(hash);
        let proof = chain.account_proof(inbox.address(), vec![slot], receipt.block_number).await.unwrap();
        let header = chain.header(receipt.block_number).await.unwrap();
        verify_response(&proof, header.state_root).unwrap();
        assert_eq!(proof.storage_proof[0].value, address_word(SOLVER));

        assert_eq!(inbox.fulfill(request).await.unwrap_err(), Reason::IntentAlreadyFulfilled(hash));
    }

    #[tokio::test]
    async fn test_second_fulfill_leaves_state_untouched() {
        let (chain, inbox, token) = setup().await;
        // Leaves enough in the inbox for a second transfer to go through if it were attempted.
        let request = request(inbox.address(), token, 4);
        let hash = request.expected_hash;
        inbox.fulfill(request.clone()).await.unwrap();

        let height = chain.latest_block_number().await.unwrap();
        let address = inbox.address();
        let balances = move |chain: LocalChain| async move {
            (
                chain.balance_of(token, address).await.unwrap(),
                chain.balance_of(token, RECIPIENT).await.unwrap(),
                chain.balance_of(token, SOLVER).await.unwrap(),
            )
        };
        let before = balances(chain.clone()).await;
        assert_eq!(before, (U256::from(6), U256::from(4), U256::ZERO));

        let mut other = request;
        other.claimant = Address::repeat_byte(0xee);
        assert_eq!(inbox.fulfill(other).await.unwrap_err(), Reason::IntentAlreadyFulfilled(hash));

        assert_eq!(balances(chain.clone()).await, before);
        assert_eq!(inbox.fulfilled(hash).await.unwrap(), Some(SOLVER));
        assert_eq!(chain.latest_block_number().await.unwrap(), height);
    }

    #[tokio::test]
    async fn test_failed_call_reverts_everything() {
        let (chain, inbox, token) = setup().await;
        let request = request(inbox.address(), token, 11);
        let hash = request.expected_hash;

        let err = inbox.fulfill(request).await.unwrap_err();
        assert!(matches!(err, Reason::IntentCallFailed { index: 0, .. }));
        assert_eq!(inbox.fulfilled(hash).await.unwrap(), None);
        assert_eq!(chain.balance_of(token, inbox.address()).await.unwrap(), U256::from(10));
    }

    #[tokio::test]
    async fn test_fulfill_rejections() {
        let (chain, inbox, token) = setup().await;

        let mut tampered = request(inbox.address(), token, 1);
        let expected = tampered.expected_hash;
        tampered.nonce = B256::repeat_byte(4);
        assert_eq!(inbox.fulfill(tampered).await.unwrap_err(), Reason::InvalidHash { expected });

        let mut nobody = request(inbox.address(), token, 1);
        nobody.claimant = Address::ZERO;
        assert_eq!(inbox.fulfill(nobody).await.unwrap_err(), Reason::ZeroClaimant);

        chain.advance_time(1_000).await;
        assert_eq!(
            inbox.fulfill(request(inbox.address(), token, 1)).await.unwrap_err(),
            Reason::IntentExpired
        );
    }
}
