use alloy::rpc::types::{Log, TransactionReceipt};
use alloy_primitives::B256;
use intent_types::{LedgerEvent, Receipt};

use crate::bindings::{Inbox, IntentSource, Prover};

/// Decodes the ledger events a receipt carries, skipping foreign logs.
pub fn ledger_events(logs: &[Log]) -> Vec<LedgerEvent> {
    logs.iter().filter_map(ledger_event).collect()
}

fn ledger_event(log: &Log) -> Option<LedgerEvent> {
    if let Ok(created) = log.log_decode::<IntentSource::IntentCreated>() {
        let event = created.inner.data;
        return Some(LedgerEvent::IntentCreated {
            hash: event._hash,
            creator: event._creator,
            destination_chain_id: event._destinationChain.saturating_to(),
            targets: event._targets,
            data: event._data,
            reward_tokens: event._rewardTokens,
            reward_amounts: event._rewardAmounts,
            expiry_time: event._expiryTime.saturating_to(),
            nonce: event.nonce,
        });
    }
    if let Ok(withdrawal) = log.log_decode::<IntentSource::Withdrawal>() {
        let event = withdrawal.inner.data;
        return Some(LedgerEvent::Withdrawal {
            hash: event._hash,
            recipient: event._recipient,
        });
    }
    if let Ok(fulfillment) = log.log_decode::<Inbox::Fulfillment>() {
        let event = fulfillment.inner.data;
        return Some(LedgerEvent::Fulfillment {
            hash: event._hash,
            source_chain_id: event._sourceChainID.saturating_to(),
            claimant: event._claimant,
        });
    }
    if let Ok(proven) = log.log_decode::<Prover::IntentProven>() {
        let event = proven.inner.data;
        return Some(LedgerEvent::IntentProven {
            hash: event._hash,
            claimant: event._claimant,
        });
    }
    if let Ok(proven) = log.log_decode::<Prover::L2WorldStateProven>() {
        let event = proven.inner.data;
        return Some(LedgerEvent::WorldStateProven {
            chain_id: event._destinationChainID.saturating_to(),
            block_number: event._blockNumber.saturating_to(),
            state_root: event._L2WorldStateRoot,
        });
    }
    if let Ok(proven) = log.log_decode::<Prover::L1WorldStateProven>() {
        let event = proven.inner.data;
        return Some(LedgerEvent::SettlementStateProven {
            chain_id: 0,
            block_number: event._blocknumber.saturating_to(),
            state_root: event._L1WorldStateRoot,
        });
    }
    None
}

pub fn to_receipt(receipt: &TransactionReceipt) -> Receipt {
    Receipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        events: ledger_events(receipt.inner.logs()),
    }
}

/// Hash of the first intent created in `receipt`.
pub fn created_intent(receipt: &Receipt) -> Option<B256> {
    receipt.events.iter().find_map(|event| match event {
        LedgerEvent::IntentCreated { hash, .. } => Some(*hash),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, LogData, U256};
    use alloy_sol_types::SolEvent;

    use super::*;

    fn rpc_log(data: LogData) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(0xb0),
                data,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_decodes_fulfillment_and_skips_foreign_logs() {
        let hash = B256::repeat_byte(4);
        let claimant = Address::repeat_byte(0xcc);
        let fulfillment = Inbox::Fulfillment {
            _hash: hash,
            _sourceChainID: U256::from(10),
            _claimant: claimant,
        };
        let foreign = LogData::new_unchecked(vec![B256::repeat_byte(1)], Default::default());

        let events = ledger_events(&[rpc_log(fulfillment.encode_log_data()), rpc_log(foreign)]);
        assert_eq!(
            events,
            vec![LedgerEvent::Fulfillment {
                hash,
                source_chain_id: 10,
                claimant
            }]
        );
    }
}
