use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Events emitted by the three ledgers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    IntentCreated {
        hash: B256,
        creator: Address,
        destination_chain_id: u64,
        targets: Vec<Address>,
        data: Vec<Bytes>,
        reward_tokens: Vec<Address>,
        reward_amounts: Vec<U256>,
        expiry_time: u64,
        nonce: B256,
    },
    Withdrawal {
        hash: B256,
        recipient: Address,
    },
    Fulfillment {
        hash: B256,
        source_chain_id: u64,
        claimant: Address,
    },
    SettlementStateProven {
        chain_id: u64,
        block_number: u64,
        state_root: B256,
    },
    WorldStateProven {
        chain_id: u64,
        block_number: u64,
        state_root: B256,
    },
    IntentProven {
        hash: B256,
        claimant: Address,
    },
}

/// Confirmation of a ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub events: Vec<LedgerEvent>,
}
