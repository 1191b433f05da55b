use alloy_primitives::{Address, B256, Bytes, U256};
use evm_storage_proofs::ProofError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ProvingMechanism;
use crate::game::GameStatus;

/// Result type of every ledger operation.
pub type LedgerResult<T> = std::result::Result<T, Reason>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonKind {
    /// Caller mistake; resubmitting the same input fails the same way.
    InputValidation,
    /// Depends on current ledger state.
    StatePrecondition,
    /// The proof bundle is wrong and must be rebuilt.
    ProofVerification,
    /// Transport failure.
    ExternalIo,
    /// A call made on the caller's behalf failed.
    CallFailed,
}

/// Why a ledger operation or pipeline step did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Reason {
    #[error("targets and call data must be non-empty and of equal length")]
    CalldataMismatch,

    #[error("reward tokens and amounts must be non-empty and of equal length")]
    RewardsMismatch,

    #[error("expiry {expiry_time} is earlier than the minimum {minimum}")]
    ExpiryTooSoon { expiry_time: u64, minimum: u64 },

    #[error("claimant must not be the zero address")]
    ZeroClaimant,

    #[error("chain {0} has no proving configuration")]
    UnsupportedChain(u64),

    #[error("chain {chain_id} is not proven through {expected}")]
    WrongProvingMechanism { chain_id: u64, expected: ProvingMechanism },

    #[error("intent is neither proven nor expired")]
    UnauthorizedWithdrawal,

    #[error("rewards were already withdrawn")]
    NothingToWithdraw,

    #[error("intent {0} is already fulfilled")]
    IntentAlreadyFulfilled(B256),

    #[error("intent has expired")]
    IntentExpired,

    #[error("computed intent hash does not match {expected}")]
    InvalidHash { expected: B256 },

    #[error("intent {0} not found")]
    IntentNotFound(B256),

    #[error("intent {0} is already proven for {1}")]
    IntentAlreadyProven(B256, Address),

    #[error("intent {0} has no fulfillment record yet")]
    IntentNotFulfilled(B256),

    #[error("{token} balance or allowance {available} is below {needed}")]
    InsufficientFunds { token: Address, needed: U256, available: U256 },

    #[error("no contract at {0}")]
    UnknownContract(Address),

    #[error("settlement state root {state_root} of chain {chain_id} is not proven")]
    SettlementStateNotProven { chain_id: u64, state_root: B256 },

    #[error("state root {state_root} of chain {chain_id} is not proven")]
    DestinationStateNotProven { chain_id: u64, state_root: B256 },

    #[error("no output has been proposed for l2 block {0} yet")]
    OutputNotYetProposed(u64),

    #[error("no dispute game covers l2 block {0} yet")]
    NoGameCovering(u64),

    #[error("dispute game {game} is not resolved in the defender's favour ({status:?})")]
    GameNotResolved { game: Address, status: GameStatus },

    #[error("blockhash oracle moved past settlement block {0} before it was proven")]
    SettlementAnchorMoved(u64),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error("settlement header hashes to {actual}, oracle reports {expected}")]
    SettlementBlockHashMismatch { expected: B256, actual: B256 },

    #[error("block hash {actual} differs from {expected}")]
    BlockHashMismatch { expected: B256, actual: B256 },

    #[error("header state root {header} differs from claimed {claimed}")]
    StateRootMismatch { header: B256, claimed: B256 },

    #[error("recomputed output root {computed} differs from committed {committed}")]
    OutputRootMismatch { computed: B256, committed: B256 },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("call {index} to {target} failed: {reason}")]
    IntentCallFailed { index: usize, target: Address, reason: String },

    #[error("reverted with {0}")]
    Reverted(Bytes),
}

impl Reason {
    pub fn kind(&self) -> ReasonKind {
        match self {
            Reason::CalldataMismatch
            | Reason::RewardsMismatch
            | Reason::ExpiryTooSoon { .. }
            | Reason::ZeroClaimant
            | Reason::UnsupportedChain(_)
            | Reason::WrongProvingMechanism { .. } => ReasonKind::InputValidation,

            Reason::UnauthorizedWithdrawal
            | Reason::NothingToWithdraw
            | Reason::IntentAlreadyFulfilled(_)
            | Reason::IntentExpired
            | Reason::InvalidHash { .. }
            | Reason::IntentNotFound(_)
            | Reason::IntentAlreadyProven(..)
            | Reason::IntentNotFulfilled(_)
            | Reason::InsufficientFunds { .. }
            | Reason::SettlementStateNotProven { .. }
            | Reason::DestinationStateNotProven { .. }
            | Reason::OutputNotYetProposed(_)
            | Reason::NoGameCovering(_)
            | Reason::GameNotResolved { .. }
            | Reason::SettlementAnchorMoved(_) => ReasonKind::StatePrecondition,

            Reason::Proof(_)
            | Reason::SettlementBlockHashMismatch { .. }
            | Reason::BlockHashMismatch { .. }
            | Reason::StateRootMismatch { .. }
            | Reason::OutputRootMismatch { .. } => ReasonKind::ProofVerification,

            Reason::Rpc(_) => ReasonKind::ExternalIo,

            Reason::UnknownContract(_) | Reason::IntentCallFailed { .. } | Reason::Reverted(_) => ReasonKind::CallFailed,
        }
    }

    /// "Not yet" conditions and transport failures; retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Reason::Rpc(_)
                | Reason::IntentNotFulfilled(_)
                | Reason::OutputNotYetProposed(_)
                | Reason::NoGameCovering(_)
                | Reason::GameNotResolved { .. }
                | Reason::SettlementAnchorMoved(_)
        )
    }

    /// Structured `(kind, message)` form for reporting.
    pub fn describe(&self) -> (ReasonKind, String) {
        (self.kind(), self.to_string())
    }
}

/// Chain reads fail with transport errors, except for a header the node serves under a hash
/// it does not re-encode to, which no retry can fix.
impl From<anyhow::Error> for Reason {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ProofError>() {
            Ok(ProofError::HeaderHash { computed, reported, .. }) => Reason::BlockHashMismatch {
                expected: reported,
                actual: computed,
            },
            Ok(proof) => Reason::Proof(proof),
            Err(err) => Reason::Rpc(format!("{err:#}")),
        }
    }
}
