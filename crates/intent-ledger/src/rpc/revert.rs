use alloy::contract::Error as ContractError;
use alloy::transports::TransportResult;
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::SolInterface;
use intent_types::{GameStatus, Reason};

use crate::bindings::{Inbox::InboxErrors, IntentSource::IntentSourceErrors, Prover::ProverErrors};

/// Maps revert data from any of the ledger contracts to a [`Reason`].
pub fn decode_revert_data(data: &[u8]) -> Reason {
    if let Ok(err) = IntentSourceErrors::abi_decode(data) {
        return match err {
            IntentSourceErrors::CalldataMismatch(_) => Reason::CalldataMismatch,
            IntentSourceErrors::RewardsMismatch(_) => Reason::RewardsMismatch,
            IntentSourceErrors::ExpiryTooSoon(_) => Reason::ExpiryTooSoon {
                expiry_time: 0,
                minimum: 0,
            },
            IntentSourceErrors::UnauthorizedWithdrawal(_) => Reason::UnauthorizedWithdrawal,
            IntentSourceErrors::NothingToWithdraw(_) => Reason::NothingToWithdraw,
        };
    }
    if let Ok(err) = InboxErrors::abi_decode(data) {
        return match err {
            InboxErrors::IntentExpired(_) => Reason::IntentExpired,
            InboxErrors::InvalidHash(err) => Reason::InvalidHash {
                expected: err._expectedHash,
            },
            InboxErrors::IntentAlreadyFulfilled(err) => Reason::IntentAlreadyFulfilled(err._hash),
            InboxErrors::IntentCallFailed(err) => Reason::IntentCallFailed {
                index: 0,
                target: err._addr,
                reason: format!("returned {}", err._returnData),
            },
            InboxErrors::ZeroClaimant(_) => Reason::ZeroClaimant,
        };
    }
    if let Ok(err) = ProverErrors::abi_decode(data) {
        return match err {
            ProverErrors::InvalidRLPEncodedBlock(err) => Reason::SettlementBlockHashMismatch {
                expected: err._expectedBlockHash,
                actual: err._calculatedBlockHash,
            },
            ProverErrors::SettlementChainStateRootNotProved(err) => Reason::SettlementStateNotProven {
                chain_id: 0,
                state_root: err._l1WorldStateRoot,
            },
            ProverErrors::DestinationChainStateRootNotProved(err) => Reason::DestinationStateNotProven {
                chain_id: 0,
                state_root: err._l2WorldStateRoot,
            },
            ProverErrors::BlockNumberTooLow(err) => Reason::Reverted(
                format!("block {} is below the latest proven {}", err._inputBlockNumber, err._latestBlockNumber)
                    .into_bytes()
                    .into(),
            ),
            ProverErrors::InvalidStorageProof(_) => Reason::Proof(evm_storage_proofs::ProofError::Storage {
                slot: B256::ZERO,
                reason: "rejected on chain".into(),
            }),
            ProverErrors::InvalidAccountProof(_) => Reason::Proof(evm_storage_proofs::ProofError::Account {
                address: Address::ZERO,
                reason: "rejected on chain".into(),
            }),
            ProverErrors::FaultDisputeGameUnresolved(err) => Reason::GameNotResolved {
                game: Address::ZERO,
                status: GameStatus::from_u8(err._gameStatus).unwrap_or(GameStatus::InProgress),
            },
            ProverErrors::ChainNotConfigured(err) => Reason::UnsupportedChain(err._chainId.saturating_to()),
            ProverErrors::IntentAlreadyProven(err) => Reason::IntentAlreadyProven(err._hash, err._claimant),
        };
    }
    Reason::Reverted(data.to_vec().into())
}

/// Classifies a failed contract call: reverts by their data, everything else as transport.
pub fn from_contract_error(err: ContractError) -> Reason {
    match err.as_revert_data() {
        Some(data) => decode_revert_data(&data),
        None => Reason::Rpc(err.to_string()),
    }
}

/// Reason for a mined transaction that reverted, from the result of replaying it as a call.
///
/// A replay that succeeds or fails without revert data means state moved on since the block,
/// so only the bare revert is known.
pub fn replayed_revert(replay: TransportResult<Bytes>) -> Reason {
    let data = replay.err().and_then(|err| ContractError::from(err).as_revert_data());
    match data {
        Some(data) => decode_revert_data(&data),
        None => Reason::Reverted(Bytes::new()),
    }
}

#[cfg(test)]
mod tests {
    use alloy::transports::{RpcError, TransportErrorKind};
    use alloy_primitives::{U256, hex};
    use alloy_sol_types::SolError;

    use super::*;
    use crate::bindings::{Inbox, IntentSource, Prover};

    #[test]
    fn test_known_errors_map_to_reasons() {
        let hash = B256::repeat_byte(7);
        let data = Inbox::InvalidHash { _expectedHash: hash }.abi_encode();
        assert_eq!(decode_revert_data(&data), Reason::InvalidHash { expected: hash });

        let data = IntentSource::NothingToWithdraw { _hash: hash }.abi_encode();
        assert_eq!(decode_revert_data(&data), Reason::NothingToWithdraw);

        let claimant = Address::repeat_byte(0xcc);
        let data = Prover::IntentAlreadyProven {
            _hash: hash,
            _claimant: claimant,
        }
        .abi_encode();
        assert_eq!(decode_revert_data(&data), Reason::IntentAlreadyProven(hash, claimant));

        let data = Prover::ChainNotConfigured { _chainId: U256::from(42) }.abi_encode();
        assert_eq!(decode_revert_data(&data), Reason::UnsupportedChain(42));
    }

    #[test]
    fn test_unknown_revert_is_kept_raw() {
        let data = vec![0xde, 0xad, 0xbe, 0xef];
        assert_eq!(decode_revert_data(&data), Reason::Reverted(Bytes::from(data)));
    }

    fn execution_reverted(data: &[u8]) -> RpcError<TransportErrorKind> {
        let payload = format!(
            r#"{{"code":3,"message":"execution reverted","data":"0x{}"}}"#,
            hex::encode(data)
        );
        RpcError::ErrorResp(serde_json::from_str(&payload).unwrap())
    }

    #[test]
    fn test_replayed_revert_decodes_ledger_errors() {
        let hash = B256::repeat_byte(2);
        let data = IntentSource::UnauthorizedWithdrawal { _hash: hash }.abi_encode();
        assert_eq!(
            replayed_revert(Err(execution_reverted(&data))),
            Reason::UnauthorizedWithdrawal
        );

        let data = Inbox::IntentAlreadyFulfilled { _hash: hash }.abi_encode();
        assert_eq!(
            replayed_revert(Err(execution_reverted(&data))),
            Reason::IntentAlreadyFulfilled(hash)
        );
    }

    #[test]
    fn test_replay_without_revert_data_is_a_bare_revert() {
        assert_eq!(replayed_revert(Ok(Bytes::new())), Reason::Reverted(Bytes::new()));
        let transport = RpcError::Transport(TransportErrorKind::BackendGone);
        assert_eq!(replayed_revert(Err(transport)), Reason::Reverted(Bytes::new()));
    }
}
