//! Output roots and the storage layouts the proofs point into.

use alloy_primitives::{Address, B256, U256, b256, keccak256};
use alloy_sol_types::SolValue;

/// `l2Outputs` array slot of the L2OutputOracle.
pub const L2_OUTPUT_SLOT_NUMBER: u64 = 3;
/// `_disputeGameList` array slot of the DisputeGameFactory.
pub const DISPUTE_GAME_LIST_SLOT_NUMBER: u64 = 104;
/// Slot of a fault dispute game's root claim, `keccak256(2)`.
pub const FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT: B256 =
    b256!("405787fa12a823e0f2b7631cc41b3ba8828b3321ca811111fa75cd3aa3bb5ad1");
/// Slot holding the packed game status word.
pub const FAULT_DISPUTE_GAME_STATUS_SLOT: B256 = B256::ZERO;
/// `fulfilled` mapping slot of the inbox.
pub const INBOX_FULFILLED_SLOT_NUMBER: u64 = 0;

/// `keccak256(version ‖ stateRoot ‖ messagePasserStorageRoot ‖ blockHash)`
pub fn generate_output_root(version: B256, state_root: B256, message_passer_storage_root: B256, block_hash: B256) -> B256 {
    let mut preimage = [0u8; 128];
    preimage[0..32].copy_from_slice(version.as_slice());
    preimage[32..64].copy_from_slice(state_root.as_slice());
    preimage[64..96].copy_from_slice(message_passer_storage_root.as_slice());
    preimage[96..128].copy_from_slice(block_hash.as_slice());
    keccak256(preimage)
}

/// Slot of element `index` of a dynamic array declared at `base_slot` with `words` words per element.
pub fn array_element_slot(base_slot: u64, index: U256, words: u64) -> B256 {
    let first = U256::from_be_bytes(keccak256(B256::from(U256::from(base_slot))).0);
    B256::from(first.wrapping_add(index.wrapping_mul(U256::from(words))))
}

pub fn l2_output_slot(index: U256) -> B256 {
    array_element_slot(L2_OUTPUT_SLOT_NUMBER, index, 2)
}

pub fn dispute_game_slot(index: U256) -> B256 {
    array_element_slot(DISPUTE_GAME_LIST_SLOT_NUMBER, index, 1)
}

/// Slot of `fulfilled[intentHash]`.
pub fn inbox_fulfilled_slot(intent_hash: B256) -> B256 {
    keccak256((intent_hash, U256::from(INBOX_FULFILLED_SLOT_NUMBER)).abi_encode_params())
}

/// Second word of an output proposal: `timestamp` in the low 128 bits, `l2BlockNumber` above.
pub fn output_metadata_word(timestamp: u64, l2_block_number: u64) -> U256 {
    U256::from(timestamp) | (U256::from(l2_block_number) << 128)
}

/// Inverse of [`output_metadata_word`]: `(timestamp, l2BlockNumber)`.
pub fn split_output_metadata(word: U256) -> (u64, u64) {
    let mask = U256::from(u64::MAX);
    ((word & mask).to::<u64>(), ((word >> 128usize) & mask).to::<u64>())
}

pub fn address_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

pub fn word_address(word: U256) -> Address {
    Address::from_word(B256::from(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_claim_slot_is_array_head() {
        assert_eq!(array_element_slot(2, U256::ZERO, 1), FAULT_DISPUTE_GAME_ROOT_CLAIM_SLOT);
    }

    #[test]
    fn test_output_slots_stride_two_words() {
        let first = U256::from_be_bytes(l2_output_slot(U256::ZERO).0);
        let fifth = U256::from_be_bytes(l2_output_slot(U256::from(5)).0);
        assert_eq!(fifth - first, U256::from(10));
        assert_eq!(first, U256::from_be_bytes(keccak256(B256::from(U256::from(3))).0));

        let game = U256::from_be_bytes(dispute_game_slot(U256::from(5)).0);
        assert_eq!(game - U256::from_be_bytes(dispute_game_slot(U256::ZERO).0), U256::from(5));
    }

    #[test]
    fn test_output_root_preimage() {
        let root = generate_output_root(B256::ZERO, B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3));
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&[0u8; 32]);
        preimage.extend_from_slice(&[1u8; 32]);
        preimage.extend_from_slice(&[2u8; 32]);
        preimage.extend_from_slice(&[3u8; 32]);
        assert_eq!(root, keccak256(preimage));
        assert_ne!(
            root,
            generate_output_root(B256::ZERO, B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(4))
        );
    }

    #[test]
    fn test_inbox_slot_is_mapping_slot() {
        let hash = B256::repeat_byte(0x5a);
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(hash.as_slice());
        assert_eq!(inbox_fulfilled_slot(hash), keccak256(preimage));
    }

    #[test]
    fn test_word_conversions() {
        let claimant = Address::repeat_byte(0xdd);
        assert_eq!(word_address(address_word(claimant)), claimant);
        assert_eq!(split_output_metadata(output_metadata_word(1_700_000_000, 42)), (1_700_000_000, 42));
    }
}
