use alloy_primitives::{Address, B64, B256, Bloom, Bytes, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::proof::ProofError;

/// Execution-layer block header in the field order of its canonical RLP list.
/// Encoding and decoding go through `alloy_consensus::Header`.
///
/// The trailing fields are fork-dependent. They are encoded only when present and,
/// because each fork only ever appends, a present field implies all earlier ones are
/// present too.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_hash: B256,
    pub ommers_hash: B256,
    pub beneficiary: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    pub base_fee_per_gas: Option<u64>,
    pub withdrawals_root: Option<B256>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<B256>,
    pub requests_hash: Option<B256>,
}

impl BlockHeader {
    /// Canonical RLP bytes of the header.
    pub fn encode_rlp(&self) -> Bytes {
        alloy_rlp::encode(alloy_consensus::Header::from(self)).into()
    }

    /// Decodes canonical header bytes, rejecting trailing garbage.
    pub fn decode_rlp(bytes: &[u8]) -> Result<Self, ProofError> {
        alloy_rlp::decode_exact::<alloy_consensus::Header>(bytes)
            .map(|header| Self::from(&header))
            .map_err(|e| ProofError::Rlp(e.to_string()))
    }

    /// Block hash, recomputed from the encoding.
    pub fn hash_slow(&self) -> B256 {
        keccak256(self.encode_rlp())
    }

    /// Fails unless the header re-encodes to the hash a node `reported` for it.
    pub fn check_hash(&self, reported: B256) -> Result<(), ProofError> {
        let computed = self.hash_slow();
        if computed != reported {
            return Err(ProofError::HeaderHash {
                number: self.number,
                computed,
                reported,
            });
        }
        Ok(())
    }
}

impl From<&alloy_consensus::Header> for BlockHeader {
    fn from(header: &alloy_consensus::Header) -> Self {
        Self {
            parent_hash: header.parent_hash,
            ommers_hash: header.ommers_hash,
            beneficiary: header.beneficiary,
            state_root: header.state_root,
            transactions_root: header.transactions_root,
            receipts_root: header.receipts_root,
            logs_bloom: header.logs_bloom,
            difficulty: header.difficulty,
            number: header.number,
            gas_limit: header.gas_limit,
            gas_used: header.gas_used,
            timestamp: header.timestamp,
            extra_data: header.extra_data.clone(),
            mix_hash: header.mix_hash,
            nonce: header.nonce,
            base_fee_per_gas: header.base_fee_per_gas,
            withdrawals_root: header.withdrawals_root,
            blob_gas_used: header.blob_gas_used,
            excess_blob_gas: header.excess_blob_gas,
            parent_beacon_block_root: header.parent_beacon_block_root,
            requests_hash: header.requests_hash,
        }
    }
}

impl From<&BlockHeader> for alloy_consensus::Header {
    fn from(header: &BlockHeader) -> Self {
        Self {
            parent_hash: header.parent_hash,
            ommers_hash: header.ommers_hash,
            beneficiary: header.beneficiary,
            state_root: header.state_root,
            transactions_root: header.transactions_root,
            receipts_root: header.receipts_root,
            logs_bloom: header.logs_bloom,
            difficulty: header.difficulty,
            number: header.number,
            gas_limit: header.gas_limit,
            gas_used: header.gas_used,
            timestamp: header.timestamp,
            extra_data: header.extra_data.clone(),
            mix_hash: header.mix_hash,
            nonce: header.nonce,
            base_fee_per_gas: header.base_fee_per_gas,
            withdrawals_root: header.withdrawals_root,
            blob_gas_used: header.blob_gas_used,
            excess_blob_gas: header.excess_blob_gas,
            parent_beacon_block_root: header.parent_beacon_block_root,
            requests_hash: header.requests_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, bytes};
    use alloy_rlp::Encodable;
    use alloy_trie::{EMPTY_ROOT_HASH, KECCAK_EMPTY};

    const MAINNET_GENESIS_HASH: B256 = b256!("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3");

    fn mainnet_genesis() -> BlockHeader {
        BlockHeader {
            ommers_hash: b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"),
            state_root: b256!("d7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"),
            transactions_root: EMPTY_ROOT_HASH,
            receipts_root: EMPTY_ROOT_HASH,
            difficulty: U256::from(17_179_869_184u64),
            gas_limit: 5000,
            extra_data: bytes!("11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa"),
            nonce: B64::from(0x42u64),
            ..Default::default()
        }
    }

    fn cancun_header() -> BlockHeader {
        BlockHeader {
            parent_hash: B256::repeat_byte(0x11),
            ommers_hash: b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"),
            beneficiary: Address::repeat_byte(0x22),
            state_root: B256::repeat_byte(0x33),
            transactions_root: EMPTY_ROOT_HASH,
            receipts_root: EMPTY_ROOT_HASH,
            number: 20_000_000,
            gas_limit: 30_000_000,
            gas_used: 12_345_678,
            timestamp: 1_717_000_000,
            extra_data: bytes!("6265617665726275696c642e6f7267"),
            mix_hash: B256::repeat_byte(0x44),
            base_fee_per_gas: Some(7),
            withdrawals_root: Some(EMPTY_ROOT_HASH),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(393_216),
            parent_beacon_block_root: Some(KECCAK_EMPTY),
            ..Default::default()
        }
    }

    #[test]
    fn test_mainnet_genesis_hash() {
        let header = mainnet_genesis();
        assert_eq!(header.hash_slow(), MAINNET_GENESIS_HASH);
    }

    #[test]
    fn test_check_hash_rejects_divergent_encoding() {
        let header = cancun_header();
        header.check_hash(header.hash_slow()).unwrap();

        // A node that hashes a field missing from the local copy reports a different hash.
        let mut native = alloy_consensus::Header::from(&header);
        native.requests_hash = Some(B256::repeat_byte(0x55));
        let err = header.check_hash(native.hash_slow()).unwrap_err();
        assert_eq!(
            err,
            ProofError::HeaderHash {
                number: 20_000_000,
                computed: header.hash_slow(),
                reported: native.hash_slow(),
            }
        );
    }

    #[test]
    fn test_matches_native_encoding() {
        for header in [mainnet_genesis(), cancun_header()] {
            let native = alloy_consensus::Header::from(&header);
            let mut expected = Vec::new();
            native.encode(&mut expected);

            assert_eq!(header.encode_rlp().as_ref(), expected.as_slice());
            assert_eq!(header.hash_slow(), native.hash_slow());
            assert_eq!(BlockHeader::from(&native), header);
        }
    }

    #[test]
    fn test_decode_roundtrip_keeps_trailing_fields() {
        let mut header = cancun_header();
        header.requests_hash = Some(B256::repeat_byte(0x55));

        let decoded = BlockHeader::decode_rlp(&header.encode_rlp()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.hash_slow(), header.hash_slow());

        let genesis = BlockHeader::decode_rlp(&mainnet_genesis().encode_rlp()).unwrap();
        assert_eq!(genesis.base_fee_per_gas, None);
        assert_eq!(genesis.hash_slow(), MAINNET_GENESIS_HASH);
    }

    #[test]
    fn test_numeric_fields_are_minimal() {
        let header = BlockHeader { number: 0x0100, ..mainnet_genesis() };
        let encoded = header.encode_rlp();
        // 0x82 0x01 0x00: two-byte string, no padding
        let needle = [0x82u8, 0x01, 0x00];
        assert!(encoded.windows(3).any(|w| w == needle));
        assert_ne!(header.hash_slow(), MAINNET_GENESIS_HASH);
    }

    #[test]
    fn test_rejects_malformed_bytes() {
        let encoded = cancun_header().encode_rlp();
        assert!(BlockHeader::decode_rlp(&encoded[..encoded.len() - 1]).is_err());

        let mut padded = encoded.to_vec();
        padded.push(0x00);
        assert!(BlockHeader::decode_rlp(&padded).is_err());

        assert!(BlockHeader::decode_rlp(&alloy_rlp::encode(B256::ZERO)).is_err());
    }
}
