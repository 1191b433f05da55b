use alloy_primitives::Keccak256;

#[cfg(feature = "alloy")]
pub mod client;
pub mod header;
pub mod memory;
pub mod proof;
pub mod provider;

pub use header::BlockHeader;
pub use proof::{ProofError, verify_account, verify_storage};
pub use provider::ChainStateProvider;

pub fn digest_keccak(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
