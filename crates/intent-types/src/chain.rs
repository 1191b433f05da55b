use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::{Address, B256, address};
use serde::{Deserialize, Serialize};

/// L2-to-L1 message passer predeploy on OP-stack chains.
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");
/// L1Block predeploy, the blockhash oracle mirroring the settlement chain on OP-stack chains.
pub const L1_BLOCK_ORACLE: Address = address!("4200000000000000000000000000000000000015");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvingMechanism {
    /// Output roots committed to an L2OutputOracle array.
    Bedrock,
    /// Output roots claimed by fault dispute games created through a factory.
    Cannon,
}

impl fmt::Display for ProvingMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvingMechanism::Bedrock => write!(f, "bedrock"),
            ProvingMechanism::Cannon => write!(f, "cannon"),
        }
    }
}

/// How a chain's state is tied back to its settlement layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfiguration {
    pub proving_mechanism: ProvingMechanism,
    pub settlement_chain_id: u64,
    /// L2OutputOracle for Bedrock, DisputeGameFactory for Cannon.
    pub settlement_contract: Address,
    pub blockhash_oracle: Address,
    pub output_root_version: B256,
}

/// Registered configurations keyed by chain id. Entries are never replaced once set.
pub type ChainConfigurations = BTreeMap<u64, ChainConfiguration>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mechanism_names() {
        assert_eq!(serde_json::to_string(&ProvingMechanism::Cannon).unwrap(), "\"cannon\"");
        let parsed: ProvingMechanism = serde_json::from_str("\"bedrock\"").unwrap();
        assert_eq!(parsed, ProvingMechanism::Bedrock);
        assert_eq!(ProvingMechanism::Bedrock.to_string(), "bedrock");
    }
}
