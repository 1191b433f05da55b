use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_primitives::{Address, B256, address};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow};
use intent_types::chain::L1_BLOCK_ORACLE;
use intent_types::{ChainConfiguration, ProvingMechanism};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prover::retry::RetrySettings;

/// L2OutputOracle committing Base outputs on mainnet.
pub const BASE_L2_OUTPUT_ORACLE: Address = address!("56315b90c40730925ec5485cf004d835058518a0");
/// DisputeGameFactory creating Optimism fault dispute games on mainnet.
pub const OPTIMISM_DISPUTE_GAME_FACTORY: Address = address!("e5965ab5962edc7477c8520243a95517cd252fa9");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chains this prover can reach, keyed by chain id.
    pub chains: BTreeMap<u64, ChainSettings>,

    /// Backoff for "not yet" conditions and transport failures.
    pub retry: RetrySettings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// JSON-RPC endpoint of the chain's execution node.
    pub rpc_url: String,

    /// Environment variable holding the hex private key that signs transactions.
    pub signer_key_env: Option<String>,

    /// Ledger contracts deployed on this chain.
    pub contracts: ContractAddresses,

    /// How this chain's state is proven against its settlement layer, if it has one.
    pub proving: Option<ProvingSettings>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub intent_source: Address,
    pub inbox: Address,
    pub prover: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingSettings {
    pub mechanism: ProvingMechanism,
    pub settlement_chain_id: u64,
    /// L2OutputOracle for Bedrock chains, DisputeGameFactory for Cannon chains.
    pub settlement_contract: Address,
    #[serde(default = "default_blockhash_oracle")]
    pub blockhash_oracle: Address,
    #[serde(default)]
    pub output_root_version: B256,
    /// Dispute game type accepted when searching for a covering game.
    #[serde(default)]
    pub game_type: u32,
    /// How many of the newest games are searched.
    #[serde(default = "default_game_scan_depth")]
    pub game_scan_depth: u64,
}

fn default_blockhash_oracle() -> Address {
    L1_BLOCK_ORACLE
}

fn default_game_scan_depth() -> u64 {
    50
}

impl ProvingSettings {
    pub fn chain_configuration(&self) -> ChainConfiguration {
        ChainConfiguration {
            proving_mechanism: self.mechanism,
            settlement_chain_id: self.settlement_chain_id,
            settlement_contract: self.settlement_contract,
            blockhash_oracle: self.blockhash_oracle,
            output_root_version: self.output_root_version,
        }
    }
}

impl ChainSettings {
    /// Reads the signing key from the configured environment variable, if any.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>> {
        let Some(var) = &self.signer_key_env else {
            return Ok(None);
        };
        let key = std::env::var(var).with_context(|| format!("signer key variable {var} is not set"))?;
        let signer = PrivateKeySigner::from_str(key.trim()).with_context(|| format!("invalid private key in {var}"))?;
        Ok(Some(signer))
    }
}

impl Default for Config {
    fn default() -> Self {
        let settlement = |mechanism, settlement_contract| ProvingSettings {
            mechanism,
            settlement_chain_id: 1,
            settlement_contract,
            blockhash_oracle: L1_BLOCK_ORACLE,
            output_root_version: B256::ZERO,
            game_type: 0,
            game_scan_depth: default_game_scan_depth(),
        };
        let chains = BTreeMap::from([
            (
                1,
                ChainSettings {
                    rpc_url: "http://localhost:8545".into(),
                    ..Default::default()
                },
            ),
            (
                10,
                ChainSettings {
                    rpc_url: "http://localhost:9545".into(),
                    signer_key_env: Some("PROVER_PRIVATE_KEY".into()),
                    contracts: ContractAddresses::default(),
                    proving: Some(settlement(ProvingMechanism::Cannon, OPTIMISM_DISPUTE_GAME_FACTORY)),
                },
            ),
            (
                8453,
                ChainSettings {
                    rpc_url: "http://localhost:10545".into(),
                    signer_key_env: Some("PROVER_PRIVATE_KEY".into()),
                    contracts: ContractAddresses::default(),
                    proving: Some(settlement(ProvingMechanism::Bedrock, BASE_L2_OUTPUT_ORACLE)),
                },
            ),
        ]);
        Self {
            chains,
            retry: RetrySettings::default(),
        }
    }
}

impl Config {
    /// The default service home directory.
    pub const APP_HOME: &str = ".intent-prover";
    /// The default configuration directory.
    pub const CONFIG_DIR: &str = "config";
    /// The default configuration file in YAML format.
    pub const CONFIG_FILE: &str = "config.yaml";

    fn home_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("cannot find home directory"))?
            .join(Self::APP_HOME))
    }

    /// Initializes the local configuration directory and writes the default config if missing.
    pub fn init() -> Result<PathBuf> {
        Self::init_at(&Self::home_dir()?)
    }

    /// Same as [`Config::init`] under an explicit home directory.
    pub fn init_at(home_dir: &Path) -> Result<PathBuf> {
        let config_dir = home_dir.join(Self::CONFIG_DIR);
        fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join(Self::CONFIG_FILE);
        if !config_path.exists() {
            info!("creating default config at {config_path:?}");
            let yaml = serde_yaml::to_string(&Config::default())?;
            fs::write(&config_path, yaml)?;
        } else {
            info!("config file already exists at {config_path:?}");
        }
        Ok(config_path)
    }

    /// Returns the default application config path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(Self::CONFIG_DIR).join(Self::CONFIG_FILE))
    }

    /// Loads the application config from the service home directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(anyhow!("config file not found at {}", config_path.display()));
        }

        info!("reading config file at {}", config_path.display());
        let config_yaml = fs::read_to_string(config_path).context("Failed to read config file from path")?;
        let config = serde_yaml::from_str(&config_yaml)?;

        Ok(config)
    }

    pub fn chain(&self, chain_id: u64) -> Result<&ChainSettings> {
        self.chains
            .get(&chain_id)
            .ok_or_else(|| anyhow!("chain {chain_id} is not configured"))
    }
}
