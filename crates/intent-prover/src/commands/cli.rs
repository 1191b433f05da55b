use alloy_primitives::{B256, U256};
use clap::{Parser, Subcommand};

pub const VERSION: &str = "v0.1.0";

#[derive(Parser)]
#[command(name = "intent-prover", version = VERSION, about = "Cross-chain intent prover CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration and home directory
    Init {},

    /// Show the service version
    Version {},

    /// Prove a fulfilled intent back to its source chain
    Prove {
        /// Chain the intent was created on
        #[arg(long)]
        source_chain: u64,

        /// Intent hash
        #[arg(long)]
        intent_hash: B256,

        /// Transaction that fulfilled the intent on the destination chain
        #[arg(long)]
        fulfillment_tx: B256,

        /// Dispute game index to prove through (Cannon chains only)
        #[arg(long)]
        game_index: Option<U256>,
    },

    /// Withdraw an intent's rewards to its proven claimant, or to the creator once expired
    Withdraw {
        /// Chain the intent was created on
        #[arg(long)]
        source_chain: u64,

        /// Intent hash
        #[arg(long)]
        intent_hash: B256,
    },

    /// Show an intent and its proving status
    Intent {
        /// Chain the intent was created on
        #[arg(long)]
        source_chain: u64,

        /// Intent hash
        #[arg(long)]
        intent_hash: B256,
    },
}
