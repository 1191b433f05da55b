use alloy_primitives::{B256, U256};
use anyhow::{Result, anyhow};
use intent_types::Reason;
use tracing::info;

use crate::commands::cli::VERSION;
use crate::config::Config;
use crate::prover::{ChainContext, IntentProver, ProofOutcome, ProveRequest};

fn failure(reason: Reason) -> anyhow::Error {
    let (kind, message) = reason.describe();
    anyhow!("{kind:?}: {message}")
}

pub fn init() -> Result<()> {
    let path = Config::init()?;
    info!("configuration ready at {}", path.display());
    Ok(())
}

pub fn version() {
    println!("version: {VERSION}");
}

pub async fn prove(source_chain: u64, intent_hash: B256, fulfillment_tx: B256, game_index: Option<U256>) -> Result<()> {
    let config = Config::load()?;
    let source = ChainContext::connect(source_chain, config.chain(source_chain)?)?;

    let intent = source.intent_source.get_intent(intent_hash).await.map_err(failure)?;
    let destination_chain = intent.destination_chain_id;
    let destination = ChainContext::connect(destination_chain, config.chain(destination_chain)?)?;

    let settlement_chain = source
        .prover
        .chain_configuration(destination_chain)
        .await
        .map_err(failure)?
        .settlement_chain_id;
    let settlement = ChainContext::connect(settlement_chain, config.chain(settlement_chain)?)?;

    info!(%intent_hash, source_chain, destination_chain, settlement_chain, "proving intent");
    let prover = IntentProver::new(source, settlement, destination, config.retry.clone());
    let request = ProveRequest {
        intent_hash,
        fulfillment_tx,
        game_index,
    };
    match prover.prove(&request).await.map_err(failure)? {
        ProofOutcome::AlreadyProven { claimant } => println!("already proven, claimant {claimant}"),
        ProofOutcome::Proven {
            claimant,
            destination,
            receipt,
            ..
        } => println!(
            "proven at destination block {}, claimant {claimant}, tx {}",
            destination.block_number, receipt.tx_hash
        ),
    }
    Ok(())
}

pub async fn withdraw(source_chain: u64, intent_hash: B256) -> Result<()> {
    let config = Config::load()?;
    let source = ChainContext::connect(source_chain, config.chain(source_chain)?)?;
    let receipt = source
        .intent_source
        .withdraw_rewards(intent_hash)
        .await
        .map_err(failure)?;
    println!("rewards withdrawn in tx {} (block {})", receipt.tx_hash, receipt.block_number);
    Ok(())
}

pub async fn intent(source_chain: u64, intent_hash: B256) -> Result<()> {
    let config = Config::load()?;
    let source = ChainContext::connect(source_chain, config.chain(source_chain)?)?;
    let (intent, claimant) = tokio::try_join!(
        source.intent_source.get_intent(intent_hash),
        source.prover.proven_intent(intent_hash),
    )
    .map_err(failure)?;

    println!("creator:          {}", intent.creator);
    println!("destination:      {}", intent.destination_chain_id);
    println!("inbox:            {}", intent.inbox);
    println!("expiry:           {}", intent.expiry_time);
    println!("nonce:            {}", intent.nonce);
    for (token, amount) in intent.reward_tokens.iter().zip(&intent.reward_amounts) {
        println!("reward:           {amount} of {token}");
    }
    println!("withdrawn:        {}", intent.has_been_withdrawn);
    match claimant {
        Some(claimant) => println!("proven claimant:  {claimant}"),
        None => println!("proven claimant:  none"),
    }
    Ok(())
}
