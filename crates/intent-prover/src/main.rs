use clap::Parser;
use tracing_subscriber::EnvFilter;

use intent_prover::commands::{
    self,
    cli::{Cli, Commands},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Quiet the transport stack by default; RUST_LOG adds directives on top.
    let mut filter = EnvFilter::new("info,alloy_transport_http=warn,hyper_util=warn,reqwest=warn");
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if let Ok(parsed) = env_filter.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Init {} => commands::command::init()?,
        Commands::Version {} => commands::command::version(),
        Commands::Prove {
            source_chain,
            intent_hash,
            fulfillment_tx,
            game_index,
        } => commands::command::prove(source_chain, intent_hash, fulfillment_tx, game_index).await?,
        Commands::Withdraw {
            source_chain,
            intent_hash,
        } => commands::command::withdraw(source_chain, intent_hash).await?,
        Commands::Intent {
            source_chain,
            intent_hash,
        } => commands::command::intent(source_chain, intent_hash).await?,
    }

    Ok(())
}
