pub mod anchor;
pub mod bedrock;
pub mod cannon;
pub mod context;
pub mod intent;
pub mod pipeline;
pub mod retry;

pub use context::ChainContext;
pub use pipeline::{IntentProver, ProofOutcome, ProveRequest};
pub use retry::RetrySettings;
