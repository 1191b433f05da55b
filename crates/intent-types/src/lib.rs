pub mod chain;
pub mod events;
pub mod game;
pub mod intent;
pub mod output;
pub mod proofs;
pub mod reason;

pub use chain::{ChainConfiguration, ChainConfigurations, ProvingMechanism};
pub use events::{LedgerEvent, Receipt};
pub use game::{GameId, GameStatus, GameStatusSlot};
pub use intent::{CreateIntent, FulfillRequest, Intent};
pub use proofs::{BedrockProof, CannonProof, IntentProof, ProvenState};
pub use reason::{LedgerResult, Reason, ReasonKind};
