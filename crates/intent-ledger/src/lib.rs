pub mod bindings;
pub mod local;
pub mod ports;
pub mod rpc;

pub use local::{LocalChain, LocalContract, LocalSigner, transfer_calldata};
pub use ports::{
    BlockhashOracle, GameSummary, InboxLedger, IntentSourceLedger, OutputProposal, ProverLedger, SettlementReader,
};
pub use rpc::{RpcContract, RpcReader};
