//! Proves the settlement-layer state the source chain currently sees.

use intent_types::proofs::verify_settlement_header;
use intent_types::{ChainConfiguration, LedgerResult, ProvenState, Reason};
use tracing::{info, warn};

use super::context::ChainContext;

/// Reads the blockhash oracle on `source`, fetches the matching header from `settlement` and
/// submits it. Every later settlement read is pinned to the returned block.
pub async fn prove_settlement_state(
    source: &ChainContext,
    settlement: &ChainContext,
    config: &ChainConfiguration,
) -> LedgerResult<ProvenState> {
    let (number, oracle_hash) = source.oracle.settlement_block(config.blockhash_oracle).await?;
    let header = settlement.provider.header(number).await?;
    let rlp_header = header.encode_rlp();

    // Checked locally before submission.
    let anchor = verify_settlement_header(&rlp_header, oracle_hash)?;
    if let Err(err) = source.prover.prove_settlement_layer_state(rlp_header).await {
        // The prover compares against the oracle as it stands when the transaction lands.
        if matches!(err, Reason::SettlementBlockHashMismatch { .. }) {
            let current = source.oracle.settlement_block(config.blockhash_oracle).await?;
            if current != (number, oracle_hash) {
                warn!(block = number, current = current.0, "blockhash oracle moved while anchoring");
                return Err(Reason::SettlementAnchorMoved(number));
            }
        }
        return Err(err);
    }

    info!(
        settlement_chain = settlement.chain_id,
        block = anchor.block_number,
        state_root = %anchor.state_root,
        "settlement state proven"
    );
    Ok(anchor)
}
