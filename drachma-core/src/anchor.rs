//! Layer-2 side of the finality-commitment protocol (§4.7):
//! `ValidateL3Commit` checks OBOLOS-produced commitments before they
//! anchor into DRACHMA. Grounded in
//! `original_source/src/drachma/pos_consensus.cpp`'s `ValidateL3Commit`.

use shared::commitment::{
    signed_stake_weight, validate_finality_quorum, validate_payload_encoding, Commitment, SourceChain,
    DEFAULT_QUORUM_DENOMINATOR, DEFAULT_QUORUM_NUMERATOR,
};

use crate::error::{DrachmaError, Result};

/// Per-layer tracker of the last finalized height, enforcing monotonic
/// advancement of commitments anchored into DRACHMA (§3). Mirrors
/// `talanton_core::finality::AnchorState`; kept as a distinct type
/// since each layer owns its own instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorState {
    pub last_finalized_height: u64,
}

impl AnchorState {
    #[must_use]
    pub const fn new() -> Self {
        Self { last_finalized_height: 0 }
    }

    /// Advances the tracker after a commitment is accepted. Callers
    /// must only invoke this once `validate_l3_commit` has accepted `c`.
    pub fn advance(&mut self, height: u64) {
        self.last_finalized_height = height;
    }
}

/// Validates an OBOLOS-sourced commitment before it anchors into L2
/// (§4.7): source must be OBOLOS, the finalized height must exceed the
/// anchor's last finalized height, the encoding must be valid, and
/// quorum must be met over `active_stake`.
pub fn validate_l3_commit(commitment: &Commitment, anchor: &AnchorState, active_stake: u64) -> Result<()> {
    if commitment.source != SourceChain::Obolos {
        return Err(DrachmaError::Commitment(shared::commitment::CommitmentError::WrongSource));
    }
    if commitment.finalized_height <= anchor.last_finalized_height {
        return Err(DrachmaError::Commitment(
            shared::commitment::CommitmentError::NonMonotonicHeight {
                height: commitment.finalized_height,
                last: anchor.last_finalized_height,
            },
        ));
    }
    validate_payload_encoding(commitment)?;

    let signed = signed_stake_weight(commitment);
    validate_finality_quorum(signed, active_stake, DEFAULT_QUORUM_NUMERATOR, DEFAULT_QUORUM_DENOMINATOR)?;

    tracing::info!(
        height = commitment.finalized_height,
        epoch = commitment.epoch,
        signed,
        active_stake,
        "OBOLOS commitment validated at DRACHMA"
    );
    Ok(())
}
