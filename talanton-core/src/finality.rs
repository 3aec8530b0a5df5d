//! Layer-1 side of the finality-commitment protocol (§4.7):
//! `ValidateL2Commit` checks DRACHMA-produced commitments before they
//! are anchored into a TALANTON block. Grounded in
//! `shared::commitment`, which both layers share.

use shared::commitment::{
    signed_stake_weight, validate_finality_quorum, validate_payload_encoding, Commitment, SourceChain,
    DEFAULT_QUORUM_DENOMINATOR, DEFAULT_QUORUM_NUMERATOR,
};

use crate::error::{Result, TalantonError};

/// Per-layer tracker of the last finalized height, enforcing
/// monotonic advancement of anchored commitments (§3).
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
    /// must only invoke this once `ValidateL2Commit` has accepted `c`.
    pub fn advance(&mut self, height: u64) {
        self.last_finalized_height = height;
    }
}

/// Validates a DRACHMA-sourced commitment before it anchors into L1
/// (§4.7): source must be DRACHMA, the finalized height must exceed
/// the anchor's last finalized height, the encoding must be valid
/// (including a non-empty upstream hash), and quorum must be met over
/// `active_stake`.
pub fn validate_l2_commit(commitment: &Commitment, anchor: &AnchorState, active_stake: u64) -> Result<()> {
    if commitment.source != SourceChain::Drachma {
        return Err(TalantonError::Commitment(shared::commitment::CommitmentError::WrongSource));
    }
    if commitment.finalized_height <= anchor.last_finalized_height {
        return Err(TalantonError::Commitment(
            shared::commitment::CommitmentError::NonMonotonicHeight {
                height: commitment.finalized_height,
                last: anchor.last_finalized_height,
            },
        ));
    }
    validate_payload_encoding(commitment)?;

    let signed = signed_stake_weight(commitment);
    validate_finality_quorum(signed, active_stake, DEFAULT_QUORUM_NUMERATOR, DEFAULT_QUORUM_DENOMINATOR)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::commitment::FinalitySignature;

    fn sample_commitment(height: u64) -> Commitment {
        Commitment {
            source: SourceChain::Drachma,
            epoch: 1,
            finalized_height: height,
            finalized_block_hash: "a".repeat(64),
            state_root: "b".repeat(64),
            validator_set_hash: "c".repeat(64),
            upstream_commitment_hash: "d".repeat(64),
            signatures: vec![FinalitySignature {
                validator_id: "v1".to_string(),
                stake_weight: 70,
                signature: "sig".to_string(),
            }],
        }
    }

    #[test]
    fn accepts_a_well_formed_commitment_above_quorum() {
        let anchor = AnchorState::new();
        assert!(validate_l2_commit(&sample_commitment(10), &anchor, 100).is_ok());
    }

    #[test]
    fn rejects_wrong_source_chain() {
        let mut c = sample_commitment(10);
        c.source = SourceChain::Obolos;
        c.upstream_commitment_hash.clear();
        let anchor = AnchorState::new();
        assert!(matches!(
            validate_l2_commit(&c, &anchor, 100),
            Err(TalantonError::Commitment(shared::commitment::CommitmentError::WrongSource))
        ));
    }

    #[test]
    fn rejects_non_monotonic_height() {
        let anchor = AnchorState { last_finalized_height: 42 };
        assert!(matches!(
            validate_l2_commit(&sample_commitment(42), &anchor, 100),
            Err(TalantonError::Commitment(shared::commitment::CommitmentError::NonMonotonicHeight { .. }))
        ));
    }

    #[test]
    fn rejects_when_quorum_not_met() {
        let anchor = AnchorState::new();
        assert!(matches!(
            validate_l2_commit(&sample_commitment(10), &anchor, 1000),
            Err(TalantonError::Commitment(shared::commitment::CommitmentError::QuorumNotReached { .. }))
        ));
    }
}
