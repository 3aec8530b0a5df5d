//! The cross-layer finality-commitment protocol (§4.7), shared by both
//! layers that consume it: `talanton-core::ValidateL2Commit` validates
//! DRACHMA-sourced commitments, `drachma-core::ValidateL3Commit`
//! validates OBOLOS-sourced ones. Grounded in the stricter of the two
//! near-duplicate original sources (`common/serialization/commitments.cpp`
//! and `common/serialization/serialization.cpp`), not the older,
//! looser `src/common/` variants — see DESIGN.md.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("wrong source chain")]
    WrongSource,
    #[error("non-monotonic height: {height} is not greater than {last}")]
    NonMonotonicHeight { height: u64, last: u64 },
    #[error("bad encoding: {0}")]
    BadEncoding(String),
    #[error("quorum not reached: {signed}/{active} < {numerator}/{denominator}")]
    QuorumNotReached {
        signed: u64,
        active: u64,
        numerator: u64,
        denominator: u64,
    },
    #[error("invalid quorum ratio: {numerator}/{denominator}")]
    InvalidRatio { numerator: u64, denominator: u64 },
}

pub type Result<T> = std::result::Result<T, CommitmentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceChain {
    Drachma,
    Obolos,
}

impl SourceChain {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SourceChain::Drachma => "DRACHMA",
            SourceChain::Obolos => "OBOLOS",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRACHMA" => Some(SourceChain::Drachma),
            "OBOLOS" => Some(SourceChain::Obolos),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalitySignature {
    pub validator_id: String,
    pub stake_weight: u64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub source: SourceChain,
    pub epoch: u64,
    pub finalized_height: u64,
    pub finalized_block_hash: String,
    pub state_root: String,
    pub validator_set_hash: String,
    /// The latest finalized OBOLOS commitment hash, preserving the
    /// canonical anchoring chain OBOLOS -> DRACHMA -> TALANTON. Required
    /// non-empty for DRACHMA-sourced commitments; may be empty for OBOLOS.
    pub upstream_commitment_hash: String,
    pub signatures: Vec<FinalitySignature>,
}

fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Checks structural validity per §4.7: non-zero height, three well-formed
/// 64-hex-char hashes, a non-empty signature list with non-empty id/sig
/// fields each, and (for DRACHMA) a non-empty, well-formed upstream hash.
pub fn validate_payload_encoding(c: &Commitment) -> Result<()> {
    if c.finalized_height == 0 {
        return Err(CommitmentError::BadEncoding("finalized_height is zero".into()));
    }
    if !is_hex64(&c.finalized_block_hash) {
        return Err(CommitmentError::BadEncoding("finalized_block_hash malformed".into()));
    }
    if !is_hex64(&c.state_root) {
        return Err(CommitmentError::BadEncoding("state_root malformed".into()));
    }
    if !is_hex64(&c.validator_set_hash) {
        return Err(CommitmentError::BadEncoding("validator_set_hash malformed".into()));
    }
    if c.signatures.is_empty() {
        return Err(CommitmentError::BadEncoding("signatures empty".into()));
    }
    for sig in &c.signatures {
        if sig.validator_id.is_empty() || sig.signature.is_empty() {
            return Err(CommitmentError::BadEncoding(
                "signature entry missing validator_id or signature".into(),
            ));
        }
    }
    if c.source == SourceChain::Drachma && c.upstream_commitment_hash.is_empty() {
        return Err(CommitmentError::BadEncoding(
            "DRACHMA commitment missing upstream_commitment_hash".into(),
        ));
    }
    if !c.upstream_commitment_hash.is_empty() && !is_hex64(&c.upstream_commitment_hash) {
        return Err(CommitmentError::BadEncoding("upstream_commitment_hash malformed".into()));
    }
    Ok(())
}

/// Sums `stake_weight` over distinct validator ids (duplicates counted once).
#[must_use]
pub fn signed_stake_weight(c: &Commitment) -> u64 {
    let mut seen = HashSet::new();
    let mut total: u64 = 0;
    for sig in &c.signatures {
        if seen.insert(sig.validator_id.clone()) {
            total = total.saturating_add(sig.stake_weight);
        }
    }
    total
}

/// Quorum check via overflow-safe cross-multiplication: accepts iff
/// `signed / active >= numerator / denominator`, i.e.
/// `signed * denominator >= active * numerator`, each product saturating
/// at `u64::MAX` rather than wrapping.
pub fn validate_finality_quorum(
    signed_stake: u64,
    active_stake: u64,
    numerator: u64,
    denominator: u64,
) -> Result<()> {
    if denominator == 0 || numerator > denominator {
        return Err(CommitmentError::InvalidRatio {
            numerator,
            denominator,
        });
    }
    if active_stake == 0 {
        return Err(CommitmentError::QuorumNotReached {
            signed: signed_stake,
            active: active_stake,
            numerator,
            denominator,
        });
    }

    let lhs = signed_stake
        .checked_mul(denominator)
        .unwrap_or(u64::MAX);
    let rhs = active_stake.checked_mul(numerator).unwrap_or(u64::MAX);

    if lhs < rhs {
        return Err(CommitmentError::QuorumNotReached {
            signed: signed_stake,
            active: active_stake,
            numerator,
            denominator,
        });
    }
    Ok(())
}

pub const DEFAULT_QUORUM_NUMERATOR: u64 = 2;
pub const DEFAULT_QUORUM_DENOMINATOR: u64 = 3;

/// Encodes a commitment in the colon-delimited bus format (§6):
/// `source:epoch:height:block_hash:state_root:validator_set_hash:
/// upstream_hash:signatures`, signatures comma-separated `id|stake|sig`.
#[must_use]
pub fn encode_commitment(c: &Commitment) -> String {
    let sigs = c
        .signatures
        .iter()
        .map(|s| format!("{}|{}|{}", s.validator_id, s.stake_weight, s.signature))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}:{}:{}:{}:{}:{}:{}:{}",
        c.source.name(),
        c.epoch,
        c.finalized_height,
        c.finalized_block_hash,
        c.state_root,
        c.validator_set_hash,
        c.upstream_commitment_hash,
        sigs
    )
}

/// Decodes the bus format, requiring exactly 8 colon-delimited fields
/// (the 8th runs to end-of-string and may itself contain commas/pipes).
/// Returns `validate_payload_encoding` applied to the decoded commitment,
/// matching the canonical `DecodeCommitment` behaviour.
pub fn decode_commitment(encoded: &str) -> Result<Commitment> {
    let mut fields = Vec::with_capacity(8);
    let mut rest = encoded;
    for _ in 0..7 {
        match rest.find(':') {
            Some(idx) => {
                fields.push(&rest[..idx]);
                rest = &rest[idx + 1..];
            }
            None => return Err(CommitmentError::BadEncoding("fewer than 8 fields".into())),
        }
    }
    fields.push(rest); // 8th field: remainder of the string, unsplit

    let source = SourceChain::parse(fields[0])
        .ok_or_else(|| CommitmentError::BadEncoding(format!("unknown source {}", fields[0])))?;
    let epoch: u64 = fields[1]
        .parse()
        .map_err(|_| CommitmentError::BadEncoding("epoch not a u64".into()))?;
    let finalized_height: u64 = fields[2]
        .parse()
        .map_err(|_| CommitmentError::BadEncoding("height not a u64".into()))?;

    let signatures = if fields[7].is_empty() {
        Vec::new()
    } else {
        fields[7]
            .split(',')
            .filter(|tuple| !tuple.is_empty())
            .map(|tuple| {
                let mut parts = tuple.splitn(3, '|');
                let validator_id = parts.next().unwrap_or("").to_string();
                let stake_weight: u64 = parts
                    .next()
                    .ok_or_else(|| CommitmentError::BadEncoding("malformed signature tuple".into()))?
                    .parse()
                    .map_err(|_| CommitmentError::BadEncoding("stake_weight not a u64".into()))?;
                let signature = parts
                    .next()
                    .ok_or_else(|| CommitmentError::BadEncoding("malformed signature tuple".into()))?
                    .to_string();
                Ok(FinalitySignature {
                    validator_id,
                    stake_weight,
                    signature,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let commitment = Commitment {
        source,
        epoch,
        finalized_height,
        finalized_block_hash: fields[3].to_string(),
        state_root: fields[4].to_string(),
        validator_set_hash: fields[5].to_string(),
        upstream_commitment_hash: fields[6].to_string(),
        signatures,
    };

    validate_payload_encoding(&commitment)?;
    Ok(commitment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commitment() -> Commitment {
        Commitment {
            source: SourceChain::Drachma,
            epoch: 2,
            finalized_height: 42,
            finalized_block_hash: "a".repeat(64),
            state_root: "b".repeat(64),
            validator_set_hash: "c".repeat(64),
            upstream_commitment_hash: "d".repeat(64),
            signatures: vec![
                FinalitySignature {
                    validator_id: "val1".into(),
                    stake_weight: 70,
                    signature: "sig-a".into(),
                },
                FinalitySignature {
                    validator_id: "val2".into(),
                    stake_weight: 40,
                    signature: "sig-b".into(),
                },
            ],
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let c = sample_commitment();
        let encoded = encode_commitment(&c);
        let decoded = decode_commitment(&encoded).unwrap();
        assert_eq!(c, decoded);
    }

    #[test]
    fn drachma_without_upstream_hash_fails_encoding() {
        let mut c = sample_commitment();
        c.upstream_commitment_hash.clear();
        assert!(validate_payload_encoding(&c).is_err());
    }

    #[test]
    fn obolos_without_upstream_hash_is_allowed() {
        let mut c = sample_commitment();
        c.source = SourceChain::Obolos;
        c.upstream_commitment_hash.clear();
        assert!(validate_payload_encoding(&c).is_ok());
    }

    #[test]
    fn signed_stake_weight_dedups_by_validator_id() {
        let mut c = sample_commitment();
        c.signatures.push(FinalitySignature {
            validator_id: "val1".into(),
            stake_weight: 999,
            signature: "sig-dup".into(),
        });
        assert_eq!(signed_stake_weight(&c), 110);
    }

    #[test]
    fn quorum_boundary_equal_passes_strictly_below_fails() {
        // 100/150 == 2/3 exactly.
        assert!(validate_finality_quorum(100, 150, 2, 3).is_ok());
        assert!(validate_finality_quorum(99, 150, 2, 3).is_err());
    }

    #[test]
    fn quorum_rejects_invalid_ratio_and_zero_active_stake() {
        assert!(validate_finality_quorum(10, 10, 3, 2).is_err());
        assert!(validate_finality_quorum(10, 10, 1, 0).is_err());
        assert!(validate_finality_quorum(0, 0, 2, 3).is_err());
    }

    #[test]
    fn quorum_does_not_overflow_on_large_stakes() {
        assert!(validate_finality_quorum(u64::MAX, u64::MAX, 2, 3).is_ok());
    }

    #[test]
    fn decode_rejects_malformed_signature_tuple() {
        let encoded = format!(
            "DRACHMA:2:42:{}:{}:{}:{}:val1-missing-pipes",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64),
            "d".repeat(64)
        );
        assert!(decode_commitment(&encoded).is_err());
    }

    #[test]
    fn decode_rejects_too_few_fields() {
        assert!(decode_commitment("DRACHMA:1:1:a:b:c").is_err());
    }

    #[test]
    fn decode_rejects_unknown_source() {
        assert!(decode_commitment("ATHENS:1:1:a:b:c:d:").is_err());
    }
}
