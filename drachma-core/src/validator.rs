//! DRACHMA's proof-of-stake validator set (§4.7, §9): total active
//! stake, deterministic proposer selection, and double-sign slashing.
//! Grounded in `original_source/src/drachma/pos_consensus.h/.cpp`.

use serde::{Deserialize, Serialize};

use crate::error::{DrachmaError, Result};

/// A DRACHMA validator as carried in the active set for a given epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: String,
    pub stake: u64,
}

impl Validator {
    #[must_use]
    pub const fn new(id: String, stake: u64) -> Self {
        Self { id, stake }
    }
}

/// Sums `stake` over the given validator set (§4.7's `active_stake`
/// input to quorum checks).
#[must_use]
pub fn total_active_stake(validators: &[Validator]) -> u64 {
    validators.iter().map(|v| v.stake).sum()
}

/// Deterministic proposer selection (§4.7): `slot = (epoch << 32) XOR
/// height`; `cursor = slot mod total_stake`; walk `validators` in
/// order, subtracting each validator's stake from `cursor` until it
/// falls inside a validator's stake window. Pure function of its
/// inputs — two calls with equal arguments return the same id.
pub fn select_deterministic_proposer(validators: &[Validator], epoch: u64, height: u64) -> Result<&Validator> {
    if validators.is_empty() {
        return Err(DrachmaError::EmptyValidatorSet);
    }
    let total_stake = total_active_stake(validators);
    if total_stake == 0 {
        return Err(DrachmaError::ZeroActiveStake);
    }

    let slot = (epoch << 32) ^ height;
    let mut cursor = slot % total_stake;
    for validator in validators {
        if cursor < validator.stake {
            return Ok(validator);
        }
        cursor -= validator.stake;
    }

    // Rounding cannot actually reach here since cursor < total_stake by
    // construction, but the original falls back to the last validator.
    Ok(validators.last().expect("validators is non-empty"))
}

/// A recorded slashing event, produced by `slash_double_sign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingEvent {
    pub validator_id: String,
    pub reason: String,
    pub slashed_amount: u64,
}

/// Slashes a validator caught double-signing (§8): `slashed = stake *
/// numerator / denominator` (integer division), rejecting ratios
/// outside `(0, 1]`.
pub fn slash_double_sign(validator: &Validator, numerator: u64, denominator: u64) -> Result<SlashingEvent> {
    if denominator == 0 || numerator == 0 || numerator > denominator {
        return Err(DrachmaError::InvalidSlashRatio { numerator, denominator });
    }
    let slashed_amount = validator
        .stake
        .checked_mul(numerator)
        .ok_or(DrachmaError::Shared(shared::PantheonError::ArithmeticOverflow))?
        / denominator;

    tracing::warn!(validator_id = %validator.id, slashed_amount, "validator slashed for double-sign");
    Ok(SlashingEvent {
        validator_id: validator.id.clone(),
        reason: "double-sign".to_string(),
        slashed_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators() -> Vec<Validator> {
        vec![
            Validator::new("val1".into(), 70),
            Validator::new("val2".into(), 40),
            Validator::new("val3".into(), 20),
        ]
    }

    #[test]
    fn total_active_stake_sums_all_validators() {
        assert_eq!(total_active_stake(&validators()), 130);
    }

    #[test]
    fn proposer_selection_is_deterministic() {
        let vs = validators();
        let a = select_deterministic_proposer(&vs, 2, 42).unwrap();
        let b = select_deterministic_proposer(&vs, 2, 42).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn proposer_selection_picks_within_stake_window() {
        let vs = vec![Validator::new("only".into(), 100)];
        let chosen = select_deterministic_proposer(&vs, 0, 0).unwrap();
        assert_eq!(chosen.id, "only");
    }

    #[test]
    fn proposer_selection_rejects_empty_set() {
        assert!(matches!(
            select_deterministic_proposer(&[], 0, 0),
            Err(DrachmaError::EmptyValidatorSet)
        ));
    }

    #[test]
    fn proposer_selection_rejects_zero_total_stake() {
        let vs = vec![Validator::new("zero".into(), 0)];
        assert!(matches!(
            select_deterministic_proposer(&vs, 0, 0),
            Err(DrachmaError::ZeroActiveStake)
        ));
    }

    #[test]
    fn slash_double_sign_applies_ratio() {
        let v = Validator::new("val1".into(), 1000);
        let event = slash_double_sign(&v, 1, 10).unwrap();
        assert_eq!(event.slashed_amount, 100);
        assert_eq!(event.validator_id, "val1");
        assert_eq!(event.reason, "double-sign");
    }

    #[test]
    fn slash_double_sign_rejects_ratio_above_one_or_zero() {
        let v = Validator::new("val1".into(), 1000);
        assert!(slash_double_sign(&v, 11, 10).is_err());
        assert!(slash_double_sign(&v, 0, 10).is_err());
        assert!(slash_double_sign(&v, 1, 0).is_err());
    }
}
