//! Per-asset issuance schedules (§4.3). `reward` is a pure function of
//! height and asset; no `issuance.h/.cpp` ships in the retrieved
//! `original_source` (referenced by `chain.cpp` but never defined), so
//! the halving curve and per-asset initial rewards are a supplement —
//! see DESIGN.md for the exact constants and the headroom-under-cap
//! check.

use shared::AssetId;

/// Blocks between each halving of the per-asset issuance schedule.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Initial block reward in base units, before any halving.
#[must_use]
pub const fn initial_reward(asset: AssetId) -> u64 {
    match asset {
        AssetId::Talanton => 50_0000_0000,  // 50 TALN
        AssetId::Drachma => 97_6000_0000,   // 97.6 DRM
        AssetId::Obolos => 145_2000_0000,   // 145.2 OBL
    }
}

/// `reward(height, asset) = initial_reward(asset) >> min(height /
/// HALVING_INTERVAL, 63)`, zero once the shift count would exceed 63
/// (§4.3).
#[must_use]
pub fn reward(height: u64, asset: AssetId) -> u64 {
    let halvings = (height / HALVING_INTERVAL).min(63);
    initial_reward(asset) >> halvings
}

/// `IsValidBlockReward`: `v <= reward(height, asset)` (§4.3).
#[must_use]
pub fn is_valid_block_reward(height: u64, asset: AssetId, value: u64) -> bool {
    value <= reward(height, asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_halves_at_the_interval_boundary() {
        let initial = reward(0, AssetId::Talanton);
        let after_one_halving = reward(HALVING_INTERVAL, AssetId::Talanton);
        assert_eq!(after_one_halving, initial / 2);
        let just_before = reward(HALVING_INTERVAL - 1, AssetId::Talanton);
        assert_eq!(just_before, initial);
    }

    #[test]
    fn reward_eventually_reaches_zero() {
        let height = HALVING_INTERVAL * 65;
        assert_eq!(reward(height, AssetId::Talanton), 0);
    }

    #[test]
    fn sum_of_rewards_stays_within_cap_for_every_asset() {
        for asset in AssetId::ALL {
            // The geometric sum of an unbounded halving schedule is
            // bounded by initial_reward * HALVING_INTERVAL * 2.
            let bound = initial_reward(asset) as u128 * HALVING_INTERVAL as u128 * 2;
            assert!(bound <= asset.max_supply() as u128);
        }
    }

    #[test]
    fn is_valid_block_reward_rejects_values_above_schedule() {
        let max = reward(0, AssetId::Obolos);
        assert!(is_valid_block_reward(0, AssetId::Obolos, max));
        assert!(!is_valid_block_reward(0, AssetId::Obolos, max + 1));
    }
}
