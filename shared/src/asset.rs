//! Native asset identifiers and supply caps (§3), grounded in
//! `original_source/layer1/core/primitives/asset.h`.

use serde::{Deserialize, Serialize};

use crate::error::{PantheonError, Result};

pub const BASE_UNIT: u64 = 100_000_000; // 1e8 base units per whole coin

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AssetId {
    Talanton = 0,
    Drachma = 1,
    Obolos = 2,
}

impl AssetId {
    pub const ALL: [AssetId; 3] = [AssetId::Talanton, AssetId::Drachma, AssetId::Obolos];

    #[must_use]
    pub const fn max_supply(self) -> u64 {
        match self {
            AssetId::Talanton => 21_000_000 * BASE_UNIT,
            AssetId::Drachma => 41_000_000 * BASE_UNIT,
            AssetId::Obolos => 61_000_000 * BASE_UNIT,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            AssetId::Talanton => "TALANTON",
            AssetId::Drachma => "DRACHMA",
            AssetId::Obolos => "OBOLOS",
        }
    }

    #[must_use]
    pub const fn ticker(self) -> &'static str {
        match self {
            AssetId::Talanton => "TALN",
            AssetId::Drachma => "DRM",
            AssetId::Obolos => "OBL",
        }
    }

    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(AssetId::Talanton),
            1 => Some(AssetId::Drachma),
            2 => Some(AssetId::Obolos),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_valid_amount(self, amount: u64) -> bool {
        amount <= self.max_supply()
    }
}

/// An (asset, amount) pair as carried by a `TxOutput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset: AssetId,
    pub amount: u64,
}

impl AssetAmount {
    #[must_use]
    pub const fn new(asset: AssetId, amount: u64) -> Self {
        Self { asset, amount }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.asset.is_valid_amount(self.amount)
    }

    /// Serializes to the 9-byte wire form: 1-byte asset id + 8-byte LE amount.
    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.push(self.asset as u8);
        output.extend_from_slice(&self.amount.to_le_bytes());
    }

    pub fn deserialize(input: &[u8]) -> Result<Self> {
        if input.len() < 9 {
            return Err(PantheonError::Truncated);
        }
        let asset = AssetId::from_byte(input[0])
            .ok_or_else(|| PantheonError::Serialization("unknown asset id".into()))?;
        let mut amount_bytes = [0u8; 8];
        amount_bytes.copy_from_slice(&input[1..9]);
        let amount = u64::from_le_bytes(amount_bytes);
        Ok(Self { asset, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_supply_matches_whitepaper_caps() {
        assert_eq!(AssetId::Talanton.max_supply(), 21_000_000 * BASE_UNIT);
        assert_eq!(AssetId::Drachma.max_supply(), 41_000_000 * BASE_UNIT);
        assert_eq!(AssetId::Obolos.max_supply(), 61_000_000 * BASE_UNIT);
    }

    #[test]
    fn serialize_round_trips() {
        let aa = AssetAmount::new(AssetId::Drachma, 1234);
        let mut buf = Vec::new();
        aa.serialize(&mut buf);
        assert_eq!(buf.len(), 9);
        let decoded = AssetAmount::deserialize(&buf).unwrap();
        assert_eq!(aa, decoded);
    }

    #[test]
    fn is_valid_rejects_amount_above_cap() {
        let aa = AssetAmount::new(AssetId::Talanton, AssetId::Talanton.max_supply() + 1);
        assert!(!aa.is_valid());
    }

    #[test]
    fn from_byte_rejects_unknown_id() {
        assert!(AssetId::from_byte(9).is_none());
    }
}
