//! UTXO set and undo data (§3, §4.4). The chain is the sole mutator of
//! the `UtxoSet`; `BlockUndo` is what makes a connected block
//! reversible.

use serde::{Deserialize, Serialize};
use shared::Hash256;
use std::collections::HashMap;

use crate::error::{Result, TalantonError};
use crate::transaction::TxOutput;

/// Reference to a previous transaction's output (§3). Ordered by
/// `(txid, vout)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub const COINBASE_VOUT: u32 = 0xFFFF_FFFF;

    #[must_use]
    pub const fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// The sentinel outpoint carried by a coinbase input: an all-zero
    /// txid paired with `vout = 0xFFFFFFFF`.
    #[must_use]
    pub fn coinbase_sentinel() -> Self {
        Self {
            txid: Hash256::zero(),
            vout: Self::COINBASE_VOUT,
        }
    }

    #[must_use]
    pub fn is_coinbase_sentinel(&self) -> bool {
        self.txid == Hash256::zero() && self.vout == Self::COINBASE_VOUT
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.txid.as_bytes());
        out.extend_from_slice(&self.vout.to_le_bytes());
    }

    pub fn deserialize(buf: &[u8], offset: &mut usize) -> Result<Self> {
        if buf.len() < *offset + 36 {
            return Err(TalantonError::Truncated);
        }
        let mut txid_bytes = [0u8; 32];
        txid_bytes.copy_from_slice(&buf[*offset..*offset + 32]);
        let txid = Hash256::from_bytes(txid_bytes);
        *offset += 32;
        let mut vout_bytes = [0u8; 4];
        vout_bytes.copy_from_slice(&buf[*offset..*offset + 4]);
        let vout = u32::from_le_bytes(vout_bytes);
        *offset += 4;
        Ok(Self { txid, vout })
    }
}

/// A single unspent output plus the chain-state metadata needed to
/// decide spendability (§3): the height it was created at and whether
/// it came from a coinbase (subject to the 100-block maturity rule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub output: TxOutput,
    pub height: u64,
    pub is_coinbase: bool,
}

impl Coin {
    #[must_use]
    pub const fn new(output: TxOutput, height: u64, is_coinbase: bool) -> Self {
        Self {
            output,
            height,
            is_coinbase,
        }
    }

    /// Non-coinbase coins are always spendable; coinbase coins require
    /// `current_height >= self.height + maturity` (§4.4).
    #[must_use]
    pub fn is_spendable_at(&self, current_height: u64, maturity: u64) -> bool {
        if self.is_coinbase {
            current_height >= self.height.saturating_add(maturity)
        } else {
            true
        }
    }
}

/// The active set of unspent transaction outputs, keyed by `OutPoint`
/// (§3, §4.4). The chain is the sole mutator: `AddCoin`/`SpendCoin` are
/// only ever called from block connect/disconnect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtxoSet {
    coins: HashMap<OutPoint, Coin>,
}

impl UtxoSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }

    /// Removes and returns the coin at `outpoint`, the "spend" in
    /// `SpendCoin` (§4.4).
    pub fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.remove(outpoint)
    }

    #[must_use]
    pub fn get_coin(&self, outpoint: &OutPoint) -> Option<&Coin> {
        self.coins.get(outpoint)
    }

    #[must_use]
    pub fn have_coin(&self, outpoint: &OutPoint) -> bool {
        self.coins.contains_key(outpoint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// The coins consumed by one transaction's inputs, in input order, so
/// disconnect can restore them exactly (§3, §4.4).
pub type TxUndo = Vec<Coin>;

/// Per-block undo data: one `TxUndo` per transaction, in the block's
/// transaction order. The coinbase transaction's entry is always empty
/// (it has no prevouts to restore).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockUndo {
    pub tx_undos: Vec<TxUndo>,
}

impl BlockUndo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AssetAmount, AssetId};

    fn sample_coin(height: u64, is_coinbase: bool) -> Coin {
        Coin::new(
            TxOutput::new(AssetAmount::new(AssetId::Talanton, 1000), vec![1]),
            height,
            is_coinbase,
        )
    }

    #[test]
    fn round_trips_through_serialize_deserialize() {
        let op = OutPoint::new(Hash256::sha256(b"x"), 7);
        let mut buf = Vec::new();
        op.serialize(&mut buf);
        assert_eq!(buf.len(), 36);
        let mut offset = 0;
        let decoded = OutPoint::deserialize(&buf, &mut offset).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(offset, 36);
    }

    #[test]
    fn coinbase_sentinel_is_recognized() {
        let sentinel = OutPoint::coinbase_sentinel();
        assert!(sentinel.is_coinbase_sentinel());
        let real = OutPoint::new(Hash256::sha256(b"y"), 0);
        assert!(!real.is_coinbase_sentinel());
    }

    #[test]
    fn deserialize_rejects_truncated_input() {
        let buf = vec![0u8; 10];
        let mut offset = 0;
        assert!(OutPoint::deserialize(&buf, &mut offset).is_err());
    }

    #[test]
    fn non_coinbase_coin_is_always_spendable() {
        let coin = sample_coin(100, false);
        assert!(coin.is_spendable_at(100, 100));
        assert!(coin.is_spendable_at(0, 100));
    }

    #[test]
    fn coinbase_coin_matures_after_maturity_blocks() {
        let coin = sample_coin(100, true);
        assert!(!coin.is_spendable_at(150, 100));
        assert!(coin.is_spendable_at(200, 100));
    }

    #[test]
    fn utxo_set_add_spend_round_trip() {
        let mut set = UtxoSet::new();
        let outpoint = OutPoint::new(Hash256::sha256(b"x"), 0);
        set.add_coin(outpoint, sample_coin(10, false));
        assert!(set.have_coin(&outpoint));
        assert_eq!(set.len(), 1);

        let spent = set.spend_coin(&outpoint).unwrap();
        assert_eq!(spent.height, 10);
        assert!(!set.have_coin(&outpoint));
        assert!(set.is_empty());
    }
}
