use serde::{Deserialize, Serialize};
use shared::varint::{read_compact_size, write_compact_size};
use shared::Hash256;

use crate::consensus::difficulty::Target256;
use crate::error::{Result, TalantonError};
use crate::transaction::Transaction;

/// A fixed 104-byte block header (§3, §4.1): the EIP-1559-style gas
/// fields are carried even at L1 because L1 fee market accounting
/// anchors the coinbase reward check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    pub base_fee_per_gas: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
}

pub const HEADER_SIZE: usize = 104;

impl BlockHeader {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        version: u32,
        prev_hash: Hash256,
        merkle_root: Hash256,
        timestamp: u32,
        bits: u32,
        nonce: u32,
        base_fee_per_gas: u64,
        gas_used: u64,
        gas_limit: u64,
    ) -> Self {
        Self {
            version,
            prev_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
            base_fee_per_gas,
            gas_used,
            gas_limit,
        }
    }

    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_hash.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out[80..88].copy_from_slice(&self.base_fee_per_gas.to_le_bytes());
        out[88..96].copy_from_slice(&self.gas_used.to_le_bytes());
        out[96..104].copy_from_slice(&self.gas_limit.to_le_bytes());
        out
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(TalantonError::Truncated);
        }
        let version = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let mut prev_hash_bytes = [0u8; 32];
        prev_hash_bytes.copy_from_slice(&buf[4..36]);
        let mut merkle_bytes = [0u8; 32];
        merkle_bytes.copy_from_slice(&buf[36..68]);
        let timestamp = u32::from_le_bytes(buf[68..72].try_into().unwrap());
        let bits = u32::from_le_bytes(buf[72..76].try_into().unwrap());
        let nonce = u32::from_le_bytes(buf[76..80].try_into().unwrap());
        let base_fee_per_gas = u64::from_le_bytes(buf[80..88].try_into().unwrap());
        let gas_used = u64::from_le_bytes(buf[88..96].try_into().unwrap());
        let gas_limit = u64::from_le_bytes(buf[96..104].try_into().unwrap());
        Ok(Self {
            version,
            prev_hash: Hash256::from_bytes(prev_hash_bytes),
            merkle_root: Hash256::from_bytes(merkle_bytes),
            timestamp,
            bits,
            nonce,
            base_fee_per_gas,
            gas_used,
            gas_limit,
        })
    }

    /// The block hash: double-SHA-256 of the fixed-size header.
    #[must_use]
    pub fn hash(&self) -> Hash256 {
        Hash256::sha256d(&self.serialize())
    }

    /// Whether `hash()` meets the compact-bits difficulty target
    /// carried in `self.bits`.
    pub fn meets_proof_of_work(&self) -> Result<bool> {
        let target = Target256::from_compact(self.bits)?;
        Ok(target.meets(&self.hash()))
    }
}

/// A full block: header plus the transactions it commits to (§3, §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    #[must_use]
    pub const fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    #[must_use]
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.header.serialize());
        write_compact_size(&mut out, self.transactions.len() as u64);
        for tx in &self.transactions {
            let tx_bytes = tx.serialize();
            write_compact_size(&mut out, tx_bytes.len() as u64);
            out.extend_from_slice(&tx_bytes);
        }
        out
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(TalantonError::Truncated);
        }
        let header = BlockHeader::deserialize(&buf[0..HEADER_SIZE])?;
        let mut offset = HEADER_SIZE;
        let tx_count = read_compact_size(buf, &mut offset).map_err(|_| TalantonError::Truncated)?;
        let mut transactions = Vec::with_capacity(tx_count as usize);
        for _ in 0..tx_count {
            let tx_len = read_compact_size(buf, &mut offset).map_err(|_| TalantonError::Truncated)?;
            let tx_len = usize::try_from(tx_len).map_err(|_| TalantonError::Truncated)?;
            if buf.len() < offset + tx_len {
                return Err(TalantonError::Truncated);
            }
            let tx = Transaction::deserialize(&buf[offset..offset + tx_len])?;
            offset += tx_len;
            transactions.push(tx);
        }
        Ok(Self {
            header,
            transactions,
        })
    }

    /// Total serialized size in bytes, checked against
    /// `NetworkParams::max_block_size` during connect (§4.4, §7).
    #[must_use]
    pub fn size(&self) -> usize {
        self.serialize().len()
    }

    /// Extracts the block height the coinbase's signature script commits
    /// to (first 8 bytes, little-endian), mirroring §4.1's height-binding
    /// rule for coinbase transactions.
    pub fn height_from_coinbase(&self) -> Result<u64> {
        let coinbase = self
            .transactions
            .first()
            .filter(|tx| tx.is_coinbase())
            .ok_or_else(|| TalantonError::InvalidBlockStructure("missing coinbase".to_string()))?;
        let script = &coinbase.inputs[0].signature_script;
        if script.len() < 8 {
            return Err(TalantonError::InvalidBlockStructure(
                "coinbase height encoding too short".to_string(),
            ));
        }
        let mut height_bytes = [0u8; 8];
        height_bytes.copy_from_slice(&script[0..8]);
        Ok(u64::from_le_bytes(height_bytes))
    }

    /// Structural validation independent of chain context: coinbase-first,
    /// no other coinbases, per-transaction basic validity, merkle root
    /// and proof-of-work match, size cap (§4.1, §7).
    pub fn validate_structure(&self, max_block_size: usize) -> Result<()> {
        if self.transactions.is_empty() {
            return Err(TalantonError::InvalidBlockStructure(
                "block has no transactions".to_string(),
            ));
        }
        if !self.transactions[0].is_coinbase() {
            return Err(TalantonError::InvalidBlockStructure(
                "first transaction is not coinbase".to_string(),
            ));
        }
        for tx in &self.transactions[1..] {
            if tx.is_coinbase() {
                return Err(TalantonError::InvalidBlockStructure(
                    "multiple coinbase transactions".to_string(),
                ));
            }
        }
        for tx in &self.transactions {
            tx.validate_basic()?;
        }

        let computed_root = calculate_merkle_root(&self.transactions);
        if computed_root != self.header.merkle_root {
            return Err(TalantonError::BadMerkleRoot);
        }

        if !self.header.meets_proof_of_work()? {
            return Err(TalantonError::BadProofOfWork);
        }

        if self.size() > max_block_size {
            return Err(TalantonError::BlockTooLarge);
        }

        Ok(())
    }
}

/// Bitcoin-style merkle root: leaves are transaction ids, an odd level
/// duplicates its last element before pairing, parents are
/// `SHA256d(left || right)`.
#[must_use]
pub fn calculate_merkle_root(transactions: &[Transaction]) -> Hash256 {
    if transactions.is_empty() {
        return Hash256::zero();
    }

    let mut level: Vec<Hash256> = transactions.iter().map(Transaction::txid).collect();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let mut data = Vec::with_capacity(64);
            data.extend_from_slice(pair[0].as_bytes());
            data.extend_from_slice(pair[1].as_bytes());
            next.push(Hash256::sha256d(&data));
        }
        level = next;
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::OutPoint;
    use shared::{AssetAmount, AssetId};

    fn header(bits: u32, nonce: u32) -> BlockHeader {
        BlockHeader::new(1, Hash256::zero(), Hash256::zero(), 0, bits, nonce, 0, 0, 21_000_000)
    }

    #[test]
    fn header_round_trips_through_wire_format() {
        let h = header(0x207f_ffff, 7);
        let bytes = h.serialize();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let decoded = BlockHeader::deserialize(&bytes).unwrap();
        assert_eq!(decoded, h);
    }

    #[test]
    fn merkle_root_of_single_transaction_is_its_txid() {
        let tx = Transaction::coinbase(0, vec![AssetAmount::new(AssetId::Talanton, 5_000_000_000)], vec![1]);
        let root = calculate_merkle_root(std::slice::from_ref(&tx));
        assert_eq!(root, tx.txid());
    }

    #[test]
    fn merkle_root_duplicates_last_leaf_when_odd() {
        let tx1 = Transaction::coinbase(0, vec![AssetAmount::new(AssetId::Talanton, 1)], vec![1]);
        let tx2 = Transaction::new(
            1,
            vec![crate::transaction::TxInput::new(
                OutPoint::new(Hash256::sha256(b"a"), 0),
                vec![],
                0,
            )],
            vec![crate::transaction::TxOutput::new(
                AssetAmount::new(AssetId::Talanton, 2),
                vec![1],
            )],
            0,
        );
        let tx3 = Transaction::new(
            1,
            vec![crate::transaction::TxInput::new(
                OutPoint::new(Hash256::sha256(b"b"), 0),
                vec![],
                0,
            )],
            vec![crate::transaction::TxOutput::new(
                AssetAmount::new(AssetId::Talanton, 3),
                vec![1],
            )],
            0,
        );

        let three = calculate_merkle_root(&[tx1.clone(), tx2.clone(), tx3.clone()]);
        let four = calculate_merkle_root(&[tx1, tx2, tx3.clone(), tx3]);
        assert_eq!(three, four);
    }

    #[test]
    fn height_from_coinbase_recovers_encoded_height() {
        let block = Block::new(
            header(0x207f_ffff, 0),
            vec![Transaction::coinbase(
                1234,
                vec![AssetAmount::new(AssetId::Talanton, 1)],
                vec![1],
            )],
        );
        assert_eq!(block.height_from_coinbase().unwrap(), 1234);
    }
}
