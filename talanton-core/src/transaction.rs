use serde::{Deserialize, Serialize};
use shared::varint::{read_compact_size, write_compact_size};
use shared::{AssetAmount, AssetId, Hash256};

use crate::error::{Result, TalantonError};
use crate::utxo::OutPoint;

/// A transaction input (§3): a reference to the output it spends plus
/// the script proving the right to spend it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    #[must_use]
    pub const fn new(previous_output: OutPoint, signature_script: Vec<u8>, sequence: u32) -> Self {
        Self {
            previous_output,
            signature_script,
            sequence,
        }
    }

    /// The coinbase input carries the block height in its script and
    /// points at the coinbase sentinel outpoint.
    #[must_use]
    pub fn coinbase(block_height: u64) -> Self {
        Self {
            previous_output: OutPoint::coinbase_sentinel(),
            signature_script: block_height.to_le_bytes().to_vec(),
            sequence: 0xFFFF_FFFF,
        }
    }

    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        self.previous_output.is_coinbase_sentinel()
    }

    /// Sequence numbers below this signal BIP-125 replace-by-fee (§3).
    pub const RBF_SIGNAL_THRESHOLD: u32 = 0xFFFF_FFFE;

    #[must_use]
    pub fn signals_rbf(&self) -> bool {
        self.sequence < Self::RBF_SIGNAL_THRESHOLD
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        self.previous_output.serialize(out);
        write_compact_size(out, self.signature_script.len() as u64);
        out.extend_from_slice(&self.signature_script);
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }

    fn deserialize(buf: &[u8], offset: &mut usize) -> Result<Self> {
        let previous_output = OutPoint::deserialize(buf, offset)?;
        let script_len = read_compact_size(buf, offset).map_err(|_| TalantonError::Truncated)?;
        let script_len = usize::try_from(script_len).map_err(|_| TalantonError::Truncated)?;
        if buf.len() < *offset + script_len + 4 {
            return Err(TalantonError::Truncated);
        }
        let signature_script = buf[*offset..*offset + script_len].to_vec();
        *offset += script_len;
        let mut seq_bytes = [0u8; 4];
        seq_bytes.copy_from_slice(&buf[*offset..*offset + 4]);
        let sequence = u32::from_le_bytes(seq_bytes);
        *offset += 4;
        Ok(Self {
            previous_output,
            signature_script,
            sequence,
        })
    }
}

/// A transaction output (§3): an asset-tagged amount locked to a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub asset_amount: AssetAmount,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    #[must_use]
    pub const fn new(asset_amount: AssetAmount, script_pubkey: Vec<u8>) -> Self {
        Self {
            asset_amount,
            script_pubkey,
        }
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        self.asset_amount.serialize(out);
        write_compact_size(out, self.script_pubkey.len() as u64);
        out.extend_from_slice(&self.script_pubkey);
    }

    fn deserialize(buf: &[u8], offset: &mut usize) -> Result<Self> {
        if buf.len() < *offset + 9 {
            return Err(TalantonError::Truncated);
        }
        let asset_amount = AssetAmount::deserialize(&buf[*offset..*offset + 9])
            .map_err(|e| TalantonError::MalformedField(e.to_string()))?;
        *offset += 9;
        let script_len = read_compact_size(buf, offset).map_err(|_| TalantonError::Truncated)?;
        let script_len = usize::try_from(script_len).map_err(|_| TalantonError::Truncated)?;
        if buf.len() < *offset + script_len {
            return Err(TalantonError::Truncated);
        }
        let script_pubkey = buf[*offset..*offset + script_len].to_vec();
        *offset += script_len;
        Ok(Self {
            asset_amount,
            script_pubkey,
        })
    }
}

/// A multi-asset, UTXO-model transaction (§3, §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    #[must_use]
    pub const fn new(version: u32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_time: u32) -> Self {
        Self {
            version,
            inputs,
            outputs,
            lock_time,
        }
    }

    /// A coinbase transaction may mint any number of assets in one shot
    /// (§4.1: "all three assets may appear in one L1 coinbase").
    #[must_use]
    pub fn coinbase(block_height: u64, rewards: Vec<AssetAmount>, script_pubkey: Vec<u8>) -> Self {
        let inputs = vec![TxInput::coinbase(block_height)];
        let outputs = rewards
            .into_iter()
            .map(|reward| TxOutput::new(reward, script_pubkey.clone()))
            .collect();
        Self::new(1, inputs, outputs, 0)
    }

    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.serialize(&mut out);
        }
        write_compact_size(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.serialize(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        let mut offset = 0;
        if buf.len() < 4 {
            return Err(TalantonError::Truncated);
        }
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&buf[0..4]);
        let version = u32::from_le_bytes(version_bytes);
        offset += 4;

        let input_count = read_compact_size(buf, &mut offset).map_err(|_| TalantonError::Truncated)?;
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            inputs.push(TxInput::deserialize(buf, &mut offset)?);
        }

        let output_count = read_compact_size(buf, &mut offset).map_err(|_| TalantonError::Truncated)?;
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            outputs.push(TxOutput::deserialize(buf, &mut offset)?);
        }

        if buf.len() < offset + 4 {
            return Err(TalantonError::Truncated);
        }
        let mut lock_bytes = [0u8; 4];
        lock_bytes.copy_from_slice(&buf[offset..offset + 4]);
        let lock_time = u32::from_le_bytes(lock_bytes);

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// The transaction identifier: double-SHA-256 of the canonical
    /// serialization (§4.1).
    #[must_use]
    pub fn txid(&self) -> Hash256 {
        Hash256::sha256d(&self.serialize())
    }

    /// Serialized size in bytes, used for fee-rate and mempool
    /// size-cap accounting (§4.5).
    #[must_use]
    pub fn size(&self) -> usize {
        self.serialize().len()
    }

    /// Serializes the transaction for signing `input_index`: every
    /// other input's `signature_script` is blanked out so signatures
    /// don't need to commit to each other (Bitcoin-style `SIGHASH`).
    #[must_use]
    pub fn serialize_for_signing(&self, input_index: usize) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(&mut out, self.inputs.len() as u64);
        for (i, input) in self.inputs.iter().enumerate() {
            input.previous_output.serialize(&mut out);
            if i == input_index {
                write_compact_size(&mut out, input.signature_script.len() as u64);
                out.extend_from_slice(&input.signature_script);
            } else {
                write_compact_size(&mut out, 0);
            }
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_compact_size(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.serialize(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// The signature hash for `input_index`: a single SHA-256 (not the
    /// doubled transaction-id hash) of the signing serialization.
    #[must_use]
    pub fn signature_hash(&self, input_index: usize) -> Hash256 {
        Hash256::sha256(&self.serialize_for_signing(input_index))
    }

    /// Sums outputs per asset, rejecting per-asset overflow.
    pub fn output_totals(&self) -> Result<Vec<(AssetId, u64)>> {
        let mut totals: Vec<(AssetId, u64)> = Vec::new();
        for output in &self.outputs {
            let asset = output.asset_amount.asset;
            let amount = output.asset_amount.amount;
            match totals.iter_mut().find(|(a, _)| *a == asset) {
                Some((_, total)) => {
                    *total = total.checked_add(amount).ok_or(TalantonError::SupplyOverflow)?;
                }
                None => totals.push((asset, amount)),
            }
        }
        Ok(totals)
    }

    /// Structural validation that doesn't require chain context: no
    /// empty input/output lists, no duplicate inputs, no zero-value
    /// outputs, non-empty scripts, coinbase shape rules (§4.1, §7).
    pub fn validate_basic(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(TalantonError::InvalidBlockStructure(
                "transaction has no outputs".to_string(),
            ));
        }
        if self.inputs.is_empty() {
            return Err(TalantonError::InvalidBlockStructure(
                "transaction has no inputs".to_string(),
            ));
        }

        self.output_totals()?;

        for output in &self.outputs {
            if output.asset_amount.amount == 0 {
                return Err(TalantonError::InvalidBlockStructure(
                    "zero-value output".to_string(),
                ));
            }
            if output.script_pubkey.is_empty() {
                return Err(TalantonError::InvalidBlockStructure(
                    "empty pubkey_script".to_string(),
                ));
            }
        }

        if self.is_coinbase() {
            if self.inputs.len() != 1 {
                return Err(TalantonError::InvalidBlockStructure(
                    "coinbase transaction must have exactly one input".to_string(),
                ));
            }
        } else {
            for input in &self.inputs {
                if input.is_coinbase() {
                    return Err(TalantonError::InvalidBlockStructure(
                        "non-coinbase transaction with coinbase input".to_string(),
                    ));
                }
            }
            let mut seen = std::collections::HashSet::new();
            for input in &self.inputs {
                if !seen.insert(input.previous_output) {
                    return Err(TalantonError::DuplicateInput);
                }
            }
        }

        Ok(())
    }

    /// True if any input signals replace-by-fee (§3, §4.5).
    #[must_use]
    pub fn signals_rbf(&self) -> bool {
        self.inputs.iter().any(TxInput::signals_rbf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AssetId;

    fn sample_output(amount: u64) -> TxOutput {
        TxOutput::new(AssetAmount::new(AssetId::Talanton, amount), vec![1, 2, 3])
    }

    #[test]
    fn coinbase_round_trips_through_wire_format() {
        let tx = Transaction::coinbase(42, vec![AssetAmount::new(AssetId::Talanton, 50_0000_0000)], vec![9]);
        let bytes = tx.serialize();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.is_coinbase());
    }

    #[test]
    fn txid_is_deterministic_and_nonzero() {
        let tx = Transaction::coinbase(1, vec![AssetAmount::new(AssetId::Talanton, 100)], vec![1]);
        let id1 = tx.txid();
        let id2 = tx.txid();
        assert_eq!(id1, id2);
        assert_ne!(id1, Hash256::zero());
    }

    #[test]
    fn signature_hash_excludes_other_inputs_scripts() {
        let input_a = TxInput::new(OutPoint::new(Hash256::sha256(b"a"), 0), vec![1, 1, 1], 0);
        let input_b = TxInput::new(OutPoint::new(Hash256::sha256(b"b"), 1), vec![2, 2, 2], 0);
        let tx = Transaction::new(1, vec![input_a.clone(), input_b.clone()], vec![sample_output(10)], 0);

        let mut tx_changed = tx.clone();
        tx_changed.inputs[1].signature_script = vec![9, 9, 9];

        assert_eq!(tx.signature_hash(0), tx_changed.signature_hash(0));
    }

    #[test]
    fn validate_basic_rejects_zero_value_output() {
        let tx = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::new(Hash256::sha256(b"x"), 0), vec![], 0)],
            vec![sample_output(0)],
            0,
        );
        assert!(tx.validate_basic().is_err());
    }

    #[test]
    fn validate_basic_rejects_duplicate_inputs() {
        let outpoint = OutPoint::new(Hash256::sha256(b"dup"), 0);
        let tx = Transaction::new(
            1,
            vec![
                TxInput::new(outpoint, vec![], 0),
                TxInput::new(outpoint, vec![], 1),
            ],
            vec![sample_output(10)],
            0,
        );
        assert!(matches!(tx.validate_basic(), Err(TalantonError::DuplicateInput)));
    }

    #[test]
    fn output_totals_rejects_overflow() {
        let tx = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::new(Hash256::sha256(b"x"), 0), vec![], 0)],
            vec![sample_output(u64::MAX), sample_output(1)],
            0,
        );
        assert!(tx.output_totals().is_err());
    }

    #[test]
    fn rbf_signalling_is_detected_by_sequence_threshold() {
        let rbf_input = TxInput::new(OutPoint::new(Hash256::sha256(b"x"), 0), vec![], 0);
        let final_input = TxInput::new(OutPoint::new(Hash256::sha256(b"y"), 0), vec![], 0xFFFF_FFFF);
        assert!(rbf_input.signals_rbf());
        assert!(!final_input.signals_rbf());
    }
}
