//! Chain state: block connect/disconnect, supply tracking, and the
//! block index (§3, §4.4). Grounded in
//! `original_source/layer1/core/chainstate/chain.cpp`
//! (`ConnectBlock`/`DisconnectBlock`/`UpdateSupply`/chain-work
//! accumulation).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::{AssetId, Hash256, NetworkParams};

use crate::block::Block;
use crate::consensus::issuance;
use crate::error::{Result, TalantonError};
use crate::utxo::{BlockUndo, Coin, OutPoint, UtxoSet};

/// Per-block chain metadata (§3): `chain_work` is a monotonic scalar
/// used to compare forks, incremented by one per block (a
/// proof-of-work-weighted variant is a drop-in replacement left for a
/// future fork-choice rule — not required by this spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub hash: Hash256,
    pub prev_hash: Hash256,
    pub height: u64,
    pub timestamp: u32,
    pub bits: u32,
    pub chain_work: u128,
}

/// Chain state (§3): the UTXO set, tip, height, per-asset supply, and
/// block index, all owned together so a connect either commits every
/// mutation or none of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockchain {
    utxo_set: UtxoSet,
    tip_hash: Hash256,
    height: u64,
    supply: HashMap<AssetId, u64>,
    index: HashMap<Hash256, BlockIndex>,
    /// Undo data for the current tip only, matching §4.4's "disconnect
    /// the tip" scope; deeper undo history is the storage layer's
    /// concern (§6), out of scope here.
    tip_undo: Option<BlockUndo>,
    params: NetworkParams,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockchainStats {
    pub height: u64,
    pub utxo_count: usize,
}

impl Blockchain {
    /// Connects `genesis` as height 0: no prev-hash check, no input
    /// conservation pass (a genesis block typically carries only its
    /// coinbase), still subject to the coinbase issuance/cap check.
    pub fn new(params: NetworkParams, genesis: &Block) -> Result<Self> {
        let mut chain = Self {
            utxo_set: UtxoSet::new(),
            tip_hash: Hash256::zero(),
            height: 0,
            supply: HashMap::new(),
            index: HashMap::new(),
            tip_undo: None,
            params,
        };
        chain.connect_block(genesis, genesis.header.timestamp)?;
        Ok(chain)
    }

    #[must_use]
    pub const fn tip_hash(&self) -> Hash256 {
        self.tip_hash
    }

    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub fn supply_of(&self, asset: AssetId) -> u64 {
        *self.supply.get(&asset).unwrap_or(&0)
    }

    #[must_use]
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    #[must_use]
    pub fn block_index(&self, hash: &Hash256) -> Option<&BlockIndex> {
        self.index.get(hash)
    }

    #[must_use]
    pub fn stats(&self) -> BlockchainStats {
        BlockchainStats {
            height: self.height,
            utxo_count: self.utxo_set.len(),
        }
    }

    fn is_genesis_state(&self) -> bool {
        self.index.is_empty()
    }

    /// Connect procedure (§4.4): structural validity, per-transaction
    /// UTXO spend/conservation, coinbase issuance check, then the
    /// atomic height/tip/supply/index advance. On any error, no
    /// mutation has been applied.
    pub fn connect_block(&mut self, block: &Block, timestamp: u32) -> Result<BlockUndo> {
        let is_genesis = self.is_genesis_state();
        let new_height = if is_genesis { 0 } else { self.height + 1 };

        block.validate_structure(self.params.max_block_size)?;

        if !is_genesis && block.header.prev_hash != self.tip_hash {
            return Err(TalantonError::InvalidBlockStructure(
                "block does not extend the current tip".to_string(),
            ));
        }

        let mut undo = BlockUndo::new();
        // A working copy so a failed validation leaves `self.utxo_set`
        // untouched; spends and adds apply immediately, transaction by
        // transaction, so a later transaction may spend an earlier one's
        // output from the same block (§4.4 step 2e, `original_source`'s
        // `ConnectBlock`).
        let mut working = self.utxo_set.clone();

        for tx in &block.transactions[1..] {
            let mut tx_undo = Vec::with_capacity(tx.inputs.len());
            let mut input_totals: HashMap<AssetId, u64> = HashMap::new();

            for input in &tx.inputs {
                let coin = working
                    .get_coin(&input.previous_output)
                    .cloned()
                    .ok_or(TalantonError::MissingOrSpentInput)?;
                if !coin.is_spendable_at(new_height, self.params.coinbase_maturity.into()) {
                    return Err(TalantonError::ImmatureCoinbase);
                }
                let asset = coin.output.asset_amount.asset;
                let amount = coin.output.asset_amount.amount;
                let total = input_totals.entry(asset).or_insert(0);
                *total = total
                    .checked_add(amount)
                    .ok_or(TalantonError::Shared(shared::PantheonError::ArithmeticOverflow))?;

                tx_undo.push(coin);
                working.spend_coin(&input.previous_output);
            }

            let output_totals = tx.output_totals()?;
            for (asset, out_total) in &output_totals {
                let in_total = input_totals.get(asset).copied().unwrap_or(0);
                if in_total < *out_total {
                    return Err(TalantonError::BrokenConservation);
                }
            }

            let txid = tx.txid();
            for (vout, output) in tx.outputs.iter().enumerate() {
                let outpoint = OutPoint::new(txid, vout as u32);
                working.add_coin(outpoint, Coin::new(output.clone(), new_height, false));
            }

            undo.tx_undos.push(tx_undo);
        }
        // Coinbase has no prevouts to record.
        undo.tx_undos.insert(0, Vec::new());

        let coinbase = &block.transactions[0];
        let coinbase_totals = coinbase.output_totals()?;
        let mut next_supply = self.supply.clone();
        for (asset, amount) in &coinbase_totals {
            if !issuance::is_valid_block_reward(new_height, *asset, *amount) {
                return Err(TalantonError::InvalidCoinbaseReward);
            }
            let current = next_supply.entry(*asset).or_insert(0);
            let updated = current
                .checked_add(*amount)
                .ok_or(TalantonError::SupplyOverflow)?;
            if updated > asset.max_supply() {
                return Err(TalantonError::SupplyExceedsCap);
            }
            *current = updated;
        }

        // Every check passed: commit the working set plus the coinbase.
        self.utxo_set = working;
        let coinbase_txid = coinbase.txid();
        for (vout, output) in coinbase.outputs.iter().enumerate() {
            let outpoint = OutPoint::new(coinbase_txid, vout as u32);
            self.utxo_set
                .add_coin(outpoint, Coin::new(output.clone(), new_height, true));
        }

        let block_hash = block.hash();
        let chain_work = if is_genesis {
            1
        } else {
            self.index
                .get(&self.tip_hash)
                .map_or(1, |idx| idx.chain_work + 1)
        };
        self.index.insert(
            block_hash,
            BlockIndex {
                hash: block_hash,
                prev_hash: block.header.prev_hash,
                height: new_height,
                timestamp,
                bits: block.header.bits,
                chain_work,
            },
        );

        self.height = new_height;
        self.tip_hash = block_hash;
        self.supply = next_supply;
        self.tip_undo = Some(undo.clone());

        tracing::info!(height = new_height, hash = %block_hash, "block connected");

        Ok(undo)
    }

    /// Disconnect procedure (§4.4), tip only: reverses `connect_block`
    /// exactly, restoring UTXO set, tip, height, and per-asset supply.
    /// Genesis cannot be disconnected.
    pub fn disconnect_tip(&mut self, block: &Block) -> Result<()> {
        if block.hash() != self.tip_hash {
            return Err(TalantonError::NotTip);
        }
        if self.height == 0 {
            return Err(TalantonError::CannotDisconnectGenesis);
        }

        let undo = self
            .tip_undo
            .clone()
            .ok_or(TalantonError::MismatchedUndo)?;
        if undo.tx_undos.len() != block.transactions.len() {
            return Err(TalantonError::MismatchedUndo);
        }

        // Reverse order: last transaction first.
        for (tx, tx_undo) in block.transactions.iter().zip(undo.tx_undos.iter()).rev() {
            let txid = tx.txid();
            for vout in 0..tx.outputs.len() {
                self.utxo_set.spend_coin(&OutPoint::new(txid, vout as u32));
            }

            if tx.is_coinbase() {
                if !tx_undo.is_empty() {
                    return Err(TalantonError::MismatchedUndo);
                }
                continue;
            }

            if tx_undo.len() != tx.inputs.len() {
                return Err(TalantonError::MismatchedUndo);
            }
            for (input, coin) in tx.inputs.iter().zip(tx_undo.iter()) {
                self.utxo_set.add_coin(input.previous_output, coin.clone());
            }
        }

        let coinbase_totals = block.transactions[0].output_totals()?;
        for (asset, amount) in coinbase_totals {
            let entry = self.supply.entry(asset).or_insert(0);
            *entry = entry.saturating_sub(amount);
        }

        let prev_hash = block.header.prev_hash;
        self.index.remove(&block.hash());
        self.height -= 1;
        self.tip_hash = prev_hash;
        self.tip_undo = None;

        tracing::info!(height = self.height, hash = %prev_hash, "block disconnected");

        Ok(())
    }
}
