//! The mempool (§3, §4.5): fee-rate priority, conflict detection,
//! BIP-125 replace-by-fee, child-pays-for-parent ancestor bookkeeping,
//! and size-bounded eviction. Grounded in
//! `original_source/layer1/core/mempool/mempool.h/.cpp`; the
//! `MIN_RBF_FEE_INCREMENT`/`MIN_RBF_FEE_RATE_MULTIPLIER` constants are
//! referenced there but never defined — resolved per §8 scenario 3 and
//! recorded in DESIGN.md.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use shared::{AssetId, Hash256, NetworkParams};

use crate::error::{Result, TalantonError};
use crate::transaction::Transaction;
use crate::utxo::{OutPoint, UtxoSet};

/// Flat minimum absolute fee bump a replacement must clear, on top of
/// `replaced_fees` (§4.5, Open Question resolution in DESIGN.md).
pub const MIN_RBF_FEE_INCREMENT: u64 = 1000;

/// The replacement's fee rate must be at least this multiplier (as a
/// `numerator/denominator` pair, evaluated via integer
/// cross-multiplication) times the minimum fee rate among the
/// transactions it replaces.
pub const MIN_RBF_FEE_RATE_NUMERATOR: u64 = 11;
pub const MIN_RBF_FEE_RATE_DENOMINATOR: u64 = 10;

/// Fixed-point scale used to keep fee-rate comparisons integer-only
/// (no floating point on any consensus-adjacent path, per §1 Non-goals).
pub const FEE_RATE_SCALE: u128 = 1_000_000;

fn fee_rate_scaled(fee: u64, size: usize) -> u128 {
    (u128::from(fee) * FEE_RATE_SCALE) / (size.max(1) as u128)
}

/// One pooled transaction plus its priority and ancestor bookkeeping
/// (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub tx: Transaction,
    pub txid: Hash256,
    pub fee: u64,
    pub size: usize,
    pub admission_time: u64,
    pub admission_height: u64,
    pub signals_rbf: bool,
    /// Ancestor rollup (§3), inclusive of this entry itself.
    pub ancestor_fee: u64,
    pub ancestor_size: usize,
    pub ancestor_count: usize,
}

impl MempoolEntry {
    #[must_use]
    pub fn fee_rate(&self) -> u128 {
        fee_rate_scaled(self.fee, self.size)
    }

    #[must_use]
    pub fn ancestor_fee_rate(&self) -> u128 {
        fee_rate_scaled(self.ancestor_fee, self.ancestor_size)
    }
}

/// Computes per-asset (input total - output total) for `tx`, resolving
/// each input either against the confirmed UTXO set or, for
/// still-unconfirmed inputs, against another pooled transaction's
/// outputs (mempool chaining). Returns an error if any input is
/// missing from both, immature, or if per-asset conservation fails.
fn resolve_and_diff(
    tx: &Transaction,
    utxo_set: &UtxoSet,
    pooled: &HashMap<Hash256, MempoolEntry>,
    current_height: u64,
    coinbase_maturity: u64,
) -> Result<(HashMap<AssetId, u64>, HashSet<Hash256>)> {
    let mut input_totals: HashMap<AssetId, u64> = HashMap::new();
    let mut in_pool_parents = HashSet::new();

    for input in &tx.inputs {
        let prevout = input.previous_output;
        let (asset, amount) = if let Some(coin) = utxo_set.get_coin(&prevout) {
            if !coin.is_spendable_at(current_height, coinbase_maturity) {
                return Err(TalantonError::ImmatureCoinbase);
            }
            (coin.output.asset_amount.asset, coin.output.asset_amount.amount)
        } else if let Some(parent) = pooled.get(&prevout.txid) {
            let output = parent
                .tx
                .outputs
                .get(prevout.vout as usize)
                .ok_or(TalantonError::MissingOrSpentInput)?;
            in_pool_parents.insert(prevout.txid);
            (output.asset_amount.asset, output.asset_amount.amount)
        } else {
            return Err(TalantonError::MissingOrSpentInput);
        };

        let total = input_totals.entry(asset).or_insert(0);
        *total = total
            .checked_add(amount)
            .ok_or(TalantonError::Shared(shared::PantheonError::ArithmeticOverflow))?;
    }

    let output_totals = tx.output_totals()?;
    let mut diffs = input_totals.clone();
    for (asset, out_total) in output_totals {
        let in_total = input_totals.get(&asset).copied().unwrap_or(0);
        if in_total < out_total {
            return Err(TalantonError::BrokenConservation);
        }
        diffs.insert(asset, in_total - out_total);
    }

    Ok((diffs, in_pool_parents))
}

/// Fee-rate-prioritised, conflict-aware transaction pool (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mempool {
    entries: HashMap<Hash256, MempoolEntry>,
    /// `prevout -> spending txid`, used to detect conflicts (§4.5).
    spenders: HashMap<OutPoint, Hash256>,
    parents: HashMap<Hash256, HashSet<Hash256>>,
    children: HashMap<Hash256, HashSet<Hash256>>,
    total_size: usize,
    next_admission_time: u64,
    params: NetworkParams,
}

impl Mempool {
    #[must_use]
    pub fn new(params: NetworkParams) -> Self {
        Self {
            entries: HashMap::new(),
            spenders: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            total_size: 0,
            next_admission_time: 0,
            params,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, txid: &Hash256) -> bool {
        self.entries.contains_key(txid)
    }

    #[must_use]
    pub fn get(&self, txid: &Hash256) -> Option<&MempoolEntry> {
        self.entries.get(txid)
    }

    fn direct_conflicts(&self, tx: &Transaction, self_txid: &Hash256) -> HashSet<Hash256> {
        tx.inputs
            .iter()
            .filter_map(|input| self.spenders.get(&input.previous_output))
            .filter(|txid| *txid != self_txid)
            .copied()
            .collect()
    }

    fn descendants_of(&self, roots: &HashSet<Hash256>) -> HashSet<Hash256> {
        let mut closure = roots.clone();
        let mut stack: Vec<Hash256> = roots.iter().copied().collect();
        while let Some(txid) = stack.pop() {
            if let Some(kids) = self.children.get(&txid) {
                for kid in kids {
                    if closure.insert(*kid) {
                        stack.push(*kid);
                    }
                }
            }
        }
        closure
    }

    fn ancestors_of(&self, txid: &Hash256) -> HashSet<Hash256> {
        let mut closure = HashSet::new();
        let mut stack = vec![*txid];
        while let Some(current) = stack.pop() {
            if let Some(parents) = self.parents.get(&current) {
                for parent in parents {
                    if closure.insert(*parent) {
                        stack.push(*parent);
                    }
                }
            }
        }
        closure
    }

    fn evict(&mut self, txid: &Hash256) {
        if let Some(entry) = self.entries.remove(txid) {
            self.total_size -= entry.size;
            for input in &entry.tx.inputs {
                self.spenders.remove(&input.previous_output);
            }
            if let Some(parents) = self.parents.remove(txid) {
                for parent in &parents {
                    if let Some(kids) = self.children.get_mut(parent) {
                        kids.remove(txid);
                    }
                }
            }
            if let Some(kids) = self.children.remove(txid) {
                for kid in &kids {
                    if let Some(parents) = self.parents.get_mut(kid) {
                        parents.remove(txid);
                    }
                }
            }
        }
    }

    /// Evicts lowest-fee-rate entries until `extra_bytes` fits under
    /// the byte-size cap, or no more evictable entries remain (§4.5).
    fn make_room(&mut self, extra_bytes: usize) {
        while self.total_size + extra_bytes > self.params.max_mempool_size && !self.entries.is_empty() {
            let victim = self
                .entries
                .values()
                .min_by(|a, b| {
                    a.fee_rate()
                        .cmp(&b.fee_rate())
                        .then(b.admission_time.cmp(&a.admission_time))
                })
                .map(|e| e.txid);
            match victim {
                Some(txid) => self.evict(&txid),
                None => break,
            }
        }
    }

    fn recompute_ancestor_rollup(&mut self, txid: Hash256) {
        let ancestors = self.ancestors_of(&txid);
        let mut fee = 0u64;
        let mut size = 0usize;
        let mut count = 0usize;
        if let Some(entry) = self.entries.get(&txid) {
            fee = entry.fee;
            size = entry.size;
            count = 1;
        }
        for ancestor in ancestors {
            if let Some(entry) = self.entries.get(&ancestor) {
                fee = fee.saturating_add(entry.fee);
                size += entry.size;
                count += 1;
            }
        }
        if let Some(entry) = self.entries.get_mut(&txid) {
            entry.ancestor_fee = fee;
            entry.ancestor_size = size;
            entry.ancestor_count = count;
        }
    }

    /// Admits `tx` into the pool (§4.5). `admission_time` is an
    /// explicit, caller-supplied logical clock value — no implicit
    /// wall-clock dependency on any consensus-adjacent path.
    pub fn admit(
        &mut self,
        tx: Transaction,
        utxo_set: &UtxoSet,
        current_height: u64,
        coinbase_maturity: u64,
        admission_time: u64,
    ) -> Result<Hash256> {
        let txid = tx.txid();
        if self.entries.contains_key(&txid) {
            return Err(TalantonError::DuplicateTransaction);
        }
        tx.validate_basic()?;

        let (diffs, in_pool_parents) =
            resolve_and_diff(&tx, utxo_set, &self.entries, current_height, coinbase_maturity)?;
        let fee = diffs.get(&AssetId::Talanton).copied().unwrap_or(0);
        let size = tx.size();

        if fee < self.params.min_relay_fee_rate.saturating_mul(size as u64) {
            return Err(TalantonError::BelowRelayRate);
        }

        let conflicts = self.direct_conflicts(&tx, &txid);
        if !conflicts.is_empty() {
            let signalling = tx.signals_rbf()
                && conflicts
                    .iter()
                    .all(|c| self.entries.get(c).is_some_and(|e| e.signals_rbf));
            if !signalling {
                return Err(TalantonError::ConflictWithoutRbf);
            }
            self.validate_replacement(&conflicts, fee, size)?;
            let closure = self.descendants_of(&conflicts);
            for victim in &closure {
                self.evict(victim);
            }
        }

        self.make_room(size);
        if self.total_size + size > self.params.max_mempool_size {
            return Err(TalantonError::MempoolFull);
        }

        let entry = MempoolEntry {
            tx: tx.clone(),
            txid,
            fee,
            size,
            admission_time,
            admission_height: current_height,
            signals_rbf: tx.signals_rbf(),
            ancestor_fee: fee,
            ancestor_size: size,
            ancestor_count: 1,
        };

        self.total_size += size;
        self.next_admission_time = self.next_admission_time.max(admission_time) + 1;
        for input in &tx.inputs {
            self.spenders.insert(input.previous_output, txid);
        }
        self.parents.insert(txid, in_pool_parents.clone());
        for parent in &in_pool_parents {
            self.children.entry(*parent).or_default().insert(txid);
        }
        self.children.entry(txid).or_default();
        self.entries.insert(txid, entry);
        self.recompute_ancestor_rollup(txid);

        tracing::info!(%txid, fee, size, "transaction admitted to mempool");
        Ok(txid)
    }

    /// BIP-125 replacement acceptance test (§4.5): strictly more
    /// absolute fee, at least `replaced_fees + MIN_RBF_FEE_INCREMENT`,
    /// and a fee rate at least `11/10` of the minimum conflict fee rate.
    fn validate_replacement(&self, conflicts: &HashSet<Hash256>, new_fee: u64, new_size: usize) -> Result<()> {
        let mut replaced_fees: u64 = 0;
        let mut min_fee_rate: Option<u128> = None;
        for txid in conflicts {
            if let Some(entry) = self.entries.get(txid) {
                replaced_fees = replaced_fees.saturating_add(entry.fee);
                let rate = entry.fee_rate();
                min_fee_rate = Some(min_fee_rate.map_or(rate, |m: u128| m.min(rate)));
            }
        }
        let min_fee_rate = min_fee_rate.unwrap_or(0);

        if new_fee <= replaced_fees {
            return Err(TalantonError::InsufficientReplacementFee);
        }
        if new_fee < replaced_fees.saturating_add(MIN_RBF_FEE_INCREMENT) {
            return Err(TalantonError::InsufficientReplacementFee);
        }
        let new_rate = fee_rate_scaled(new_fee, new_size);
        // new_rate >= min_fee_rate * 11/10, cross-multiplied.
        if new_rate.saturating_mul(u128::from(MIN_RBF_FEE_RATE_DENOMINATOR))
            < min_fee_rate.saturating_mul(u128::from(MIN_RBF_FEE_RATE_NUMERATOR))
        {
            return Err(TalantonError::InsufficientReplacementFee);
        }
        Ok(())
    }

    /// Transactions ordered by descending fee rate, ties broken by
    /// earlier admission time (§4.5).
    #[must_use]
    pub fn select_by_fee_rate(&self) -> Vec<&MempoolEntry> {
        let mut entries: Vec<&MempoolEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.fee_rate()
                .cmp(&a.fee_rate())
                .then(a.admission_time.cmp(&b.admission_time))
        });
        entries
    }

    /// Groups entries into their connected parent/child components
    /// (CPFP packages, §4.5): each reachable component is returned
    /// once, parents preceding children, packages ordered by
    /// descending top-entry fee rate.
    #[must_use]
    pub fn packages(&self) -> Vec<Vec<&MempoolEntry>> {
        let mut visited: HashSet<Hash256> = HashSet::new();
        let mut packages: Vec<Vec<&MempoolEntry>> = Vec::new();

        for txid in self.entries.keys() {
            if visited.contains(txid) {
                continue;
            }
            let mut component = HashSet::new();
            let mut stack = vec![*txid];
            while let Some(current) = stack.pop() {
                if !component.insert(current) {
                    continue;
                }
                if let Some(parents) = self.parents.get(&current) {
                    stack.extend(parents.iter().copied());
                }
                if let Some(kids) = self.children.get(&current) {
                    stack.extend(kids.iter().copied());
                }
            }
            visited.extend(component.iter().copied());

            let ordered = self.topological_order(&component);
            packages.push(ordered);
        }

        packages.sort_by(|a, b| {
            let rate_a = a.iter().map(|e| e.fee_rate()).max().unwrap_or(0);
            let rate_b = b.iter().map(|e| e.fee_rate()).max().unwrap_or(0);
            rate_b.cmp(&rate_a)
        });
        packages
    }

    fn topological_order(&self, component: &HashSet<Hash256>) -> Vec<&MempoolEntry> {
        let mut in_degree: HashMap<Hash256, usize> = HashMap::new();
        for txid in component {
            let count = self
                .parents
                .get(txid)
                .map_or(0, |ps| ps.iter().filter(|p| component.contains(*p)).count());
            in_degree.insert(*txid, count);
        }
        let mut ready: Vec<Hash256> = in_degree
            .iter()
            .filter(|(_, c)| **c == 0)
            .map(|(t, _)| *t)
            .collect();
        ready.sort();
        let mut ordered = Vec::with_capacity(component.len());
        while let Some(txid) = ready.pop() {
            if let Some(entry) = self.entries.get(&txid) {
                ordered.push(entry);
            }
            if let Some(kids) = self.children.get(&txid) {
                for kid in kids {
                    if !component.contains(kid) {
                        continue;
                    }
                    if let Some(count) = in_degree.get_mut(kid) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(*kid);
                        }
                    }
                }
            }
            ready.sort();
        }
        ordered
    }

    /// Block-connection cleanup (§4.5): drops confirmed transactions,
    /// then re-validates the remainder against the post-connect UTXO
    /// set, dropping anything now invalid.
    pub fn reconcile_after_block(
        &mut self,
        confirmed: &[Hash256],
        utxo_set: &UtxoSet,
        new_height: u64,
        coinbase_maturity: u64,
    ) {
        for txid in confirmed {
            self.evict(txid);
        }

        let stale: Vec<Hash256> = self
            .entries
            .values()
            .filter(|entry| {
                resolve_and_diff(&entry.tx, utxo_set, &self.entries, new_height, coinbase_maturity).is_err()
            })
            .map(|entry| entry.txid)
            .collect();
        for txid in stale {
            self.evict(&txid);
        }

        let txids: Vec<Hash256> = self.entries.keys().copied().collect();
        for txid in txids {
            self.recompute_ancestor_rollup(txid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxInput, TxOutput};
    use crate::utxo::Coin;
    use shared::AssetAmount;

    fn params() -> NetworkParams {
        let mut p = NetworkParams::regtest();
        p.min_relay_fee_rate = 0;
        p.max_mempool_size = 1_000_000;
        p
    }

    fn funded_utxo(amount: u64) -> (UtxoSet, OutPoint) {
        let mut utxo_set = UtxoSet::new();
        let outpoint = OutPoint::new(Hash256::sha256(b"seed"), 0);
        utxo_set.add_coin(
            outpoint,
            Coin::new(TxOutput::new(AssetAmount::new(AssetId::Talanton, amount), vec![1]), 0, false),
        );
        (utxo_set, outpoint)
    }

    fn spending_tx(outpoint: OutPoint, input_amount: u64, fee: u64, sequence: u32) -> Transaction {
        Transaction::new(
            1,
            vec![TxInput::new(outpoint, vec![], sequence)],
            vec![TxOutput::new(
                AssetAmount::new(AssetId::Talanton, input_amount - fee),
                vec![2],
            )],
            0,
        )
    }

    #[test]
    fn admits_a_valid_transaction() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let tx = spending_tx(outpoint, 10_000, 1000, 0);
        let txid = pool.admit(tx, &utxo_set, 1, 100, 0).unwrap();
        assert!(pool.contains(&txid));
        assert_eq!(pool.get(&txid).unwrap().fee, 1000);
    }

    #[test]
    fn rejects_duplicate_admission() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let tx = spending_tx(outpoint, 10_000, 1000, 0);
        pool.admit(tx.clone(), &utxo_set, 1, 100, 0).unwrap();
        assert!(matches!(
            pool.admit(tx, &utxo_set, 1, 100, 1),
            Err(TalantonError::DuplicateTransaction)
        ));
    }

    #[test]
    fn conflict_without_rbf_signal_is_rejected() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let tx_a = spending_tx(outpoint, 10_000, 1000, 0xFFFF_FFFF);
        pool.admit(tx_a, &utxo_set, 1, 100, 0).unwrap();

        let tx_b = spending_tx(outpoint, 10_000, 2000, 0xFFFF_FFFF);
        assert!(matches!(
            pool.admit(tx_b, &utxo_set, 1, 100, 1),
            Err(TalantonError::ConflictWithoutRbf)
        ));
    }

    #[test]
    fn rbf_replacement_succeeds_above_threshold_fails_below() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let tx_x = spending_tx(outpoint, 10_000, 1000, 0);
        let txid_x = pool.admit(tx_x, &utxo_set, 1, 100, 0).unwrap();

        // fee 1999 fails: below replaced_fees(1000) + MIN_RBF_FEE_INCREMENT(1000) = 2000
        let tx_fail = spending_tx(outpoint, 10_000, 1999, 0);
        assert!(matches!(
            pool.admit(tx_fail, &utxo_set, 1, 100, 1),
            Err(TalantonError::InsufficientReplacementFee)
        ));
        assert!(pool.contains(&txid_x));

        // fee 2100 succeeds: >= 2000 and fee-rate >= 1.1x
        let tx_ok = spending_tx(outpoint, 10_000, 2100, 0);
        let txid_ok = pool.admit(tx_ok, &utxo_set, 1, 100, 2).unwrap();
        assert!(!pool.contains(&txid_x));
        assert!(pool.contains(&txid_ok));
    }

    #[test]
    fn ancestor_rollup_includes_in_pool_parent() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let parent = spending_tx(outpoint, 10_000, 1000, 0);
        let parent_txid = pool.admit(parent.clone(), &utxo_set, 1, 100, 0).unwrap();

        let child_outpoint = OutPoint::new(parent_txid, 0);
        let child = spending_tx(child_outpoint, 9000, 500, 0);
        let child_txid = pool.admit(child, &utxo_set, 1, 100, 1).unwrap();

        let child_entry = pool.get(&child_txid).unwrap();
        assert_eq!(child_entry.ancestor_count, 2);
        assert_eq!(child_entry.ancestor_fee, 1500);
    }

    #[test]
    fn packages_place_parent_before_child() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut pool = Mempool::new(params());
        let parent = spending_tx(outpoint, 10_000, 1000, 0);
        let parent_txid = pool.admit(parent, &utxo_set, 1, 100, 0).unwrap();
        let child = spending_tx(OutPoint::new(parent_txid, 0), 9000, 500, 0);
        pool.admit(child, &utxo_set, 1, 100, 1).unwrap();

        let packages = pool.packages();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].len(), 2);
        assert_eq!(packages[0][0].txid, parent_txid);
    }

    #[test]
    fn below_relay_rate_is_rejected() {
        let (utxo_set, outpoint) = funded_utxo(10_000);
        let mut strict_params = params();
        strict_params.min_relay_fee_rate = 1_000_000;
        let mut pool = Mempool::new(strict_params);
        let tx = spending_tx(outpoint, 10_000, 1, 0);
        assert!(matches!(
            pool.admit(tx, &utxo_set, 1, 100, 0),
            Err(TalantonError::BelowRelayRate)
        ));
    }
}
