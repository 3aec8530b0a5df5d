//! World-state: accounts, contract storage, snapshot/restore, and the
//! deterministic state root (§4.6). Grounded in
//! `original_source/layer1/evm/state.h/.cpp`'s `WorldState`/
//! `AccountState`, translated from a `std::map`-backed store into
//! `BTreeMap`s so address/key ordering (needed for the state root) is
//! free rather than a separate sort pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::Hash256;

use crate::error::{ObolosError, Result};
use crate::uint256::U256;

/// A 20-byte EVM-style account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        if bytes.len() != 20 {
            return Err(ObolosError::InvalidAddressLength(bytes.len()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Account state in the world state (§3): nonce, OBL balance, contract
/// code, and the code hash. `storage_root` is not tracked per-account
/// here — the reference state root (below) folds storage directly
/// rather than maintaining a separate per-account subtree, which the
/// original's "simplified Merkle Patricia Trie" comment already
/// concedes is not a real MPT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code: Vec<u8>,
    pub code_hash: [u8; 32],
}

impl Account {
    fn recompute_code_hash(&mut self) {
        self.code_hash = if self.code.is_empty() {
            [0u8; 32]
        } else {
            *Hash256::sha256(&self.code).as_bytes()
        };
    }
}

/// Deep-copyable snapshot of the world state, used to revert failed
/// executions (§4.6's "restore replaces world state wholesale").
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<(Address, U256), U256>,
}

/// All account and contract-storage state, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<(Address, U256), U256>,
}

impl WorldState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_account(&self, addr: &Address) -> Option<&Account> {
        self.accounts.get(addr)
    }

    pub fn set_account(&mut self, addr: Address, account: Account) {
        self.accounts.insert(addr, account);
    }

    #[must_use]
    pub fn account_exists(&self, addr: &Address) -> bool {
        self.accounts.contains_key(addr)
    }

    /// Returns zero for a key that was never set or was last set to
    /// zero (storage never actually stores zero values, see
    /// `set_storage`).
    #[must_use]
    pub fn get_storage(&self, addr: &Address, key: &U256) -> U256 {
        self.storage.get(&(*addr, *key)).copied().unwrap_or(U256::ZERO)
    }

    /// Writing zero deletes the entry rather than storing a zero word,
    /// matching EVM's "clearing a slot refunds its storage" convention.
    pub fn set_storage(&mut self, addr: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(addr, key));
        } else {
            self.storage.insert((addr, key), value);
        }
    }

    #[must_use]
    pub fn get_code(&self, addr: &Address) -> Vec<u8> {
        self.accounts.get(addr).map(|a| a.code.clone()).unwrap_or_default()
    }

    pub fn set_code(&mut self, addr: Address, code: Vec<u8>) {
        let account = self.accounts.entry(addr).or_default();
        account.code = code;
        account.recompute_code_hash();
    }

    #[must_use]
    pub fn get_balance(&self, addr: &Address) -> U256 {
        self.accounts.get(addr).map(|a| a.balance).unwrap_or(U256::ZERO)
    }

    pub fn set_balance(&mut self, addr: Address, balance: U256) {
        self.accounts.entry(addr).or_default().balance = balance;
    }

    #[must_use]
    pub fn get_nonce(&self, addr: &Address) -> u64 {
        self.accounts.get(addr).map(|a| a.nonce).unwrap_or(0)
    }

    pub fn set_nonce(&mut self, addr: Address, nonce: u64) {
        self.accounts.entry(addr).or_default().nonce = nonce;
    }

    pub fn delete_account(&mut self, addr: &Address) {
        self.accounts.remove(addr);
        self.storage.retain(|(a, _), _| a != addr);
    }

    /// Deterministic state root (§4.6): accounts in address order, each
    /// folded with its nonce, balance, code hash, and a per-account
    /// storage sub-hash over its entries in key order. The tree shape
    /// is implementation-defined per spec — this reference folds via
    /// SHA-256 over the ordered stream rather than building a real
    /// Merkle Patricia Trie, exactly as `original_source` does.
    #[must_use]
    pub fn calculate_state_root(&self) -> [u8; 32] {
        let mut buf = Vec::new();
        for (addr, account) in &self.accounts {
            buf.extend_from_slice(&addr.0);
            buf.extend_from_slice(&account.nonce.to_be_bytes());
            buf.extend_from_slice(account.balance.as_bytes());
            buf.extend_from_slice(&account.code_hash);

            let mut storage_buf = Vec::new();
            for ((a, key), value) in &self.storage {
                if a != addr {
                    continue;
                }
                storage_buf.extend_from_slice(key.as_bytes());
                storage_buf.extend_from_slice(value.as_bytes());
            }
            buf.extend_from_slice(Hash256::sha256(&storage_buf).as_bytes());
        }
        *Hash256::sha256(&buf).as_bytes()
    }

    #[must_use]
    pub fn create_snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            storage: self.storage.clone(),
        }
    }

    pub fn restore_snapshot(&mut self, snapshot: Snapshot) {
        self.accounts = snapshot.accounts;
        self.storage = snapshot.storage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn storage_write_of_zero_deletes_entry() {
        let mut state = WorldState::new();
        let a = addr(1);
        state.set_storage(a, U256::from_u64(1), U256::from_u64(99));
        assert_eq!(state.get_storage(&a, &U256::from_u64(1)), U256::from_u64(99));
        state.set_storage(a, U256::from_u64(1), U256::ZERO);
        assert_eq!(state.get_storage(&a, &U256::from_u64(1)), U256::ZERO);
        assert!(state.storage.is_empty());
    }

    #[test]
    fn absent_storage_reads_as_zero() {
        let state = WorldState::new();
        assert_eq!(state.get_storage(&addr(1), &U256::from_u64(5)), U256::ZERO);
    }

    #[test]
    fn set_code_updates_code_hash() {
        let mut state = WorldState::new();
        let a = addr(2);
        state.set_code(a, vec![0x60, 0x01]);
        let account = state.get_account(&a).unwrap();
        assert_ne!(account.code_hash, [0u8; 32]);

        state.set_code(a, vec![]);
        assert_eq!(state.get_account(&a).unwrap().code_hash, [0u8; 32]);
    }

    #[test]
    fn state_root_is_stable_and_order_independent_across_inserts() {
        let mut a = WorldState::new();
        a.set_balance(addr(1), U256::from_u64(10));
        a.set_balance(addr(2), U256::from_u64(20));

        let mut b = WorldState::new();
        b.set_balance(addr(2), U256::from_u64(20));
        b.set_balance(addr(1), U256::from_u64(10));

        assert_eq!(a.calculate_state_root(), b.calculate_state_root());
    }

    #[test]
    fn state_root_changes_when_state_changes() {
        let mut state = WorldState::new();
        let root_empty = state.calculate_state_root();
        state.set_balance(addr(1), U256::from_u64(1));
        let root_after = state.calculate_state_root();
        assert_ne!(root_empty, root_after);
    }

    #[test]
    fn snapshot_and_restore_round_trips_whole_state() {
        let mut state = WorldState::new();
        state.set_balance(addr(1), U256::from_u64(100));
        state.set_storage(addr(1), U256::from_u64(1), U256::from_u64(42));
        let snapshot = state.create_snapshot();

        state.set_balance(addr(1), U256::from_u64(0));
        state.set_storage(addr(1), U256::from_u64(1), U256::ZERO);
        state.set_balance(addr(2), U256::from_u64(5));
        assert_ne!(state.get_balance(&addr(1)), U256::from_u64(100));

        state.restore_snapshot(snapshot);
        assert_eq!(state.get_balance(&addr(1)), U256::from_u64(100));
        assert_eq!(state.get_storage(&addr(1), &U256::from_u64(1)), U256::from_u64(42));
        assert_eq!(state.get_balance(&addr(2)), U256::ZERO);
    }

    #[test]
    fn delete_account_removes_its_storage_too() {
        let mut state = WorldState::new();
        let a = addr(1);
        state.set_balance(a, U256::from_u64(7));
        state.set_storage(a, U256::from_u64(1), U256::from_u64(9));
        state.delete_account(&a);
        assert!(!state.account_exists(&a));
        assert_eq!(state.get_storage(&a, &U256::from_u64(1)), U256::ZERO);
    }

    #[test]
    fn address_hex_round_trips() {
        let a = Address([0xabu8; 20]);
        let hex = a.to_hex();
        assert_eq!(Address::from_hex(&hex).unwrap(), a);
    }

    #[test]
    fn address_from_hex_rejects_wrong_length() {
        assert!(Address::from_hex("0xabcd").is_err());
    }
}
