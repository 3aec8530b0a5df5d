//! The persistence contract (§6): an opaque key/value store. The core
//! depends on this trait but never implements an on-disk engine — that
//! remains an external collaborator (§1). An in-memory implementation is
//! provided for tests.

use std::collections::BTreeMap;

pub trait KvStore {
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn delete(&mut self, key: &[u8]);
    /// Returns all (key, value) pairs whose key starts with `prefix`,
    /// ordered by key.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// Key prefixes used by the block/UTXO layout (§6).
pub mod prefixes {
    pub const BLOCK: u8 = b'b';
    pub const HEIGHT_INDEX: u8 = b'h';
    pub const UTXO: u8 = b'u';
    pub const META: &str = "meta:";
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryKvStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.map.insert(key.to_vec(), value.to_vec());
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.get(key).cloned()
    }

    fn delete(&mut self, key: &[u8]) {
        self.map.remove(key);
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_round_trip() {
        let mut store = InMemoryKvStore::new();
        store.put(b"k1", b"v1");
        assert_eq!(store.get(b"k1"), Some(b"v1".to_vec()));
        store.delete(b"k1");
        assert_eq!(store.get(b"k1"), None);
    }

    #[test]
    fn scan_prefix_returns_matching_keys_in_order() {
        let mut store = InMemoryKvStore::new();
        store.put(b"u_0001", b"a");
        store.put(b"u_0002", b"b");
        store.put(b"b_0001", b"c");
        let results = store.scan_prefix(b"u_");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, b"u_0001");
        assert_eq!(results[1].0, b"u_0002");
    }
}
