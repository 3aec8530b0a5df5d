use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{PantheonError, Result};

/// A 256-bit hash identifying blocks, transactions, and other consensus data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| PantheonError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(PantheonError::InvalidHashLength(bytes.len()));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self(hash))
    }

    pub fn is_hex64(s: &str) -> bool {
        s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// SHA-256 applied once.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Self(hash)
    }

    /// SHA-256 applied twice (SHA-256d). This is the hash used for every
    /// consensus-critical transaction and block identifier.
    #[must_use]
    pub fn sha256d(data: &[u8]) -> Self {
        let once = Self::sha256(data);
        Self::sha256(&once.0)
    }

    /// Tagged hash: `SHA256(SHA256(tag) || SHA256(tag) || data)`, following
    /// the BIP-340 tagged-hash construction used to domain-separate the
    /// signature-hash from other SHA-256 applications.
    #[must_use]
    pub fn tagged(tag: &str, data: &[u8]) -> Self {
        let tag_hash = Self::sha256(tag.as_bytes());
        let mut buf = Vec::with_capacity(64 + data.len());
        buf.extend_from_slice(&tag_hash.0);
        buf.extend_from_slice(&tag_hash.0);
        buf.extend_from_slice(data);
        Self::sha256(&buf)
    }

    /// Big-endian numeric comparison against a 32-byte target, used by the
    /// proof-of-work check. `self` is the block hash, `target` the decoded
    /// compact-bits target; both are compared byte 0 first as most
    /// significant.
    #[must_use]
    pub fn le_target(&self, target: &[u8; 32]) -> bool {
        self.0 <= *target
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl TryFrom<&str> for Hash256 {
    type Error = PantheonError;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_hex(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_displays_as_64_zero_chars() {
        let hash = Hash256::zero();
        assert_eq!(hash.to_string(), "0".repeat(64));
    }

    #[test]
    fn sha256d_is_deterministic_and_nonzero() {
        let data = b"hello pantheon";
        let a = Hash256::sha256d(data);
        let b = Hash256::sha256d(data);
        assert_eq!(a, b);
        assert_ne!(a, Hash256::zero());
    }

    #[test]
    fn sha256d_differs_from_single_sha256() {
        let data = b"abc";
        assert_ne!(Hash256::sha256(data), Hash256::sha256d(data));
    }

    #[test]
    fn from_hex_round_trips_through_display() {
        let hash = Hash256::sha256d(b"round-trip");
        let encoded = hash.to_string();
        let decoded = Hash256::from_hex(&encoded).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(Hash256::from_hex("abcd").is_err());
    }

    #[test]
    fn is_hex64_validates_length_and_charset() {
        assert!(Hash256::is_hex64(&"a".repeat(64)));
        assert!(!Hash256::is_hex64(&"a".repeat(63)));
        assert!(!Hash256::is_hex64(&"z".repeat(64)));
    }
}
