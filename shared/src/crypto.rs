//! Schnorr (BIP-340 x-only) signing for PantheonChain transactions.

use rand::rngs::OsRng;
use secp256k1::{schnorr, Keypair as SecpKeypair, Message, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{PantheonError, Result};
use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    Schnorr,
}

/// An x-only Schnorr public key (32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    key_data: [u8; 32],
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(PantheonError::InvalidKeySize {
                expected: 32,
                actual: bytes.len(),
            });
        }
        // Validate it is a well-formed curve point.
        XOnlyPublicKey::from_slice(bytes).map_err(|e| PantheonError::Crypto(e.to_string()))?;
        let mut key_data = [0u8; 32];
        key_data.copy_from_slice(bytes);
        Ok(Self { key_data })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_data
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Schnorr
    }

    fn to_secp(&self) -> Result<XOnlyPublicKey> {
        XOnlyPublicKey::from_slice(&self.key_data).map_err(|e| PantheonError::Crypto(e.to_string()))
    }
}

/// A 32-byte secp256k1 secret key. Zeroized on drop.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    key_data: [u8; 32],
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(PantheonError::InvalidKeySize {
                expected: 32,
                actual: bytes.len(),
            });
        }
        secp256k1::SecretKey::from_slice(bytes).map_err(|e| PantheonError::Crypto(e.to_string()))?;
        let mut key_data = [0u8; 32];
        key_data.copy_from_slice(bytes);
        Ok(Self { key_data })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_data
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Schnorr
    }

    fn to_secp_keypair(&self, secp: &Secp256k1<secp256k1::All>) -> Result<SecpKeypair> {
        SecpKeypair::from_seckey_slice(secp, &self.key_data)
            .map_err(|e| PantheonError::Crypto(e.to_string()))
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.key_data.zeroize();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    pub fn generate() -> Result<Self> {
        let secp = Secp256k1::new();
        let keypair = SecpKeypair::new(&secp, &mut OsRng);
        let (xonly, _parity) = XOnlyPublicKey::from_keypair(&keypair);
        let public_key = PublicKey::from_bytes(&xonly.serialize())?;
        let private_key = PrivateKey::from_bytes(&keypair.secret_bytes())?;
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let secp = Secp256k1::new();
        let keypair = self.private_key.to_secp_keypair(&secp)?;
        let digest = Hash256::sha256(message);
        let msg = Message::from_digest_slice(digest.as_bytes())
            .map_err(|e| PantheonError::Crypto(e.to_string()))?;
        let sig = secp.sign_schnorr(&msg, &keypair);
        Ok(Signature {
            data: sig.as_ref().to_vec(),
            public_key: self.public_key.clone(),
        })
    }
}

/// A 64-byte Schnorr signature bound to the public key that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    data: Vec<u8>,
    public_key: PublicKey,
}

impl Signature {
    pub fn verify(&self, message: &[u8]) -> Result<bool> {
        let secp = Secp256k1::new();
        let xonly = self.public_key.to_secp()?;
        let digest = Hash256::sha256(message);
        let msg = Message::from_digest_slice(digest.as_bytes())
            .map_err(|e| PantheonError::Crypto(e.to_string()))?;
        let sig = schnorr::Signature::from_slice(&self.data)
            .map_err(|e| PantheonError::Crypto(e.to_string()))?;
        Ok(secp.verify_schnorr(&sig, &msg, &xonly).is_ok())
    }

    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Schnorr
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Signs a transaction's signature hash with the given keypair.
pub fn sign_transaction_hash(tx_hash: &Hash256, keypair: &KeyPair) -> Result<Signature> {
    keypair.sign(tx_hash.as_bytes())
}

/// Verifies a signature against a transaction's signature hash.
pub fn verify_transaction_signature(tx_hash: &Hash256, signature: &Signature) -> Result<bool> {
    signature.verify(tx_hash.as_bytes())
}

pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_bytes(bytes)
}

pub fn signature_from_bytes(signature_data: Vec<u8>, public_key: PublicKey) -> Signature {
    Signature {
        data: signature_data,
        public_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schnorr_sign_and_verify_round_trips() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"pantheon-chain transfer";

        let signature = keypair.sign(message).unwrap();
        assert!(signature.verify(message).unwrap());
    }

    #[test]
    fn verify_fails_for_tampered_message() {
        let keypair = KeyPair::generate().unwrap();
        let signature = keypair.sign(b"original").unwrap();
        assert!(!signature.verify(b"tampered").unwrap());
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let signer = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let signature = signer.sign(b"message").unwrap();
        let forged = signature_from_bytes(signature.as_bytes().to_vec(), other.public_key);
        assert!(!forged.verify(b"message").unwrap());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(PrivateKey::from_bytes(&[0u8; 31]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
    }
}
