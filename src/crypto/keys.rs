//! ECDSA key management
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Custodians are identified on-chain by
//! the 256-bit x-coordinate of their public key.

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;

use super::hash::sha256;
use crate::abi::Uint256;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Raw private key material.
///
/// Only the length is checked on construction; whether the bytes form a
/// valid scalar is discovered when the key is first used for signing.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded 32-byte private key
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Resolve into a usable key pair
    pub fn to_key_pair(&self) -> Result<KeyPair, KeyError> {
        let secret_key = SecretKey::from_slice(&self.0).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(KeyPair::from_secret_key(secret_key))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        PrivateKey::from_hex(hex_key)?.to_key_pair()
    }

    /// Raw private key material for handing to an action
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey(self.secret_key.secret_bytes())
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// The 256-bit key under which the contract knows this custodian
    pub fn custodian_key(&self) -> Uint256 {
        custodian_key(&self.public_key)
    }

    /// Sign a message hash with the private key
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message_hash: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message_hash, signature)
    }
}

/// Derive the contract-side custodian key (x-only public key)
pub fn custodian_key(public_key: &PublicKey) -> Uint256 {
    Uint256(public_key.x_only_public_key().0.serialize())
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a message hash with a secret key
pub fn sign_message(secret_key: &SecretKey, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();

    // Ensure message hash is 32 bytes
    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };

    let message = Message::from_digest_slice(&hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();

    let hash = if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    };

    let message = Message::from_digest_slice(&hash)?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    match secp.verify_ecdsa(&message, &sig, public_key) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.private_key_hex().len(), 64);
        assert_eq!(kp.public_key_hex().len(), 66);
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let message_hash = sha256(b"confirmTransaction");

        let signature = kp.sign(&message_hash).unwrap();
        assert!(kp.verify(&message_hash, &signature).unwrap());
        assert!(!KeyPair::generate()
            .verify(&message_hash, &signature)
            .unwrap());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::from_private_key_hex(&kp1.private_key_hex()).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.custodian_key(), kp2.custodian_key());
    }

    #[test]
    fn test_private_key_parsing() {
        assert!(PrivateKey::from_hex("abcd").is_err());
        assert!(PrivateKey::from_hex("zz").is_err());

        // Right length but not a valid secp256k1 scalar
        let zero = PrivateKey::from_bytes([0u8; 32]);
        assert!(matches!(
            zero.to_key_pair(),
            Err(KeyError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let kp = KeyPair::generate();
        let rendered = format!("{:?}", kp.private_key());
        assert!(!rendered.contains(&kp.private_key_hex()));
    }
}
