//! Message signing boundary
//!
//! Actions own key material but never do the curve math themselves; they
//! hand the encoded body to a [`Signer`].

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::sha256;
use super::keys::{public_key_from_hex, verify_signature, KeyError, PrivateKey};

/// Errors raised while signing an outbound message
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Invalid private key")]
    InvalidKey,
    #[error("Signing failed: {0}")]
    Failed(#[from] KeyError),
}

/// Signature over a message body, with the key that produced it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSignature {
    /// Compressed public key (hex)
    pub public_key: String,
    /// Compact ECDSA signature over SHA-256(body)
    pub bytes: Vec<u8>,
}

impl MessageSignature {
    /// Parse the embedded public key
    pub fn signer_key(&self) -> Result<PublicKey, KeyError> {
        public_key_from_hex(&self.public_key)
    }

    /// Check this signature against the body it claims to cover
    pub fn verify(&self, body: &[u8]) -> Result<bool, KeyError> {
        let public_key = self.signer_key()?;
        verify_signature(&public_key, &sha256(body), &self.bytes)
    }
}

/// Produces signatures for outbound messages
pub trait Signer: Send + Sync {
    fn sign(&self, key: &PrivateKey, body: &[u8]) -> Result<MessageSignature, SigningError>;
}

/// Default signer backed by secp256k1 ECDSA
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Signer;

impl Signer for Secp256k1Signer {
    fn sign(&self, key: &PrivateKey, body: &[u8]) -> Result<MessageSignature, SigningError> {
        let key_pair = key.to_key_pair().map_err(|err| match err {
            KeyError::InvalidPrivateKey => SigningError::InvalidKey,
            other => SigningError::Failed(other),
        })?;

        let bytes = key_pair.sign(&sha256(body))?;
        Ok(MessageSignature {
            public_key: key_pair.public_key_hex(),
            bytes,
        })
    }
}
