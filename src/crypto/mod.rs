//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - ECDSA key management (secp256k1)
//! - The message signing boundary used by mutating actions

pub mod hash;
pub mod keys;
pub mod signer;

pub use hash::{sha256, sha256_concat, sha256_hex};
pub use keys::{
    custodian_key, public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair,
    PrivateKey,
};
pub use signer::{MessageSignature, Secp256k1Signer, Signer, SigningError};
