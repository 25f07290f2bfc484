//! Function signatures and encoded messages

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::value::Param;
use crate::crypto::{sha256, sha256_concat, MessageSignature};

/// A contract function: name plus ordered inputs and outputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    /// Whether calls carry the `(time, expire)` header and a signature
    pub signed: bool,
}

impl Function {
    pub fn new(name: &str, inputs: Vec<Param>, outputs: Vec<Param>, signed: bool) -> Self {
        Self {
            name: name.to_string(),
            inputs,
            outputs,
            signed,
        }
    }

    /// Canonical signature text, e.g. `confirmTransaction(uint64)()v2`
    pub fn signature(&self) -> String {
        let join = |params: &[Param]| {
            params
                .iter()
                .map(|p| p.kind.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "{}({})({})v2",
            self.name,
            join(&self.inputs),
            join(&self.outputs)
        )
    }

    /// First four bytes of SHA-256 over the signature text
    pub fn selector(&self) -> u32 {
        let hash = sha256(self.signature().as_bytes());
        u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
    }
}

/// Header carried by signed calls
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Creation time in milliseconds
    pub time: u64,
    /// Unix time (seconds) after which the message must not be accepted
    pub expire: u32,
}

/// A fully built outbound message, ready for dispatch
#[derive(Clone, Debug)]
pub struct EncodedMessage {
    pub function: Function,
    pub header: Option<Header>,
    pub body: Bytes,
    pub signature: Option<MessageSignature>,
}

impl EncodedMessage {
    /// Identifier of the message: SHA-256 over body and signature (hex)
    pub fn hash(&self) -> String {
        let signature = self
            .signature
            .as_ref()
            .map(|s| s.bytes.as_slice())
            .unwrap_or_default();
        hex::encode(sha256_concat(&[self.body.as_ref(), signature]))
    }

    pub fn created_at(&self) -> u64 {
        self.header.map(|h| h.time).unwrap_or(0)
    }

    pub fn expires_at(&self) -> u32 {
        self.header.map(|h| h.expire).unwrap_or(u32::MAX)
    }
}
