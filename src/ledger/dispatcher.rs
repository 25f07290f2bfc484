//! Dispatcher boundary
//!
//! A [`Dispatcher`] takes an encoded message and either evaluates it
//! locally or submits it to the ledger, answering with the raw output
//! values of the called function.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abi::{AbiValue, EncodedMessage};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How a message is to be run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallMode {
    /// Read-only get-method, evaluated locally
    GetMethod,
    /// Mutating call evaluated locally and never broadcast
    DryRun,
    /// Mutating call submitted to the ledger
    External,
}

impl CallMode {
    pub fn is_local(self) -> bool {
        !matches!(self, CallMode::External)
    }
}

/// Notice that the ledger accepted a message for processing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedMessage {
    pub message_hash: String,
    pub expire_at: u32,
}

/// Callback run once a submitted message is accepted. An error aborts
/// processing of the message. It runs synchronously on the dispatching
/// task and should stay short.
pub type PreparedHook<'a> = &'a (dyn Fn(&PreparedMessage) -> Result<(), BoxError> + Sync);

/// Ledger-level failures
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Message expired at {expire_at} (ledger time {now})")]
    Expired { expire_at: u32, now: u32 },
    #[error("Message rejected: {0}")]
    Rejected(String),
    #[error("Message {0} was already processed")]
    Duplicate(String),
    #[error("Contract failed with exit code {code}: {reason}")]
    ContractFailed { code: u32, reason: String },
    #[error("Message processing aborted: {0}")]
    Aborted(#[source] BoxError),
    /// The ledger could not be reached. Raised by remote dispatchers;
    /// [`LocalLedger`](super::LocalLedger) never produces it.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DispatchError {
    pub fn is_expired(&self) -> bool {
        matches!(self, DispatchError::Expired { .. })
    }

    /// Exit code reported by the contract, if it got that far
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            DispatchError::ContractFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Executes or submits encoded messages
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run `message` in the given mode.
    ///
    /// `on_prepared` is only invoked for [`CallMode::External`], after the
    /// message is accepted and before it is executed.
    async fn dispatch(
        &self,
        message: &EncodedMessage,
        mode: CallMode,
        on_prepared: Option<PreparedHook<'_>>,
    ) -> Result<Vec<AbiValue>, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_mode_locality() {
        assert!(CallMode::GetMethod.is_local());
        assert!(CallMode::DryRun.is_local());
        assert!(!CallMode::External.is_local());
    }

    #[test]
    fn test_error_classification_helpers() {
        let expired = DispatchError::Expired {
            expire_at: 10,
            now: 11,
        };
        assert!(expired.is_expired());
        assert_eq!(expired.exit_code(), None);

        let failed = DispatchError::ContractFailed {
            code: 102,
            reason: "transaction does not exist".to_string(),
        };
        assert!(!failed.is_expired());
        assert_eq!(failed.exit_code(), Some(102));
    }
}
