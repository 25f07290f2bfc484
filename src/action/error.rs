//! Action failure taxonomy

use thiserror::Error;

use crate::abi::{DecodingError, EncodingError};
use crate::crypto::SigningError;
use crate::ledger::DispatchError;

/// Coarse classification a caller can base retry decisions on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The message could not be built or signed
    Build,
    /// The ledger rejected or failed the message
    Ledger,
    /// The ledger answered, but the answer could not be interpreted
    Interpret,
    /// Local bookkeeping failed
    Internal,
}

/// Errors delivered to an action's result consumer
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Could not encode call: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Could not sign message: {0}")]
    Signing(#[from] SigningError),
    #[error("Ledger error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Could not interpret ledger answer: {0}")]
    Decoding(#[from] DecodingError),
    #[error("Message was already built for this action")]
    MessageAlreadyBuilt,
    #[error("Failed to record message info: {0}")]
    MessageInfo(#[from] std::io::Error),
    #[error("Action was dropped before delivering a result")]
    Abandoned,
}

impl ActionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ActionError::Encoding(_)
            | ActionError::Signing(_)
            | ActionError::MessageAlreadyBuilt => ErrorClass::Build,
            ActionError::Dispatch(DispatchError::Aborted(_)) => ErrorClass::Internal,
            ActionError::Dispatch(_) => ErrorClass::Ledger,
            ActionError::Decoding(_) => ErrorClass::Interpret,
            ActionError::MessageInfo(_) | ActionError::Abandoned => ErrorClass::Internal,
        }
    }

    /// Whether the ledger refused the message because its window closed
    pub fn is_expired(&self) -> bool {
        matches!(self, ActionError::Dispatch(err) if err.is_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            ActionError::from(SigningError::InvalidKey).class(),
            ErrorClass::Build
        );
        assert_eq!(
            ActionError::from(DispatchError::Rejected("bad signature".into())).class(),
            ErrorClass::Ledger
        );
        assert_eq!(
            ActionError::from(DecodingError::Invariant("mask".into())).class(),
            ErrorClass::Interpret
        );
        assert_eq!(
            ActionError::from(DispatchError::Aborted("disk full".into())).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_expired_detection() {
        let err = ActionError::from(DispatchError::Expired {
            expire_at: 1,
            now: 2,
        });
        assert!(err.is_expired());
        assert_eq!(err.class(), ErrorClass::Ledger);
        assert!(!ActionError::Abandoned.is_expired());
    }
}
