//! Multisig contract state as observed through get-methods
//!
//! Plain value types. Each is produced once by decoding a contract answer
//! and then owned by the caller.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::abi::{Address, DecodingError, Uint256};

/// Decoded data that no valid contract could have produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("required confirmations {required} exceed max custodian count {max}")]
    ConfirmsExceedCustodians { required: u8, max: u8 },
    #[error("transaction {id}: signs received {received} does not match mask {mask:#x}")]
    SignsMismatch { id: u64, received: u8, mask: u32 },
    #[error("transaction {id}: {received} signatures received but only {required} required")]
    TooManySigns { id: u64, received: u8, required: u8 },
    #[error("duplicate custodian index {0}")]
    DuplicateCustodianIndex(u8),
    #[error("duplicate custodian key {0}")]
    DuplicateCustodianKey(Uint256),
}

impl From<InvariantError> for DecodingError {
    fn from(err: InvariantError) -> Self {
        DecodingError::Invariant(err.to_string())
    }
}

bitflags! {
    /// Outbound transfer mode flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SendFlags: u16 {
        /// Forwarding fees are paid from the wallet balance, not the value
        const PAY_FEES_SEPARATELY = 1;
        /// Errors during the action phase are ignored
        const IGNORE_ERRORS = 2;
        /// The whole remaining balance is carried
        const CARRY_ALL_BALANCE = 128;
    }
}

impl SendFlags {
    /// Flags the contract uses for a transfer
    pub fn for_transfer(all_balance: bool) -> Self {
        if all_balance {
            SendFlags::CARRY_ALL_BALANCE | SendFlags::IGNORE_ERRORS
        } else {
            SendFlags::PAY_FEES_SEPARATELY | SendFlags::IGNORE_ERRORS
        }
    }
}

/// Custodians a confirmation mask can address
pub const MAX_CUSTODIANS: u8 = u32::BITS as u8;

/// Whether custodian `index` has its bit set in `mask`
pub fn is_confirmed(mask: u32, index: u8) -> bool {
    index < MAX_CUSTODIANS && mask & (1u32 << index) != 0
}

/// Contract-wide configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub max_queued_transactions: u8,
    pub max_custodian_count: u8,
    /// Seconds a pending transaction remains confirmable
    pub expiration_time: u64,
    pub min_value: u128,
    pub required_txn_confirms: u8,
}

impl Parameters {
    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.required_txn_confirms > self.max_custodian_count {
            return Err(InvariantError::ConfirmsExceedCustodians {
                required: self.required_txn_confirms,
                max: self.max_custodian_count,
            });
        }
        Ok(())
    }
}

/// A queued multisig transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    /// One bit per custodian index that has confirmed
    pub confirmation_mask: u32,
    pub signs_required: u8,
    pub signs_received: u8,
    /// Public key of the custodian that submitted the transfer
    pub creator: Uint256,
    /// Custodian index of the creator
    pub index: u8,
    pub dest: Address,
    pub value: u128,
    pub send_flags: u16,
    pub bounce: bool,
}

impl Transaction {
    pub fn validate(&self) -> Result<(), InvariantError> {
        if u32::from(self.signs_received) != self.confirmation_mask.count_ones() {
            return Err(InvariantError::SignsMismatch {
                id: self.id,
                received: self.signs_received,
                mask: self.confirmation_mask,
            });
        }
        if self.signs_received > self.signs_required {
            return Err(InvariantError::TooManySigns {
                id: self.id,
                received: self.signs_received,
                required: self.signs_required,
            });
        }
        Ok(())
    }

    pub fn is_confirmed_by(&self, index: u8) -> bool {
        is_confirmed(self.confirmation_mask, index)
    }

    pub fn flags(&self) -> SendFlags {
        SendFlags::from_bits_retain(self.send_flags)
    }

    /// Unix time (seconds) at which the contract queued the transaction
    pub fn created_at(&self) -> u32 {
        (self.id >> 32) as u32
    }
}

/// An authorized signer of the wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custodian {
    /// Stable 0-based index
    pub index: u8,
    pub pubkey: Uint256,
}

/// Check custodians are unique by index and by key
pub fn validate_custodians(custodians: &[Custodian]) -> Result<(), InvariantError> {
    let mut indices = HashSet::new();
    let mut keys = HashSet::new();
    for custodian in custodians {
        if !indices.insert(custodian.index) {
            return Err(InvariantError::DuplicateCustodianIndex(custodian.index));
        }
        if !keys.insert(custodian.pubkey) {
            return Err(InvariantError::DuplicateCustodianKey(custodian.pubkey));
        }
    }
    Ok(())
}

/// Answer to "does this mask carry this custodian's bit"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmed: bool,
}

/// Id the contract assigned to a submitted transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSent {
    pub transaction_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            id: (1_700_000_000u64 << 32) | 1,
            confirmation_mask: 0b0101,
            signs_required: 3,
            signs_received: 2,
            creator: Uint256::from_u128(9),
            index: 0,
            dest: Address::new(0, Uint256::from_u128(1)),
            value: 1_000_000_000,
            send_flags: SendFlags::for_transfer(false).bits(),
            bounce: true,
        }
    }

    #[test]
    fn test_is_confirmed_bits() {
        assert!(is_confirmed(0b0101, 0));
        assert!(!is_confirmed(0b0101, 1));
        assert!(is_confirmed(0b0101, 2));
        assert!(is_confirmed(u32::MAX, 31));
        assert!(!is_confirmed(u32::MAX, 32));
    }

    #[test]
    fn test_send_flags() {
        assert_eq!(SendFlags::for_transfer(false).bits(), 3);
        assert_eq!(SendFlags::for_transfer(true).bits(), 130);
    }

    #[test]
    fn test_parameters_validation() {
        let mut params = Parameters {
            max_queued_transactions: 5,
            max_custodian_count: 32,
            expiration_time: 3600,
            min_value: 1_000_000,
            required_txn_confirms: 2,
        };
        assert!(params.validate().is_ok());

        params.required_txn_confirms = 33;
        assert!(matches!(
            params.validate(),
            Err(InvariantError::ConfirmsExceedCustodians { .. })
        ));
    }

    #[test]
    fn test_transaction_validation() {
        let tx = sample_transaction();
        assert!(tx.validate().is_ok());
        assert!(tx.is_confirmed_by(2));
        assert!(!tx.is_confirmed_by(1));
        assert_eq!(tx.created_at(), 1_700_000_000);
        assert_eq!(
            tx.flags(),
            SendFlags::PAY_FEES_SEPARATELY | SendFlags::IGNORE_ERRORS
        );

        let mut mismatch = sample_transaction();
        mismatch.signs_received = 1;
        assert!(matches!(
            mismatch.validate(),
            Err(InvariantError::SignsMismatch { .. })
        ));

        let mut too_many = sample_transaction();
        too_many.signs_required = 1;
        assert!(matches!(
            too_many.validate(),
            Err(InvariantError::TooManySigns { .. })
        ));
    }

    #[test]
    fn test_custodian_uniqueness() {
        let a = Custodian {
            index: 0,
            pubkey: Uint256::from_u128(1),
        };
        let b = Custodian {
            index: 1,
            pubkey: Uint256::from_u128(2),
        };
        assert!(validate_custodians(&[a.clone(), b.clone()]).is_ok());

        let same_index = Custodian { index: 0, ..b.clone() };
        assert!(matches!(
            validate_custodians(&[a.clone(), same_index]),
            Err(InvariantError::DuplicateCustodianIndex(0))
        ));

        let same_key = Custodian { index: 1, ..a.clone() };
        assert!(matches!(
            validate_custodians(&[a, same_key]),
            Err(InvariantError::DuplicateCustodianKey(_))
        ));
    }
}
