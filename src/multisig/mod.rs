//! Multisig wallet domain model
//!
//! Value types describing the wallet contract's observable state:
//! parameters, queued transactions, custodians and confirmations.

pub mod entities;

pub use entities::{
    is_confirmed, validate_custodians, Confirmation, Custodian, InvariantError, Parameters,
    SendFlags, Transaction, TransactionSent, MAX_CUSTODIANS,
};
