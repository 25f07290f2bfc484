//! Ledger side of the action layer
//!
//! This module provides:
//! - The [`Dispatcher`] boundary actions are executed through
//! - [`LocalLedger`], an in-process wallet contract implementing it
//! - JSON persistence of the local ledger state

pub mod contract;
pub mod dispatcher;
pub mod local;
pub mod storage;

pub use contract::{ContractError, ContractState, LedgerConfig, Transfer};
pub use dispatcher::{
    BoxError, CallMode, DispatchError, Dispatcher, PreparedHook, PreparedMessage,
};
pub use local::{LedgerState, LocalLedger};
pub use storage::{LedgerStorage, StorageConfig, StorageError};
