//! msig-client: a typed command layer for a multisig wallet contract
//!
//! This crate provides:
//! - One typed action per wallet operation (deploy, submit, confirm and
//!   the read-only get-methods), each delivering its result exactly once
//! - ECDSA message signing (secp256k1) with call expiration windows
//! - A JSON codec for the wallet's fixed function interface
//! - The wallet's observable state: parameters, queued transactions,
//!   custodians and confirmation masks
//! - An in-process ledger that runs the wallet contract, with JSON
//!   persistence
//!
//! # Example
//!
//! ```ignore
//! use msig_client::abi::JsonCodec;
//! use msig_client::action::{channel, execute, Action, Signing};
//! use msig_client::crypto::{KeyPair, Secp256k1Signer};
//! use msig_client::ledger::{LedgerConfig, LocalLedger};
//!
//! let ledger = LocalLedger::new(LedgerConfig::default());
//! let owner = KeyPair::generate();
//!
//! // Deploy a wallet with a single custodian
//! let (tx, rx) = channel();
//! let signing = Signing::with_ttl(owner.private_key(), 60);
//! let deploy = Action::constructor(vec![owner.custodian_key()], 1, signing, tx);
//! execute(deploy, &JsonCodec, &Secp256k1Signer, &ledger).await;
//! rx.recv().await?;
//!
//! // Query its custodians
//! let (tx, rx) = channel();
//! execute(Action::get_custodians(tx), &JsonCodec, &Secp256k1Signer, &ledger).await;
//! println!("{:?}", rx.recv().await?);
//! ```

pub mod abi;
pub mod action;
pub mod cli;
pub mod crypto;
pub mod ledger;
pub mod multisig;

// Re-export commonly used types
pub use abi::{AbiValue, Address, Codec, JsonCodec, Uint256};
pub use action::{execute, Action, ActionError, ErrorClass, Signing};
pub use crypto::{KeyPair, Secp256k1Signer, Signer};
pub use ledger::{CallMode, DispatchError, Dispatcher, LocalLedger};
pub use multisig::{Confirmation, Custodian, Parameters, Transaction, TransactionSent};
