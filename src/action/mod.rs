//! Action layer
//!
//! One [`Action`] variant per multisig operation. Every variant is a
//! [`Call`] over an operation type implementing [`Method`], so the result
//! type of each action is fixed at compile time and delivered through its
//! own one-shot [`Responder`].

pub mod call;
pub mod driver;
pub mod error;
pub(crate) mod fields;
pub mod mutating;
pub mod queries;

pub use call::{channel, Call, CallState, Method, Responder, ResultHandle, Signing};
pub use driver::{execute, Delivery};
pub use error::{ActionError, ErrorClass};
pub use mutating::{ConfirmTransaction, Constructor, SubmitTransaction};
pub use queries::{
    GetCustodians, GetParameters, GetTransaction, GetTransactionIds, GetTransactions, IsConfirmed,
};

use crate::abi::{AbiValue, Codec, DecodingError, EncodedMessage, Uint256};
use crate::crypto::Signer;
use crate::ledger::{CallMode, PreparedMessage};
use crate::multisig::{Confirmation, Custodian, Parameters, Transaction, TransactionSent};

/// A contract operation together with its result channel
pub enum Action {
    Constructor(Call<Constructor>),
    SubmitTransaction(Call<SubmitTransaction>),
    ConfirmTransaction(Call<ConfirmTransaction>),
    IsConfirmed(Call<IsConfirmed>),
    GetParameters(Call<GetParameters>),
    GetTransaction(Call<GetTransaction>),
    GetTransactions(Call<GetTransactions>),
    GetTransactionIds(Call<GetTransactionIds>),
    GetCustodians(Call<GetCustodians>),
}

/// Run the same expression against whichever call the action holds
macro_rules! with_call {
    ($action:expr, $call:ident => $body:expr) => {
        match $action {
            Action::Constructor($call) => $body,
            Action::SubmitTransaction($call) => $body,
            Action::ConfirmTransaction($call) => $body,
            Action::IsConfirmed($call) => $body,
            Action::GetParameters($call) => $body,
            Action::GetTransaction($call) => $body,
            Action::GetTransactions($call) => $body,
            Action::GetTransactionIds($call) => $body,
            Action::GetCustodians($call) => $body,
        }
    };
}

impl Action {
    // ---- factories ----

    pub fn constructor(
        owners: Vec<Uint256>,
        req_confirms: u8,
        signing: Signing,
        responder: Responder<()>,
    ) -> Self {
        let method = Constructor {
            owners,
            req_confirms,
        };
        Action::Constructor(Call::signed(method, signing, responder))
    }

    pub fn submit_transaction(
        method: SubmitTransaction,
        signing: Signing,
        responder: Responder<TransactionSent>,
    ) -> Self {
        Action::SubmitTransaction(Call::signed(method, signing, responder))
    }

    pub fn confirm_transaction(
        transaction_id: u64,
        signing: Signing,
        responder: Responder<()>,
    ) -> Self {
        let method = ConfirmTransaction { transaction_id };
        Action::ConfirmTransaction(Call::signed(method, signing, responder))
    }

    pub fn is_confirmed(mask: u32, index: u8, responder: Responder<Confirmation>) -> Self {
        Action::IsConfirmed(Call::get(IsConfirmed { mask, index }, responder))
    }

    pub fn get_parameters(responder: Responder<Parameters>) -> Self {
        Action::GetParameters(Call::get(GetParameters, responder))
    }

    pub fn get_transaction(transaction_id: u64, responder: Responder<Transaction>) -> Self {
        Action::GetTransaction(Call::get(GetTransaction { transaction_id }, responder))
    }

    pub fn get_transactions(responder: Responder<Vec<Transaction>>) -> Self {
        Action::GetTransactions(Call::get(GetTransactions, responder))
    }

    pub fn get_transaction_ids(responder: Responder<Vec<u64>>) -> Self {
        Action::GetTransactionIds(Call::get(GetTransactionIds, responder))
    }

    pub fn get_custodians(responder: Responder<Vec<Custodian>>) -> Self {
        Action::GetCustodians(Call::get(GetCustodians, responder))
    }

    // ---- lifecycle ----

    /// Name of the contract function this action calls
    pub fn name(&self) -> String {
        fn name_of<M: Method>(_: &Call<M>) -> String {
            M::function().name
        }
        with_call!(self, call => name_of(call))
    }

    pub fn state(&self) -> CallState {
        with_call!(self, call => call.state())
    }

    pub fn create_message(
        &mut self,
        codec: &dyn Codec,
        signer: &dyn Signer,
    ) -> Result<EncodedMessage, ActionError> {
        with_call!(self, call => call.create_message(codec, signer))
    }

    pub fn handle_prepared(&self, prepared: &PreparedMessage) -> Result<(), ActionError> {
        with_call!(self, call => call.handle_prepared(prepared))
    }

    pub fn handle_result(self, codec: &dyn Codec, raw: Vec<AbiValue>) -> Result<(), DecodingError> {
        with_call!(self, call => call.handle_result(codec, raw))
    }

    pub fn handle_error(self, error: ActionError) {
        with_call!(self, call => call.handle_error(error))
    }

    pub fn created_at(&self) -> u64 {
        with_call!(self, call => call.created_at())
    }

    pub fn expires_at(&self) -> u32 {
        with_call!(self, call => call.expires_at())
    }

    pub fn call_mode(&self) -> CallMode {
        with_call!(self, call => call.call_mode())
    }

    pub fn is_get_method(&self) -> bool {
        with_call!(self, call => call.is_get_method())
    }
}
