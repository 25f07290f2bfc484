//! Signed operations that change contract state

use bytes::Bytes;

use super::call::Method;
use super::fields::Fields;
use crate::abi::{multisig, AbiValue, Address, DecodingError, Function, Uint256};
use crate::multisig::TransactionSent;

/// Deploys the wallet with its initial custodian set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constructor {
    pub owners: Vec<Uint256>,
    pub req_confirms: u8,
}

impl Method for Constructor {
    type Output = ();

    fn function() -> Function {
        multisig::constructor()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![
            AbiValue::Array(self.owners.iter().copied().map(AbiValue::Uint256).collect()),
            AbiValue::uint(8, self.req_confirms),
        ]
    }

    fn decode(values: Vec<AbiValue>) -> Result<(), DecodingError> {
        Fields::new(values, 0).map(|_| ())
    }
}

/// Proposes a transfer from the wallet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitTransaction {
    pub dest: Address,
    pub value: u128,
    pub bounce: bool,
    /// Send the entire wallet balance instead of `value`
    pub all_balance: bool,
    /// Opaque serialized message body forwarded with the transfer
    pub payload: Bytes,
}

impl Method for SubmitTransaction {
    type Output = TransactionSent;

    fn function() -> Function {
        multisig::submit_transaction()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![
            AbiValue::Address(self.dest),
            AbiValue::uint(128, self.value),
            AbiValue::Bool(self.bounce),
            AbiValue::Bool(self.all_balance),
            AbiValue::Cell(self.payload.to_vec()),
        ]
    }

    fn decode(values: Vec<AbiValue>) -> Result<TransactionSent, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        Ok(TransactionSent {
            transaction_id: f.uint("transId")?,
        })
    }
}

/// Adds the caller's confirmation to a queued transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmTransaction {
    pub transaction_id: u64,
}

impl Method for ConfirmTransaction {
    type Output = ();

    fn function() -> Function {
        multisig::confirm_transaction()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![AbiValue::uint(64, self.transaction_id)]
    }

    fn decode(values: Vec<AbiValue>) -> Result<(), DecodingError> {
        Fields::new(values, 0).map(|_| ())
    }
}
