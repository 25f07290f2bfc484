//! Read-only get-methods

use super::call::Method;
use super::fields::{self, Fields};
use crate::abi::{multisig, AbiValue, DecodingError, Function};
use crate::multisig::{validate_custodians, Confirmation, Custodian, Parameters, Transaction};

/// Tests one custodian's bit in a confirmation mask
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsConfirmed {
    pub mask: u32,
    pub index: u8,
}

impl Method for IsConfirmed {
    type Output = Confirmation;

    fn function() -> Function {
        multisig::is_confirmed()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![AbiValue::uint(32, self.mask), AbiValue::uint(8, self.index)]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Confirmation, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        Ok(Confirmation {
            confirmed: f.bool("confirmed")?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetParameters;

impl Method for GetParameters {
    type Output = Parameters;

    fn function() -> Function {
        multisig::get_parameters()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Parameters, DecodingError> {
        let mut f = Fields::new(values, 5)?;
        let parameters = Parameters {
            max_queued_transactions: f.uint("maxQueuedTransactions")?,
            max_custodian_count: f.uint("maxCustodianCount")?,
            expiration_time: f.uint("expirationTime")?,
            min_value: f.uint("minValue")?,
            required_txn_confirms: f.uint("requiredTxnConfirms")?,
        };
        parameters.validate()?;
        Ok(parameters)
    }
}

/// Fetches one queued transaction by id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GetTransaction {
    pub transaction_id: u64,
}

impl Method for GetTransaction {
    type Output = Transaction;

    fn function() -> Function {
        multisig::get_transaction()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![AbiValue::uint(64, self.transaction_id)]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Transaction, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        fields::transaction(f.value()?)
    }
}

/// All queued transactions, in contract order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetTransactions;

impl Method for GetTransactions {
    type Output = Vec<Transaction>;

    fn function() -> Function {
        multisig::get_transactions()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Vec<Transaction>, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        f.array("transactions")?
            .into_iter()
            .map(fields::transaction)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetTransactionIds;

impl Method for GetTransactionIds {
    type Output = Vec<u64>;

    fn function() -> Function {
        multisig::get_transaction_ids()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Vec<u64>, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        let ids = f.array("ids")?;
        let count = ids.len();
        let mut items = Fields::new(ids, count)?;
        (0..count).map(|_| items.uint("ids")).collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetCustodians;

impl Method for GetCustodians {
    type Output = Vec<Custodian>;

    fn function() -> Function {
        multisig::get_custodians()
    }

    fn args(&self) -> Vec<AbiValue> {
        vec![]
    }

    fn decode(values: Vec<AbiValue>) -> Result<Vec<Custodian>, DecodingError> {
        let mut f = Fields::new(values, 1)?;
        let custodians = f
            .array("custodians")?
            .into_iter()
            .map(fields::custodian)
            .collect::<Result<Vec<_>, _>>()?;
        validate_custodians(&custodians)?;
        Ok(custodians)
    }
}
