//! Fixed interface of the multisig wallet contract

use super::function::Function;
use super::value::{Param, ParamType};

pub const CONSTRUCTOR: &str = "constructor";
pub const SUBMIT_TRANSACTION: &str = "submitTransaction";
pub const CONFIRM_TRANSACTION: &str = "confirmTransaction";
pub const IS_CONFIRMED: &str = "isConfirmed";
pub const GET_PARAMETERS: &str = "getParameters";
pub const GET_TRANSACTION: &str = "getTransaction";
pub const GET_TRANSACTIONS: &str = "getTransactions";
pub const GET_TRANSACTION_IDS: &str = "getTransactionIds";
pub const GET_CUSTODIANS: &str = "getCustodians";

fn uint(bits: u16) -> ParamType {
    ParamType::Uint(bits)
}

/// Layout of a queued transaction as returned by the contract
pub fn transaction_type() -> ParamType {
    ParamType::Tuple(vec![
        Param::new("id", uint(64)),
        Param::new("confirmationsMask", uint(32)),
        Param::new("signsRequired", uint(8)),
        Param::new("signsReceived", uint(8)),
        Param::new("creator", uint(256)),
        Param::new("index", uint(8)),
        Param::new("dest", ParamType::Address),
        Param::new("value", uint(128)),
        Param::new("sendFlags", uint(16)),
        Param::new("bounce", ParamType::Bool),
    ])
}

/// Layout of a custodian record as returned by the contract
pub fn custodian_type() -> ParamType {
    ParamType::Tuple(vec![
        Param::new("index", uint(8)),
        Param::new("pubkey", uint(256)),
    ])
}

pub fn constructor() -> Function {
    Function::new(
        CONSTRUCTOR,
        vec![
            Param::new("owners", ParamType::Array(Box::new(uint(256)))),
            Param::new("reqConfirms", uint(8)),
        ],
        vec![],
        true,
    )
}

pub fn submit_transaction() -> Function {
    Function::new(
        SUBMIT_TRANSACTION,
        vec![
            Param::new("dest", ParamType::Address),
            Param::new("value", uint(128)),
            Param::new("bounce", ParamType::Bool),
            Param::new("allBalance", ParamType::Bool),
            Param::new("payload", ParamType::Cell),
        ],
        vec![Param::new("transId", uint(64))],
        true,
    )
}

pub fn confirm_transaction() -> Function {
    Function::new(
        CONFIRM_TRANSACTION,
        vec![Param::new("transactionId", uint(64))],
        vec![],
        true,
    )
}

pub fn is_confirmed() -> Function {
    Function::new(
        IS_CONFIRMED,
        vec![
            Param::new("mask", uint(32)),
            Param::new("index", uint(8)),
        ],
        vec![Param::new("confirmed", ParamType::Bool)],
        false,
    )
}

pub fn get_parameters() -> Function {
    Function::new(
        GET_PARAMETERS,
        vec![],
        vec![
            Param::new("maxQueuedTransactions", uint(8)),
            Param::new("maxCustodianCount", uint(8)),
            Param::new("expirationTime", uint(64)),
            Param::new("minValue", uint(128)),
            Param::new("requiredTxnConfirms", uint(8)),
        ],
        false,
    )
}

pub fn get_transaction() -> Function {
    Function::new(
        GET_TRANSACTION,
        vec![Param::new("transactionId", uint(64))],
        vec![Param::new("trans", transaction_type())],
        false,
    )
}

pub fn get_transactions() -> Function {
    Function::new(
        GET_TRANSACTIONS,
        vec![],
        vec![Param::new(
            "transactions",
            ParamType::Array(Box::new(transaction_type())),
        )],
        false,
    )
}

pub fn get_transaction_ids() -> Function {
    Function::new(
        GET_TRANSACTION_IDS,
        vec![],
        vec![Param::new("ids", ParamType::Array(Box::new(uint(64))))],
        false,
    )
}

pub fn get_custodians() -> Function {
    Function::new(
        GET_CUSTODIANS,
        vec![],
        vec![Param::new(
            "custodians",
            ParamType::Array(Box::new(custodian_type())),
        )],
        false,
    )
}

/// Every function of the contract interface
pub fn functions() -> Vec<Function> {
    vec![
        constructor(),
        submit_transaction(),
        confirm_transaction(),
        is_confirmed(),
        get_parameters(),
        get_transaction(),
        get_transactions(),
        get_transaction_ids(),
        get_custodians(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_selectors_are_unique() {
        let selectors: HashSet<u32> = functions().iter().map(|f| f.selector()).collect();
        assert_eq!(selectors.len(), functions().len());
    }

    #[test]
    fn test_only_mutating_functions_are_signed() {
        let signed: Vec<String> = functions()
            .into_iter()
            .filter(|f| f.signed)
            .map(|f| f.name)
            .collect();
        assert_eq!(
            signed,
            vec![CONSTRUCTOR, SUBMIT_TRANSACTION, CONFIRM_TRANSACTION]
        );
    }

    #[test]
    fn test_submit_signature() {
        assert_eq!(
            submit_transaction().signature(),
            "submitTransaction(address,uint128,bool,bool,cell)(uint64)v2"
        );
    }
}
