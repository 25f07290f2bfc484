//! In-process multisig wallet contract
//!
//! Executes decoded calls against the wallet state: deploy, submit and
//! confirm transfers, and answer the get-methods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::dispatcher::DispatchError;
use crate::abi::{multisig, AbiValue, Address, DecodingError, Uint256};
use crate::action::fields::Fields;
use crate::multisig::{
    is_confirmed, Custodian, Parameters, SendFlags, Transaction, MAX_CUSTODIANS,
};

/// Contract failures, each with the exit code the wallet reports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Sender is not a custodian")]
    NotCustodian,
    #[error("Wallet is already deployed")]
    AlreadyDeployed,
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(u64),
    #[error("Custodian {0} already confirmed this transaction")]
    AlreadyConfirmed(u8),
    #[error("Wallet is not deployed")]
    NotDeployed,
    #[error("Value {value} is below the minimum {min}")]
    ValueTooLow { value: u128, min: u128 },
    #[error("Custodian {0} has too many queued transactions")]
    QueueFull(u8),
    #[error("Invalid number of custodians: {0}")]
    InvalidCustodianCount(usize),
    #[error("Invalid required confirmations: {required} of {custodians}")]
    InvalidRequiredConfirms { required: u8, custodians: usize },
    #[error("Signed call without a sender key")]
    MissingSender,
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ContractError {
    pub fn code(&self) -> u32 {
        match self {
            ContractError::NotCustodian => 100,
            ContractError::AlreadyDeployed => 101,
            ContractError::TransactionNotFound(_) => 102,
            ContractError::AlreadyConfirmed(_) => 103,
            ContractError::NotDeployed => 104,
            ContractError::ValueTooLow { .. } => 107,
            ContractError::QueueFull(_) => 113,
            ContractError::InvalidCustodianCount(_) => 117,
            ContractError::InvalidRequiredConfirms { .. } => 118,
            ContractError::MissingSender => 40,
            ContractError::UnknownFunction(_) => 60,
            ContractError::InvalidArguments(_) => 61,
        }
    }
}

impl From<DecodingError> for ContractError {
    fn from(err: DecodingError) -> Self {
        ContractError::InvalidArguments(err.to_string())
    }
}

impl From<ContractError> for DispatchError {
    fn from(err: ContractError) -> Self {
        DispatchError::ContractFailed {
            code: err.code(),
            reason: err.to_string(),
        }
    }
}

/// Wallet parameters fixed at deploy time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub max_queued_transactions: u8,
    pub max_custodian_count: u8,
    /// Seconds a pending transaction stays confirmable
    pub expiration_time: u64,
    pub min_value: u128,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_queued_transactions: 5,
            max_custodian_count: 32,
            expiration_time: 3600,
            min_value: 1_000_000,
        }
    }
}

/// A transfer the wallet has carried out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Id of the queued transaction, 0 when sent without confirmations
    pub transaction_id: u64,
    pub dest: Address,
    pub value: u128,
    pub send_flags: u16,
    pub bounce: bool,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Persistent state of one wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractState {
    /// Set once the constructor has run
    pub parameters: Option<Parameters>,
    pub custodians: Vec<Custodian>,
    /// Pending transactions by id
    pub transactions: BTreeMap<u64, Transaction>,
    /// Message bodies of pending transactions
    #[serde(default)]
    pub payloads: BTreeMap<u64, Vec<u8>>,
    pub last_transaction_id: u64,
    /// Executed transfers, oldest first
    pub transfers: Vec<Transfer>,
}

impl ContractState {
    pub fn is_deployed(&self) -> bool {
        self.parameters.is_some()
    }

    /// Run one decoded call. `sender` is the verified custodian key of a
    /// signed call.
    pub fn execute(
        &mut self,
        config: &LedgerConfig,
        function: &str,
        args: Vec<AbiValue>,
        sender: Option<Uint256>,
        now: u32,
    ) -> Result<Vec<AbiValue>, ContractError> {
        if function == multisig::CONSTRUCTOR {
            let mut f = Fields::new(args, 2)?;
            let owners = f
                .array("owners")?
                .into_iter()
                .map(|owner| {
                    owner.as_uint256().ok_or_else(|| {
                        ContractError::InvalidArguments("owners must be uint256".to_string())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let req_confirms = f.uint("reqConfirms")?;
            sender.ok_or(ContractError::MissingSender)?;
            self.deploy(config, owners, req_confirms)?;
            return Ok(vec![]);
        }

        let parameters = self.parameters.clone().ok_or(ContractError::NotDeployed)?;
        self.purge_expired(parameters.expiration_time, now);

        match function {
            multisig::SUBMIT_TRANSACTION => {
                let mut f = Fields::new(args, 5)?;
                let dest = f.address("dest")?;
                let value = f.uint("value")?;
                let bounce = f.bool("bounce")?;
                let all_balance = f.bool("allBalance")?;
                let payload = f.value()?.into_cell().ok_or_else(|| {
                    ContractError::InvalidArguments("payload must be a cell".to_string())
                })?;
                let sender = self.custodian_index(sender)?;
                let id = self.submit(
                    &parameters,
                    sender,
                    dest,
                    value,
                    bounce,
                    all_balance,
                    payload,
                    now,
                )?;
                Ok(vec![AbiValue::uint(64, id)])
            }
            multisig::CONFIRM_TRANSACTION => {
                let id = Fields::new(args, 1)?.uint("transactionId")?;
                let (index, _) = self.custodian_index(sender)?;
                self.confirm(index, id)?;
                Ok(vec![])
            }
            multisig::IS_CONFIRMED => {
                let mut f = Fields::new(args, 2)?;
                let mask = f.uint("mask")?;
                let index = f.uint("index")?;
                Ok(vec![AbiValue::Bool(is_confirmed(mask, index))])
            }
            multisig::GET_PARAMETERS => Ok(vec![
                AbiValue::uint(8, parameters.max_queued_transactions),
                AbiValue::uint(8, parameters.max_custodian_count),
                AbiValue::uint(64, parameters.expiration_time),
                AbiValue::uint(128, parameters.min_value),
                AbiValue::uint(8, parameters.required_txn_confirms),
            ]),
            multisig::GET_TRANSACTION => {
                let id = Fields::new(args, 1)?.uint("transactionId")?;
                let transaction = self
                    .transactions
                    .get(&id)
                    .ok_or(ContractError::TransactionNotFound(id))?;
                Ok(vec![transaction_value(transaction)])
            }
            multisig::GET_TRANSACTIONS => Ok(vec![AbiValue::Array(
                self.transactions.values().map(transaction_value).collect(),
            )]),
            multisig::GET_TRANSACTION_IDS => Ok(vec![AbiValue::Array(
                self.transactions
                    .keys()
                    .map(|id| AbiValue::uint(64, *id))
                    .collect(),
            )]),
            multisig::GET_CUSTODIANS => Ok(vec![AbiValue::Array(
                self.custodians.iter().map(custodian_value).collect(),
            )]),
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }

    fn deploy(
        &mut self,
        config: &LedgerConfig,
        owners: Vec<Uint256>,
        req_confirms: u8,
    ) -> Result<(), ContractError> {
        if self.is_deployed() {
            return Err(ContractError::AlreadyDeployed);
        }
        // Every custodian needs a bit in the confirmation mask
        let max_custodians = config.max_custodian_count.min(MAX_CUSTODIANS);
        if owners.is_empty() || owners.len() > usize::from(max_custodians) {
            return Err(ContractError::InvalidCustodianCount(owners.len()));
        }
        if req_confirms == 0 || usize::from(req_confirms) > owners.len() {
            return Err(ContractError::InvalidRequiredConfirms {
                required: req_confirms,
                custodians: owners.len(),
            });
        }

        let mut custodians: Vec<Custodian> = Vec::with_capacity(owners.len());
        for pubkey in owners {
            if custodians.iter().any(|c| c.pubkey == pubkey) {
                return Err(ContractError::InvalidArguments(format!(
                    "duplicate custodian {}",
                    pubkey
                )));
            }
            custodians.push(Custodian {
                index: custodians.len() as u8,
                pubkey,
            });
        }

        log::info!(
            "Wallet deployed with {} custodians, {} confirmations required",
            custodians.len(),
            req_confirms
        );
        self.custodians = custodians;
        self.parameters = Some(Parameters {
            max_queued_transactions: config.max_queued_transactions,
            max_custodian_count: max_custodians,
            expiration_time: config.expiration_time,
            min_value: config.min_value,
            required_txn_confirms: req_confirms,
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn submit(
        &mut self,
        parameters: &Parameters,
        (index, creator): (u8, Uint256),
        dest: Address,
        value: u128,
        bounce: bool,
        all_balance: bool,
        payload: Vec<u8>,
        now: u32,
    ) -> Result<u64, ContractError> {
        if value < parameters.min_value {
            return Err(ContractError::ValueTooLow {
                value,
                min: parameters.min_value,
            });
        }

        let queued = self
            .transactions
            .values()
            .filter(|t| t.index == index)
            .count();
        if queued >= usize::from(parameters.max_queued_transactions) {
            return Err(ContractError::QueueFull(index));
        }

        let send_flags = SendFlags::for_transfer(all_balance).bits();

        if parameters.required_txn_confirms <= 1 {
            self.transfers.push(Transfer {
                transaction_id: 0,
                dest,
                value,
                send_flags,
                bounce,
                payload,
            });
            log::info!("Transfer of {} to {} sent immediately", value, dest);
            return Ok(0);
        }

        let id = self.next_transaction_id(now);
        self.transactions.insert(
            id,
            Transaction {
                id,
                confirmation_mask: 1u32 << index,
                signs_required: parameters.required_txn_confirms,
                signs_received: 1,
                creator,
                index,
                dest,
                value,
                send_flags,
                bounce,
            },
        );
        if !payload.is_empty() {
            self.payloads.insert(id, payload);
        }
        log::info!("Transaction {} queued by custodian {}", id, index);
        Ok(id)
    }

    fn confirm(&mut self, index: u8, id: u64) -> Result<(), ContractError> {
        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or(ContractError::TransactionNotFound(id))?;
        if transaction.is_confirmed_by(index) {
            return Err(ContractError::AlreadyConfirmed(index));
        }

        transaction.confirmation_mask |= 1u32 << index;
        transaction.signs_received += 1;
        log::info!(
            "Transaction {} confirmed by custodian {} ({}/{})",
            id,
            index,
            transaction.signs_received,
            transaction.signs_required
        );

        if transaction.signs_received >= transaction.signs_required {
            if let Some(done) = self.transactions.remove(&id) {
                self.transfers.push(Transfer {
                    transaction_id: done.id,
                    dest: done.dest,
                    value: done.value,
                    send_flags: done.send_flags,
                    bounce: done.bounce,
                    payload: self.payloads.remove(&id).unwrap_or_default(),
                });
                log::info!("Transaction {} executed", id);
            }
        }
        Ok(())
    }

    fn custodian_index(&self, sender: Option<Uint256>) -> Result<(u8, Uint256), ContractError> {
        let key = sender.ok_or(ContractError::MissingSender)?;
        self.custodians
            .iter()
            .find(|c| c.pubkey == key)
            .map(|c| (c.index, key))
            .ok_or(ContractError::NotCustodian)
    }

    /// Ids are `(unix_secs << 32) | sequence`, strictly increasing
    fn next_transaction_id(&mut self, now: u32) -> u64 {
        let id = (u64::from(now) << 32).max(self.last_transaction_id + 1);
        self.last_transaction_id = id;
        id
    }

    fn purge_expired(&mut self, expiration_time: u64, now: u32) {
        let before = self.transactions.len();
        self.transactions
            .retain(|_, t| u64::from(t.created_at()) + expiration_time >= u64::from(now));
        let transactions = &self.transactions;
        self.payloads.retain(|id, _| transactions.contains_key(id));
        let purged = before - self.transactions.len();
        if purged > 0 {
            log::debug!("Purged {} expired transactions", purged);
        }
    }
}

fn transaction_value(t: &Transaction) -> AbiValue {
    AbiValue::Tuple(vec![
        AbiValue::uint(64, t.id),
        AbiValue::uint(32, t.confirmation_mask),
        AbiValue::uint(8, t.signs_required),
        AbiValue::uint(8, t.signs_received),
        AbiValue::Uint256(t.creator),
        AbiValue::uint(8, t.index),
        AbiValue::Address(t.dest),
        AbiValue::uint(128, t.value),
        AbiValue::uint(16, t.send_flags),
        AbiValue::Bool(t.bounce),
    ])
}

fn custodian_value(c: &Custodian) -> AbiValue {
    AbiValue::Tuple(vec![AbiValue::uint(8, c.index), AbiValue::Uint256(c.pubkey)])
}
