//! Positional readers over returned values

use std::vec::IntoIter;

use crate::abi::{AbiValue, Address, DecodingError, Uint256};
use crate::multisig::{Custodian, Transaction};

/// Reads a fixed number of values in order, naming each one for errors
pub(crate) struct Fields {
    items: IntoIter<AbiValue>,
}

fn mismatch(param: &str, expected: &str) -> DecodingError {
    DecodingError::TypeMismatch {
        param: param.to_string(),
        expected: expected.to_string(),
    }
}

impl Fields {
    pub fn new(items: Vec<AbiValue>, expected: usize) -> Result<Self, DecodingError> {
        if items.len() != expected {
            return Err(DecodingError::ArityMismatch {
                expected,
                got: items.len(),
            });
        }
        Ok(Self {
            items: items.into_iter(),
        })
    }

    /// Open a tuple value as its own field reader
    pub fn tuple(value: AbiValue, param: &str, expected: usize) -> Result<Self, DecodingError> {
        let items = value.into_tuple().ok_or_else(|| mismatch(param, "tuple"))?;
        Self::new(items, expected)
    }

    fn next(&mut self) -> Result<AbiValue, DecodingError> {
        // Length was checked in `new`
        self.items.next().ok_or(DecodingError::ArityMismatch {
            expected: 1,
            got: 0,
        })
    }

    pub fn value(&mut self) -> Result<AbiValue, DecodingError> {
        self.next()
    }

    pub fn uint<T: TryFrom<u128>>(&mut self, param: &str) -> Result<T, DecodingError> {
        let raw = self
            .next()?
            .as_uint()
            .ok_or_else(|| mismatch(param, "uint"))?;
        T::try_from(raw).map_err(|_| DecodingError::OutOfRange {
            param: param.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    pub fn uint256(&mut self, param: &str) -> Result<Uint256, DecodingError> {
        self.next()?
            .as_uint256()
            .ok_or_else(|| mismatch(param, "uint256"))
    }

    pub fn bool(&mut self, param: &str) -> Result<bool, DecodingError> {
        self.next()?
            .as_bool()
            .ok_or_else(|| mismatch(param, "bool"))
    }

    pub fn address(&mut self, param: &str) -> Result<Address, DecodingError> {
        self.next()?
            .as_address()
            .ok_or_else(|| mismatch(param, "address"))
    }

    pub fn array(&mut self, param: &str) -> Result<Vec<AbiValue>, DecodingError> {
        self.next()?
            .into_array()
            .ok_or_else(|| mismatch(param, "array"))
    }
}

/// Read a transaction tuple and check its invariants
pub(crate) fn transaction(value: AbiValue) -> Result<Transaction, DecodingError> {
    let mut f = Fields::tuple(value, "trans", 10)?;
    let transaction = Transaction {
        id: f.uint("id")?,
        confirmation_mask: f.uint("confirmationsMask")?,
        signs_required: f.uint("signsRequired")?,
        signs_received: f.uint("signsReceived")?,
        creator: f.uint256("creator")?,
        index: f.uint("index")?,
        dest: f.address("dest")?,
        value: f.uint("value")?,
        send_flags: f.uint("sendFlags")?,
        bounce: f.bool("bounce")?,
    };
    transaction.validate()?;
    Ok(transaction)
}

/// Read a custodian tuple
pub(crate) fn custodian(value: AbiValue) -> Result<Custodian, DecodingError> {
    let mut f = Fields::tuple(value, "custodian", 2)?;
    Ok(Custodian {
        index: f.uint("index")?,
        pubkey: f.uint256("pubkey")?,
    })
}
