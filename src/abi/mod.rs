//! Codec boundary between typed Rust values and contract call bodies
//!
//! # Overview
//!
//! - [`ParamType`] / [`Param`] describe function slots
//! - [`AbiValue`] carries a value for a slot
//! - [`Function`] is a name plus input and output schemas
//! - [`Codec`] encodes argument lists and validates returned values
//! - [`multisig`] holds the fixed interface of the wallet contract

pub mod codec;
pub mod function;
pub mod multisig;
pub mod value;

pub use codec::{Codec, DecodedCall, DecodingError, EncodingError, JsonCodec};
pub use function::{EncodedMessage, Function, Header};
pub use value::{AbiValue, Address, Param, ParamType, ParseValueError, TypeIssue, Uint256};
