//! Typed values crossing the codec boundary
//!
//! [`ParamType`] describes a slot in a function signature; [`AbiValue`] is
//! a concrete value for such a slot.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing textual value representations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseValueError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Expected 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

// =============================================================================
// Uint256
// =============================================================================

/// Big-endian 256-bit unsigned integer (public keys, account ids)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uint256(pub [u8; 32]);

impl Uint256 {
    pub const ZERO: Uint256 = Uint256([0u8; 32]);

    pub fn from_hex(s: &str) -> Result<Self, ParseValueError> {
        let s = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(s).map_err(|_| ParseValueError::InvalidHex(s.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseValueError::InvalidLength(len))?;
        Ok(Self(bytes))
    }

    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_hex())
    }
}

impl FromStr for Uint256 {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Address
// =============================================================================

/// Standard account address: workchain id plus 256-bit account id
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address {
    pub workchain: i8,
    pub account: Uint256,
}

impl Address {
    pub fn new(workchain: i8, account: Uint256) -> Self {
        Self { workchain, account }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, self.account.to_hex())
    }
}

impl FromStr for Address {
    type Err = ParseValueError;

    /// Parses the raw `workchain:hex` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (workchain, account) = s
            .split_once(':')
            .ok_or_else(|| ParseValueError::InvalidAddress(s.to_string()))?;
        let workchain = workchain
            .parse::<i8>()
            .map_err(|_| ParseValueError::InvalidAddress(s.to_string()))?;
        let account = Uint256::from_hex(account)?;
        Ok(Self { workchain, account })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Parameter schema
// =============================================================================

/// Type of a function input or output slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// Unsigned integer of the given bit width (8..=256)
    Uint(u16),
    Bool,
    Address,
    /// Opaque serialized cell
    Cell,
    Array(Box<ParamType>),
    Tuple(Vec<Param>),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Address => f.write_str("address"),
            ParamType::Cell => f.write_str("cell"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::Tuple(params) => {
                let inner: Vec<String> = params.iter().map(|p| p.kind.to_string()).collect();
                write!(f, "({})", inner.join(","))
            }
        }
    }
}

/// Why a value does not fit a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeIssue {
    /// Wrong variant, width, or element count
    Shape,
    /// Right shape, but the number does not fit the declared width
    Range,
}

impl ParamType {
    /// Check that `value` can occupy a slot of this type
    pub fn check(&self, value: &AbiValue) -> Result<(), TypeIssue> {
        match (self, value) {
            (ParamType::Uint(256), AbiValue::Uint256(_)) => Ok(()),
            (ParamType::Uint(bits), AbiValue::Uint { size, value }) => {
                if size != bits || *bits > 128 {
                    Err(TypeIssue::Shape)
                } else if *bits < 128 && (*value >> *bits) != 0 {
                    Err(TypeIssue::Range)
                } else {
                    Ok(())
                }
            }
            (ParamType::Bool, AbiValue::Bool(_))
            | (ParamType::Address, AbiValue::Address(_))
            | (ParamType::Cell, AbiValue::Cell(_)) => Ok(()),
            (ParamType::Array(inner), AbiValue::Array(items)) => {
                items.iter().try_for_each(|item| inner.check(item))
            }
            (ParamType::Tuple(params), AbiValue::Tuple(items)) => {
                if params.len() != items.len() {
                    return Err(TypeIssue::Shape);
                }
                params
                    .iter()
                    .zip(items)
                    .try_for_each(|(param, item)| param.kind.check(item))
            }
            _ => Err(TypeIssue::Shape),
        }
    }
}

/// Named slot in a function signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
}

impl Param {
    pub fn new(name: &str, kind: ParamType) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// Concrete value for a [`ParamType`] slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiValue {
    /// Unsigned integer up to 128 bits wide
    Uint { size: u16, value: u128 },
    Uint256(Uint256),
    Bool(bool),
    Address(Address),
    Cell(Vec<u8>),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    pub fn uint(size: u16, value: impl Into<u128>) -> Self {
        AbiValue::Uint {
            size,
            value: value.into(),
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            AbiValue::Uint { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_uint256(&self) -> Option<Uint256> {
        match self {
            AbiValue::Uint256(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_cell(self) -> Option<Vec<u8>> {
        match self {
            AbiValue::Cell(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<AbiValue>> {
        match self {
            AbiValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<AbiValue>> {
        match self {
            AbiValue::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_range_check() {
        let kind = ParamType::Uint(8);
        assert_eq!(kind.check(&AbiValue::uint(8, 255u8)), Ok(()));
        assert_eq!(
            kind.check(&AbiValue::uint(8, 256u16)),
            Err(TypeIssue::Range)
        );
        assert_eq!(kind.check(&AbiValue::uint(16, 1u8)), Err(TypeIssue::Shape));
        assert_eq!(kind.check(&AbiValue::Bool(true)), Err(TypeIssue::Shape));
    }

    #[test]
    fn test_uint256_slot() {
        let kind = ParamType::Uint(256);
        assert_eq!(kind.check(&AbiValue::Uint256(Uint256::ZERO)), Ok(()));
        assert_eq!(
            kind.check(&AbiValue::uint(128, 1u8)),
            Err(TypeIssue::Shape)
        );
    }

    #[test]
    fn test_nested_check() {
        let kind = ParamType::Array(Box::new(ParamType::Tuple(vec![
            Param::new("index", ParamType::Uint(8)),
            Param::new("pubkey", ParamType::Uint(256)),
        ])));

        let good = AbiValue::Array(vec![AbiValue::Tuple(vec![
            AbiValue::uint(8, 0u8),
            AbiValue::Uint256(Uint256::from_u128(7)),
        ])]);
        assert_eq!(kind.check(&good), Ok(()));

        let short_tuple = AbiValue::Array(vec![AbiValue::Tuple(vec![AbiValue::uint(8, 0u8)])]);
        assert_eq!(kind.check(&short_tuple), Err(TypeIssue::Shape));

        assert_eq!(kind.check(&AbiValue::Array(vec![])), Ok(()));
    }

    #[test]
    fn test_type_signature_text() {
        let kind = ParamType::Array(Box::new(ParamType::Tuple(vec![
            Param::new("index", ParamType::Uint(8)),
            Param::new("pubkey", ParamType::Uint(256)),
        ])));
        assert_eq!(kind.to_string(), "(uint8,uint256)[]");
    }

    #[test]
    fn test_address_parsing() {
        let raw = format!("0:{}", "11".repeat(32));
        let address: Address = raw.parse().unwrap();
        assert_eq!(address.workchain, 0);
        assert_eq!(address.to_string(), raw);

        let masterchain: Address = format!("-1:{}", "ab".repeat(32)).parse().unwrap();
        assert_eq!(masterchain.workchain, -1);

        assert!("0:abcd".parse::<Address>().is_err());
        assert!("no-colon".parse::<Address>().is_err());
    }

    #[test]
    fn test_uint256_serde_is_hex() {
        let value = Uint256::from_u128(1);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"0x{}01\"", "00".repeat(31)));
        let back: Uint256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
