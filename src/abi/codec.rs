//! Codec boundary
//!
//! Turns typed argument lists into call bodies and validates returned
//! values against a function's output schema.
//!
//! [`JsonCodec`] frames a body as the 4-byte function selector followed by
//! a JSON document holding the header and arguments.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::function::{Function, Header};
use super::value::{AbiValue, Param, TypeIssue};

/// Arguments could not be mapped onto a function signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{function}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("{function}: argument `{param}` is not a {expected}")]
    TypeMismatch {
        function: String,
        param: String,
        expected: String,
    },
    #[error("{function}: argument `{param}` out of range for {expected}")]
    OutOfRange {
        function: String,
        param: String,
        expected: String,
    },
    #[error("{0}: header presence does not match the function")]
    HeaderMismatch(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Returned values do not match the expected schema or entity rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("Expected {expected} output values, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Output `{param}` is not a {expected}")]
    TypeMismatch { param: String, expected: String },
    #[error("Output `{param}` out of range for {expected}")]
    OutOfRange { param: String, expected: String },
    #[error("Invariant violated: {0}")]
    Invariant(String),
    #[error("Malformed message body: {0}")]
    MalformedBody(String),
    #[error("Unknown function selector: {0:#010x}")]
    UnknownFunction(u32),
}

/// Encode/decode service between typed values and call bodies
pub trait Codec: Send + Sync {
    /// Encode a call to `function` with the given header and arguments
    fn encode(
        &self,
        function: &Function,
        header: Option<&Header>,
        args: Vec<AbiValue>,
    ) -> Result<Bytes, EncodingError>;

    /// Validate raw returned values against an output schema
    fn decode(&self, outputs: &[Param], raw: Vec<AbiValue>) -> Result<Vec<AbiValue>, DecodingError>;
}

/// A call body taken apart again
#[derive(Clone, Debug)]
pub struct DecodedCall {
    pub function: Function,
    pub header: Option<Header>,
    pub args: Vec<AbiValue>,
}

#[derive(Serialize, Deserialize)]
struct CallBody {
    header: Option<Header>,
    args: Vec<AbiValue>,
}

struct SlotError<'a> {
    param: &'a Param,
    issue: TypeIssue,
}

fn check_slots<'a>(params: &'a [Param], values: &[AbiValue]) -> Result<(), SlotError<'a>> {
    for (param, value) in params.iter().zip(values) {
        param
            .kind
            .check(value)
            .map_err(|issue| SlotError { param, issue })?;
    }
    Ok(())
}

/// Default codec: selector + JSON framing
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Recover the function, header and arguments from a body.
    ///
    /// `functions` is the interface the body is expected to target.
    pub fn decode_call(
        &self,
        functions: &[Function],
        body: &[u8],
    ) -> Result<DecodedCall, DecodingError> {
        if body.len() < 4 {
            return Err(DecodingError::MalformedBody(format!(
                "{} bytes is too short for a selector",
                body.len()
            )));
        }

        let selector = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        let function = functions
            .iter()
            .find(|f| f.selector() == selector)
            .ok_or(DecodingError::UnknownFunction(selector))?;

        let call: CallBody = serde_json::from_slice(&body[4..])
            .map_err(|e| DecodingError::MalformedBody(e.to_string()))?;

        if call.header.is_some() != function.signed {
            return Err(DecodingError::MalformedBody(format!(
                "{}: header presence does not match the function",
                function.name
            )));
        }

        let args = self.decode(&function.inputs, call.args)?;
        Ok(DecodedCall {
            function: function.clone(),
            header: call.header,
            args,
        })
    }
}

impl Codec for JsonCodec {
    fn encode(
        &self,
        function: &Function,
        header: Option<&Header>,
        args: Vec<AbiValue>,
    ) -> Result<Bytes, EncodingError> {
        if args.len() != function.inputs.len() {
            return Err(EncodingError::ArityMismatch {
                function: function.name.clone(),
                expected: function.inputs.len(),
                got: args.len(),
            });
        }

        check_slots(&function.inputs, &args).map_err(|err| {
            let (function, param, expected) = (
                function.name.clone(),
                err.param.name.clone(),
                err.param.kind.to_string(),
            );
            match err.issue {
                TypeIssue::Shape => EncodingError::TypeMismatch {
                    function,
                    param,
                    expected,
                },
                TypeIssue::Range => EncodingError::OutOfRange {
                    function,
                    param,
                    expected,
                },
            }
        })?;

        if header.is_some() != function.signed {
            return Err(EncodingError::HeaderMismatch(function.name.clone()));
        }

        let call = CallBody {
            header: header.copied(),
            args,
        };
        let json =
            serde_json::to_vec(&call).map_err(|e| EncodingError::Serialization(e.to_string()))?;

        let mut body = BytesMut::with_capacity(4 + json.len());
        body.put_u32(function.selector());
        body.extend_from_slice(&json);

        log::debug!("Encoded {} ({} bytes)", function.name, body.len());
        Ok(body.freeze())
    }

    fn decode(&self, outputs: &[Param], raw: Vec<AbiValue>) -> Result<Vec<AbiValue>, DecodingError> {
        if raw.len() != outputs.len() {
            return Err(DecodingError::ArityMismatch {
                expected: outputs.len(),
                got: raw.len(),
            });
        }

        check_slots(outputs, &raw).map_err(|err| {
            let (param, expected) = (err.param.name.clone(), err.param.kind.to_string());
            match err.issue {
                TypeIssue::Shape => DecodingError::TypeMismatch { param, expected },
                TypeIssue::Range => DecodingError::OutOfRange { param, expected },
            }
        })?;

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{multisig, ParamType};

    fn header() -> Header {
        Header {
            time: 1_700_000_000_000,
            expire: 1_700_000_060,
        }
    }

    #[test]
    fn test_encode_and_decode_call() {
        let function = multisig::confirm_transaction();
        let body = JsonCodec
            .encode(&function, Some(&header()), vec![AbiValue::uint(64, 42u64)])
            .unwrap();

        let call = JsonCodec
            .decode_call(&multisig::functions(), &body)
            .unwrap();
        assert_eq!(call.function.name, "confirmTransaction");
        assert_eq!(call.header, Some(header()));
        assert_eq!(call.args, vec![AbiValue::uint(64, 42u64)]);
    }

    #[test]
    fn test_encode_arity_mismatch() {
        let function = multisig::confirm_transaction();
        let result = JsonCodec.encode(&function, Some(&header()), vec![]);
        assert!(matches!(
            result,
            Err(EncodingError::ArityMismatch {
                expected: 1,
                got: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_encode_type_and_range_mismatch() {
        let function = multisig::is_confirmed();

        let wrong_type = JsonCodec.encode(
            &function,
            None,
            vec![AbiValue::Bool(true), AbiValue::uint(8, 0u8)],
        );
        assert!(matches!(wrong_type, Err(EncodingError::TypeMismatch { .. })));

        let out_of_range = JsonCodec.encode(
            &function,
            None,
            vec![
                AbiValue::uint(32, u64::from(u32::MAX) + 1),
                AbiValue::uint(8, 0u8),
            ],
        );
        assert!(matches!(
            out_of_range,
            Err(EncodingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_header_mismatch() {
        let unsigned = multisig::get_parameters();
        let result = JsonCodec.encode(&unsigned, Some(&header()), vec![]);
        assert!(matches!(result, Err(EncodingError::HeaderMismatch(_))));
    }

    #[test]
    fn test_decode_checks_outputs() {
        let outputs = vec![Param::new("transId", ParamType::Uint(64))];

        assert!(JsonCodec
            .decode(&outputs, vec![AbiValue::uint(64, 1u8)])
            .is_ok());
        assert!(matches!(
            JsonCodec.decode(&outputs, vec![]),
            Err(DecodingError::ArityMismatch {
                expected: 1,
                got: 0
            })
        ));
        assert!(matches!(
            JsonCodec.decode(&outputs, vec![AbiValue::Bool(false)]),
            Err(DecodingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_call_rejects_garbage() {
        let functions = multisig::functions();
        assert!(matches!(
            JsonCodec.decode_call(&functions, b"ab"),
            Err(DecodingError::MalformedBody(_))
        ));
        assert!(matches!(
            JsonCodec.decode_call(&functions, &[0xff, 0xff, 0xff, 0xff, b'{', b'}']),
            Err(DecodingError::UnknownFunction(_))
        ));
    }
}
