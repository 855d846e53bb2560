//! Wire encoding of operations.
//!
//! An operation travels as a JSON array of tagged records, in application
//! order:
//!
//! ```text
//! [{"retain": 3}, {"insert": "X"}, {"retain": 2}]
//! ```
//!
//! Each record carries exactly one of `retain`, `insert` or `delete`. Decoding
//! goes through [`Operation::try_from_basic_operations`], so a non-canonical
//! array (empty entries, adjacent entries of the same kind) is accepted and
//! normalised, while counts whose sum overflows are rejected.
//!
//! # Examples
//!
//! ```
//! use ot_sync::protocol::{decode_operation, encode_operation};
//! use ot_sync::Operation;
//!
//! let op = Operation::new().retain(3).insert("X").retain(2);
//! let bytes = encode_operation(&op).unwrap();
//! assert_eq!(&bytes[..], br#"[{"retain":3},{"insert":"X"},{"retain":2}]"#);
//! assert_eq!(decode_operation(&bytes).unwrap(), op);
//! ```

use crate::error::{OtError, Result};
use crate::operation::{BasicOperation, Operation};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A wire record before validation: the raw JSON object.
///
/// It must hold exactly one key, one of `retain`, `insert` or `delete`, with a
/// non-null value.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub(crate) struct WireRecord(Map<String, Value>);

impl TryFrom<WireRecord> for BasicOperation {
    type Error = OtError;

    fn try_from(WireRecord(fields): WireRecord) -> Result<Self> {
        let mut fields = fields.into_iter();
        let (key, value) = match (fields.next(), fields.next()) {
            (Some(field), None) => field,
            (None, _) => {
                return Err(OtError::UnknownOperationKind(
                    "record has none of retain/insert/delete".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(OtError::UnknownOperationKind(
                    "record has more than one key".into(),
                ))
            }
        };
        if value.is_null() {
            return Err(OtError::UnknownOperationKind(format!("{key} is null")));
        }
        match key.as_str() {
            "retain" => Ok(BasicOperation::Retain(serde_json::from_value(value)?)),
            "insert" => Ok(BasicOperation::Insert(serde_json::from_value(value)?)),
            "delete" => Ok(BasicOperation::Delete(serde_json::from_value(value)?)),
            other => Err(OtError::UnknownOperationKind(format!(
                "unknown record key {other:?}"
            ))),
        }
    }
}

/// Encode an operation as its JSON record array.
pub fn encode_operation(operation: &Operation) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(operation)?))
}

/// Decode an operation from its JSON record array.
///
/// Malformed JSON or a count that is not a `usize` yields [`OtError::Codec`];
/// a record that is not exactly one of the three kinds yields
/// [`OtError::UnknownOperationKind`]; counts whose sum overflows yield
/// [`OtError::LengthMismatch`].
pub fn decode_operation(bytes: &[u8]) -> Result<Operation> {
    let records: Vec<WireRecord> = serde_json::from_slice(bytes)?;
    records
        .into_iter()
        .map(BasicOperation::try_from)
        .collect::<Result<Vec<_>>>()
        .and_then(Operation::try_from_basic_operations)
}
