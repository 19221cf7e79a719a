//! Error surfaces of the mapping layer.
//!
//! Validation errors (`KeyFormatError`, `SchemaError`, `CapabilityError`)
//! are raised before any backend call is attempted; decode errors terminate
//! a cursor instead of skipping items; backend failures pass through
//! unmodified. Absence is not an error anywhere on this surface — `get`
//! and `contains` translate it to `None`/`false`.

use crate::backend::BackendError;
use thiserror::Error as ThisError;

///
/// KeyFormatError
///
/// A key whose literal form cannot be represented under the table's schema,
/// or an item that contradicts the key it is being written under.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyFormatError {
    #[error("hash value '{value}' contains the reserved separator '{separator}'")]
    ReservedSeparator { value: String, separator: char },

    #[error(
        "key segment '{segment}' has no '{separator}' separating hash and range components"
    )]
    MissingSeparator { segment: String, separator: char },

    #[error("item is missing required key field '{field}'")]
    MissingField { field: String },

    #[error("item field '{field}' holds '{actual}' but the key implies '{expected}'")]
    FieldMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("field '{field}' is reserved and cannot be written as a user field")]
    ReservedField { field: String },

    #[error("cannot cast '{value}' to the numeric key attribute '{attribute}'")]
    InvalidCast { attribute: String, value: String },
}

///
/// SchemaError
///
/// A backend table description the mapping layer refuses to guess about.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("attribute '{attribute}' has unsupported backend type '{type_code}'")]
    UnsupportedAttributeType {
        attribute: String,
        type_code: String,
    },

    #[error("table '{table}' declares no hash key")]
    MissingHashKey { table: String },

    #[error("index '{index}' keys on attribute '{attribute}' absent from the attribute type map")]
    UnknownIndexAttribute { index: String, attribute: String },

    #[error("table '{table}' declares index '{index}' more than once")]
    DuplicateIndex { table: String, index: String },
}

///
/// CapabilityError
///
/// A query feature the backend has no native support for. Raised at plan
/// time, before any request is issued.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum CapabilityError {
    #[error("the backend does not support query ordering")]
    Ordering,

    #[error("the backend does not support offset counts; resume from a continuation key instead")]
    OffsetCount,
}

///
/// DecodeError
///
/// A stored attribute that cannot be turned back into a value. Never
/// silently dropped; a cursor hitting one terminates.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("malformed structured payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("numeric attribute '{text}' is not a valid decimal")]
    MalformedNumber { text: String },

    #[error("wrapped item is missing its '{attribute}' attribute")]
    MissingWrappedValue { attribute: &'static str },
}

///
/// TableNotReadyError
///
/// The backend never reported the table active within the activation policy.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("table '{table}' did not become active within {attempts} polls")]
pub struct TableNotReadyError {
    pub table: String,
    pub attempts: u32,
}

///
/// DatastoreError
///
/// Union of every failure the facade can surface.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DatastoreError {
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    TableNotReady(#[from] TableNotReadyError),

    /// Backend-level failure passed through unmodified; the mapping layer
    /// does not retry.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
