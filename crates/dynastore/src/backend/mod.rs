//! Surface of the excluded network-client collaborator.
//!
//! The mapping layer produces backend-native request shapes and consumes
//! backend-native responses; everything below this trait — wire protocol,
//! credentials, retries — belongs to the client implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// AttrValue
///
/// Backend-native scalar attribute value. Numbers travel as decimal text
/// and compare numerically on the backend; strings compare lexically.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AttrValue {
    /// String attribute.
    S(String),
    /// Numeric attribute, carried as arbitrary-precision decimal text.
    N(String),
}

impl AttrValue {
    /// The raw text behind either variant.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S(text) | Self::N(text) => text,
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::N(_))
    }
}

/// A stored item: attribute name to backend scalar.
pub type RawItem = BTreeMap<String, AttrValue>;

/// A backend primary key, also the shape of continuation keys.
pub type RawKey = BTreeMap<String, AttrValue>;

///
/// Conditions
///
/// Filter or key-condition map keyed by `field__operator` names, e.g.
/// `department__eq` or `score__gt`. Deterministically ordered.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Conditions(BTreeMap<String, AttrValue>);

impl Conditions {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a condition for `field` under the backend operator name.
    pub fn insert(&mut self, field: &str, operator: &str, value: AttrValue) {
        self.0.insert(format!("{field}__{operator}"), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

///
/// KeyRole
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum KeyRole {
    Hash,
    Range,
}

///
/// KeySchemaElement
///
/// One attribute of a primary or secondary index key.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeySchemaElement {
    pub attribute: String,
    pub role: KeyRole,
}

impl KeySchemaElement {
    #[must_use]
    pub fn hash(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            role: KeyRole::Hash,
        }
    }

    #[must_use]
    pub fn range(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            role: KeyRole::Range,
        }
    }
}

///
/// AttributeDefinition
///
/// Declared attribute with its backend type code (`S`, `N`, ...). Codes the
/// mapping layer does not understand fail introspection rather than being
/// guessed at.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub type_code: String,
}

impl AttributeDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, type_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: type_code.into(),
        }
    }
}

///
/// TableStatus
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TableStatus {
    Creating,
    Updating,
    Deleting,
    Active,
}

///
/// SecondaryIndexDescription
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SecondaryIndexDescription {
    pub name: String,
    pub key_schema: Vec<KeySchemaElement>,
}

///
/// TableDescription
///
/// Raw schema description returned by `describe_table`/`create_table`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub local_secondary_indexes: Vec<SecondaryIndexDescription>,
    pub global_secondary_indexes: Vec<SecondaryIndexDescription>,
    pub status: TableStatus,
}

impl TableDescription {
    /// Readiness predicate: a table may only be introspected once active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, TableStatus::Active)
    }
}

///
/// CreateTableSpec
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateTableSpec {
    pub name: String,
    pub hash: AttributeDefinition,
    pub range: Option<AttributeDefinition>,
}

///
/// QueryRequest
///
/// Native key-condition query against the primary index (`index: None`) or
/// a named secondary index.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryRequest {
    pub index: Option<String>,
    pub key_conditions: Conditions,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<RawKey>,
}

///
/// ScanRequest
///
/// Unindexed scan; filters are evaluated backend-side after the read.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanRequest {
    pub filter_conditions: Conditions,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<RawKey>,
}

///
/// ItemStream
///
/// Fallible stream of raw items produced by query/scan. Forward-only; page
/// handling is the client's concern.
///

pub struct ItemStream {
    inner: Box<dyn Iterator<Item = Result<RawItem, BackendError>> + Send>,
}

impl ItemStream {
    pub fn new<I>(inner: I) -> Self
    where
        I: Iterator<Item = Result<RawItem, BackendError>> + Send + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Convenience for clients that materialize a page up front.
    #[must_use]
    pub fn from_items(items: Vec<RawItem>) -> Self {
        Self::new(items.into_iter().map(Ok))
    }
}

impl Iterator for ItemStream {
    type Item = Result<RawItem, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

///
/// BackendError
///
/// Opaque backend-level failure (throttling, transport, service errors).
/// Passed through the mapping layer unmodified; the core never retries.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("backend error: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// BackendClient
///
/// Capabilities the mapping layer requires from the network client.
/// Absence is modeled as `Ok(None)`, never as an error.
///

pub trait BackendClient {
    fn describe_table(&self, name: &str) -> Result<Option<TableDescription>, BackendError>;

    fn create_table(&self, spec: &CreateTableSpec) -> Result<TableDescription, BackendError>;

    fn get_item(&self, table: &str, key: &RawKey) -> Result<Option<RawItem>, BackendError>;

    /// Write with overwrite semantics (last write wins).
    fn put_item(&self, table: &str, item: RawItem) -> Result<(), BackendError>;

    /// Deleting an absent item is a no-op.
    fn delete_item(&self, table: &str, key: &RawKey) -> Result<(), BackendError>;

    fn query(&self, table: &str, request: QueryRequest) -> Result<ItemStream, BackendError>;

    fn scan(&self, table: &str, request: ScanRequest) -> Result<ItemStream, BackendError>;
}

///
/// TESTS
///
