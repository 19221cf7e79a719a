//! Adapter mapping a hierarchical key/value datastore API onto a partitioned,
//! schema-constrained table store (hash key plus at most one range key per
//! index). Callers address data with path-like keys and conjunctive filters;
//! the backend understands fixed attribute names, a declared hash/range
//! schema per table, and a small set of secondary indexes.
//!
//! The crate owns the mapping layer only: key/table naming, primary-key
//! derivation and validation, type-preserving value encoding, index-aware
//! query planning, and cursor pagination. The network client executing the
//! requests is an external collaborator behind [`backend::BackendClient`].

pub mod backend;
pub mod cursor;
pub mod error;
pub mod item;
pub mod key;
pub mod plan;
pub mod query;
pub mod schema;
pub mod store;
pub mod table;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Separator splitting a key's terminal segment into hash and range parts
/// when a table's schema keys items on something other than the canonical
/// key attribute.
pub const KEY_SEPARATOR: char = '.';

///
/// reserved
///
/// The closed set of attribute names owned by the mapping layer. Reserved
/// attributes are never run through user-field value decoding, and the
/// partition and wrap-marker attributes are stripped before a value is
/// returned to the caller.
///

pub mod reserved {
    /// Attribute holding the canonical key string.
    pub const KEY: &str = "key";

    /// Attribute holding the payload of a wrapped (non-document) value.
    pub const VALUE: &str = "val";

    /// Marker attribute present on wrapped items.
    pub const WRAPPED: &str = "_wrapped";

    /// Hash-partition attribute used when a table is not hashed on [`KEY`].
    pub const PARTITION: &str = "_hash";

    /// Every reserved attribute name.
    pub const ALL: [&str; 4] = [KEY, VALUE, WRAPPED, PARTITION];

    /// Returns true when `name` is reserved.
    #[must_use]
    pub fn contains(name: &str) -> bool {
        ALL.contains(&name)
    }
}

///
/// Prelude
///
/// Domain vocabulary only; backend wire shapes stay behind their module.
///

pub mod prelude {
    pub use crate::{
        error::DatastoreError,
        key::Key,
        query::{Filter, OffsetKey, Operator, Query},
        store::{Datastore, DatastoreConfig},
        value::Value,
    };
}
