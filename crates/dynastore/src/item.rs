//! Item wrap/unwrap between datastore values and raw backend items.
//!
//! The encoding is a closed three-way choice made once at wrap time, never
//! re-inspected downstream.

use crate::{
    backend::{AttrValue, RawItem},
    error::{DecodeError, KeyFormatError},
    key::Key,
    reserved,
    schema::TableSchema,
    table, value,
    value::Value,
};
use std::collections::BTreeMap;

/// Numeric truthy marker stored under the wrap attribute.
const WRAPPED_MARKER: &str = "1";

///
/// ItemMode
///
/// How a value is laid out as a backend item.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemMode {
    /// A mapping stored field-per-attribute, plus the synthetic canonical
    /// key attribute.
    Document,
    /// A non-mapping value stored under the reserved value attribute.
    Scalar,
    /// A mapping that cannot be a document (no canonical key field); stored
    /// opaque so reads round-trip it unchanged.
    WrappedOpaque,
}

// Decide the encoding for one (key, value) pair.
pub(crate) fn mode_for(key: &Key, value: &Value) -> Result<ItemMode, KeyFormatError> {
    let Some(fields) = value.as_map() else {
        return Ok(ItemMode::Scalar);
    };

    match fields.get(reserved::KEY) {
        None => Ok(ItemMode::WrappedOpaque),
        Some(Value::Text(text)) if *text == key.canonical() => Ok(ItemMode::Document),
        Some(other) => Err(KeyFormatError::FieldMismatch {
            field: reserved::KEY.to_string(),
            expected: key.canonical(),
            actual: match other {
                Value::Text(text) => text.clone(),
                _ => format!("{other:?}"),
            },
        }),
    }
}

/// Wrap `value` for storage under `key`, choosing the item mode and adding
/// the reserved partition attribute when the table is hashed on it.
pub(crate) fn wrap(
    schema: &TableSchema,
    key: &Key,
    value: &Value,
) -> Result<(RawItem, ItemMode), KeyFormatError> {
    let mode = mode_for(key, value)?;
    let mut item = RawItem::new();

    match mode {
        ItemMode::Document => {
            let fields = value.as_map().expect("document mode implies a mapping");
            for (name, field) in fields {
                if name == reserved::KEY {
                    continue;
                }
                if reserved::contains(name) {
                    return Err(KeyFormatError::ReservedField { field: name.clone() });
                }
                item.insert(name.clone(), value::encode(field));
            }
        }
        ItemMode::Scalar | ItemMode::WrappedOpaque => {
            item.insert(reserved::VALUE.to_string(), value::encode(value));
            item.insert(
                reserved::WRAPPED.to_string(),
                AttrValue::N(WRAPPED_MARKER.to_string()),
            );
        }
    }
    item.insert(
        reserved::KEY.to_string(),
        AttrValue::S(key.canonical()),
    );

    if schema.hash_key() == reserved::PARTITION {
        let primary = table::primary_key_from_key(schema, key)?;
        item.insert(primary.hash.0, primary.hash.1);
    }

    Ok((item, mode))
}

/// Decode a raw item back into the value it was written from.
///
/// Reserved attributes are never run through user-field decoding; the
/// partition and wrap-marker attributes never reach the caller.
pub(crate) fn unwrap(item: &RawItem) -> Result<Value, DecodeError> {
    if item.contains_key(reserved::WRAPPED) {
        let payload = item
            .get(reserved::VALUE)
            .ok_or(DecodeError::MissingWrappedValue {
                attribute: reserved::VALUE,
            })?;
        return value::decode(payload);
    }

    let mut fields = BTreeMap::new();
    for (name, attr) in item {
        if name == reserved::PARTITION {
            continue;
        }
        let decoded = if name == reserved::KEY {
            Value::Text(attr.as_str().to_string())
        } else {
            value::decode(attr)?
        };
        fields.insert(name.clone(), decoded);
    }

    Ok(Value::Map(fields))
}

///
/// TESTS
///
