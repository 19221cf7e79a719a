//! Key ↔ table mapping: table naming, primary-key derivation, validation.
//!
//! Derivation depends on the table's schema shape. Four shapes are
//! supported; everything else the key cannot express fails loudly before a
//! write is attempted.

use crate::{
    KEY_SEPARATOR,
    backend::{AttrValue, RawItem, RawKey},
    error::KeyFormatError,
    key::Key,
    reserved,
    schema::{AttributeType, TableSchema},
};

/// Placeholder table name for keys whose path renders empty.
const EMPTY_TABLE_NAME: &str = "_";

///
/// PrimaryKey
///
/// Backend primary key derived from a hierarchical key or read off an item.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrimaryKey {
    pub hash: (String, AttrValue),
    pub range: Option<(String, AttrValue)>,
}

impl PrimaryKey {
    /// The backend-native key map.
    #[must_use]
    pub fn into_raw(self) -> RawKey {
        let mut raw = RawKey::new();
        raw.insert(self.hash.0, self.hash.1);
        if let Some((attribute, value)) = self.range {
            raw.insert(attribute, value);
        }
        raw
    }
}

/// Derive the backend table name housing objects under `key`'s path.
///
/// The leading separator is stripped, reserved characters map to safe
/// substitutes (`:` → `_`, `/` → `.`), and an empty result falls back to a
/// fixed placeholder. Deterministic and idempotent: the same key always maps
/// to the same name, and renaming a name is a no-op.
#[must_use]
pub fn table_name_for(key: &Key) -> String {
    let path = key.render_path();
    let name = path
        .strip_prefix('/')
        .unwrap_or(&path)
        .replace(':', "_")
        .replace('/', ".");

    if name.is_empty() {
        EMPTY_TABLE_NAME.to_string()
    } else {
        name
    }
}

/// Derive the primary key `key` maps to under `schema`.
pub fn primary_key_from_key(schema: &TableSchema, key: &Key) -> Result<PrimaryKey, KeyFormatError> {
    let hash_attr = schema.hash_key();
    let canonical = key.canonical();
    let name = key.name();

    let (hash_text, range): (&str, Option<(String, String)>) = match schema.range_key() {
        // Hash-only table keyed on the canonical key attribute: the whole
        // rendered key is the partition value.
        None if hash_attr == reserved::KEY => (canonical.as_str(), None),

        // Hash-only table keyed on some other field: the terminal segment
        // is the partition value, and the item must carry the field.
        None => (name, None),

        // Range key is the canonical key attribute: partition on the
        // terminal segment up to the in-key separator, range on the whole
        // rendered key.
        Some(range_attr) if range_attr == reserved::KEY => {
            let hash_text = name.split(KEY_SEPARATOR).next().unwrap_or(name);
            (hash_text, Some((range_attr.to_string(), canonical.clone())))
        }

        // Both components live in the terminal segment as
        // `<hash><separator><range>`.
        Some(range_attr) => {
            let (hash_text, range_text) =
                name.split_once(KEY_SEPARATOR)
                    .ok_or_else(|| KeyFormatError::MissingSeparator {
                        segment: name.to_string(),
                        separator: KEY_SEPARATOR,
                    })?;
            (
                hash_text,
                Some((range_attr.to_string(), range_text.to_string())),
            )
        }
    };

    Ok(PrimaryKey {
        hash: (hash_attr.to_string(), cast(schema, hash_attr, hash_text)?),
        range: match range {
            Some((attribute, text)) => {
                let value = cast(schema, &attribute, &text)?;
                Some((attribute, value))
            }
            None => None,
        },
    })
}

/// Read the primary key off a raw item.
pub fn primary_key_from_item(
    schema: &TableSchema,
    item: &RawItem,
) -> Result<PrimaryKey, KeyFormatError> {
    let hash_attr = schema.hash_key();
    let hash = item
        .get(hash_attr)
        .cloned()
        .ok_or_else(|| KeyFormatError::MissingField {
            field: hash_attr.to_string(),
        })?;

    let range = match schema.range_key() {
        Some(range_attr) => {
            let value = item
                .get(range_attr)
                .cloned()
                .ok_or_else(|| KeyFormatError::MissingField {
                    field: range_attr.to_string(),
                })?;
            Some((range_attr.to_string(), value))
        }
        None => None,
    };

    Ok(PrimaryKey {
        hash: (hash_attr.to_string(), hash),
        range,
    })
}

/// Check that `item` is consistent with being stored under `key`.
///
/// Hard contract: a violation fails before any write is attempted, never
/// silently coerced.
pub fn validate(schema: &TableSchema, key: &Key, item: &RawItem) -> Result<(), KeyFormatError> {
    let expected = primary_key_from_key(schema, key)?;

    // A hash value carrying the in-key separator cannot be re-derived from
    // a key unambiguously on tables that split the terminal segment. The
    // item's claimed value is checked too: derivation splits at the first
    // separator, so only a hand-built item can smuggle one in.
    if schema.range_key().is_some() {
        for hash_text in std::iter::once(expected.hash.1.as_str())
            .chain(item.get(&expected.hash.0).map(AttrValue::as_str))
        {
            if hash_text.contains(KEY_SEPARATOR) {
                return Err(KeyFormatError::ReservedSeparator {
                    value: hash_text.to_string(),
                    separator: KEY_SEPARATOR,
                });
            }
        }
    }

    check_field(item, &expected.hash.0, &expected.hash.1)?;
    if let Some((attribute, value)) = &expected.range {
        check_field(item, attribute, value)?;
    }

    // The canonical key attribute, when present, must spell the key itself.
    if let Some(stored) = item.get(reserved::KEY) {
        let canonical = key.canonical();
        if stored.as_str() != canonical {
            return Err(KeyFormatError::FieldMismatch {
                field: reserved::KEY.to_string(),
                expected: canonical,
                actual: stored.as_str().to_string(),
            });
        }
    }

    Ok(())
}

fn check_field(item: &RawItem, field: &str, expected: &AttrValue) -> Result<(), KeyFormatError> {
    let actual = item.get(field).ok_or_else(|| KeyFormatError::MissingField {
        field: field.to_string(),
    })?;

    if actual != expected {
        return Err(KeyFormatError::FieldMismatch {
            field: field.to_string(),
            expected: expected.as_str().to_string(),
            actual: actual.as_str().to_string(),
        });
    }

    Ok(())
}

// Cast a raw string component to the attribute's declared backend type.
fn cast(schema: &TableSchema, attribute: &str, text: &str) -> Result<AttrValue, KeyFormatError> {
    match schema.attribute_type(attribute) {
        Some(AttributeType::Number) => {
            let numeric = text.parse::<i64>().is_ok()
                || text.parse::<f64>().is_ok_and(f64::is_finite);
            if numeric {
                Ok(AttrValue::N(text.to_string()))
            } else {
                Err(KeyFormatError::InvalidCast {
                    attribute: attribute.to_string(),
                    value: text.to_string(),
                })
            }
        }
        _ => Ok(AttrValue::S(text.to_string())),
    }
}

///
/// TESTS
///
