//! Table schema introspection.
//!
//! A [`TableSchema`] is built once from a backend table description and
//! cached for the lifetime of the facade's table handle; it is never mutated
//! in place. A schema change on the backend requires explicit cache
//! invalidation and re-introspection.

use crate::backend::{KeyRole, SecondaryIndexDescription, TableDescription};
use crate::error::SchemaError;
use derive_more::Display;
use std::collections::BTreeMap;

///
/// AttributeType
///
/// Backend attribute types the mapping layer understands. Anything else
/// fails introspection naming the offending attribute.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum AttributeType {
    #[display("S")]
    String,
    #[display("N")]
    Number,
}

impl AttributeType {
    pub(crate) fn parse(attribute: &str, type_code: &str) -> Result<Self, SchemaError> {
        match type_code {
            "S" => Ok(Self::String),
            "N" => Ok(Self::Number),
            other => Err(SchemaError::UnsupportedAttributeType {
                attribute: attribute.to_string(),
                type_code: other.to_string(),
            }),
        }
    }

    /// Backend type code for this attribute type.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
        }
    }
}

///
/// IndexScope
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexScope {
    /// The table's own primary index.
    Primary,
    /// Alternate range key over the primary hash key.
    Local,
    /// Independent (hash, range) pair with its own consistency behavior.
    Global,
}

///
/// Index
///
/// One queryable (hash, optional range) pair. The primary index carries no
/// name; secondary indexes carry their backend name.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Index {
    pub name: Option<String>,
    pub hash_key: String,
    pub range_key: Option<String>,
    pub scope: IndexScope,
}

impl Index {
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.scope, IndexScope::Primary)
    }

    /// Human-readable identifier for logs and errors.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("primary")
    }

    /// Name used when ordering candidate indexes; the primary index sorts
    /// ahead of any named secondary.
    pub(crate) fn sort_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

///
/// TableSchema
///
/// Parsed, immutable description of one backend table: primary key shape,
/// secondary indexes in deterministic (lexical) order, and the declared
/// attribute type map. Indexes are additionally grouped by hash attribute
/// for O(1) lookup during planning.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableSchema {
    name: String,
    attribute_types: BTreeMap<String, AttributeType>,
    indexes: Vec<Index>,
    by_hash: BTreeMap<String, Vec<usize>>,
}

impl TableSchema {
    /// Parse a raw backend description into a schema.
    pub fn introspect(description: &TableDescription) -> Result<Self, SchemaError> {
        let mut attribute_types = BTreeMap::new();
        for definition in &description.attribute_definitions {
            attribute_types.insert(
                definition.name.clone(),
                AttributeType::parse(&definition.name, &definition.type_code)?,
            );
        }

        let (hash_key, range_key) =
            split_key_schema(&description.key_schema).ok_or_else(|| SchemaError::MissingHashKey {
                table: description.name.clone(),
            })?;

        let mut indexes = vec![Index {
            name: None,
            hash_key,
            range_key,
            scope: IndexScope::Primary,
        }];
        for (described, scope) in description
            .local_secondary_indexes
            .iter()
            .map(|index| (index, IndexScope::Local))
            .chain(
                description
                    .global_secondary_indexes
                    .iter()
                    .map(|index| (index, IndexScope::Global)),
            )
        {
            indexes.push(parse_secondary(&description.name, described, scope)?);
        }

        // Deterministic candidate order: primary first, then lexical by name.
        indexes[1..].sort_by(|left, right| left.sort_name().cmp(right.sort_name()));
        for pair in indexes.windows(2) {
            if pair[0].name.is_some() && pair[0].name == pair[1].name {
                return Err(SchemaError::DuplicateIndex {
                    table: description.name.clone(),
                    index: pair[1].label().to_string(),
                });
            }
        }

        for index in &indexes {
            for attribute in
                std::iter::once(index.hash_key.as_str()).chain(index.range_key.as_deref())
            {
                if !attribute_types.contains_key(attribute) {
                    return Err(SchemaError::UnknownIndexAttribute {
                        index: index.label().to_string(),
                        attribute: attribute.to_string(),
                    });
                }
            }
        }

        let mut by_hash: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (position, index) in indexes.iter().enumerate() {
            by_hash
                .entry(index.hash_key.clone())
                .or_default()
                .push(position);
        }

        Ok(Self {
            name: description.name.clone(),
            attribute_types,
            indexes,
            by_hash,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary index; introspection guarantees it exists.
    #[must_use]
    pub fn primary(&self) -> &Index {
        &self.indexes[0]
    }

    /// Hash attribute of the primary index.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.primary().hash_key
    }

    /// Range attribute of the primary index, if declared.
    #[must_use]
    pub fn range_key(&self) -> Option<&str> {
        self.primary().range_key.as_deref()
    }

    /// Every index, primary first, secondaries in lexical name order.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Indexes hashed on `attribute`, in deterministic catalog order.
    #[must_use]
    pub fn indexes_by_hash_attribute(&self, attribute: &str) -> Vec<&Index> {
        self.by_hash
            .get(attribute)
            .map(|positions| positions.iter().map(|&p| &self.indexes[p]).collect())
            .unwrap_or_default()
    }

    /// Declared backend type of `attribute`, if any.
    #[must_use]
    pub fn attribute_type(&self, attribute: &str) -> Option<AttributeType> {
        self.attribute_types.get(attribute).copied()
    }
}

fn split_key_schema(elements: &[crate::backend::KeySchemaElement]) -> Option<(String, Option<String>)> {
    let hash = elements
        .iter()
        .find(|element| matches!(element.role, KeyRole::Hash))?;
    let range = elements
        .iter()
        .find(|element| matches!(element.role, KeyRole::Range));

    Some((hash.attribute.clone(), range.map(|r| r.attribute.clone())))
}

fn parse_secondary(
    table: &str,
    described: &SecondaryIndexDescription,
    scope: IndexScope,
) -> Result<Index, SchemaError> {
    let (hash_key, range_key) =
        split_key_schema(&described.key_schema).ok_or_else(|| SchemaError::MissingHashKey {
            table: format!("{table}/{}", described.name),
        })?;

    Ok(Index {
        name: Some(described.name.clone()),
        hash_key,
        range_key,
        scope,
    })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AttributeDefinition, KeySchemaElement, TableStatus,
    };

    fn description() -> TableDescription {
        TableDescription {
            name: "people".into(),
            attribute_definitions: vec![
                AttributeDefinition::new("department", "S"),
                AttributeDefinition::new("name", "S"),
                AttributeDefinition::new("score", "N"),
                AttributeDefinition::new("region", "S"),
            ],
            key_schema: vec![
                KeySchemaElement::hash("department"),
                KeySchemaElement::range("name"),
            ],
            local_secondary_indexes: vec![SecondaryIndexDescription {
                name: "ScoreIndex".into(),
                key_schema: vec![
                    KeySchemaElement::hash("department"),
                    KeySchemaElement::range("score"),
                ],
            }],
            global_secondary_indexes: vec![SecondaryIndexDescription {
                name: "RegionIndex".into(),
                key_schema: vec![KeySchemaElement::hash("region")],
            }],
            status: TableStatus::Active,
        }
    }

    #[test]
    fn introspect_parses_primary_and_secondary_indexes() {
        let schema = TableSchema::introspect(&description()).unwrap();

        assert_eq!(schema.hash_key(), "department");
        assert_eq!(schema.range_key(), Some("name"));
        assert_eq!(schema.indexes().len(), 3);
        assert_eq!(schema.primary().scope, IndexScope::Primary);
        assert_eq!(schema.attribute_type("score"), Some(AttributeType::Number));
        assert_eq!(schema.attribute_type("unknown"), None);
    }

    #[test]
    fn indexes_group_by_hash_attribute() {
        let schema = TableSchema::introspect(&description()).unwrap();

        let department = schema.indexes_by_hash_attribute("department");
        assert_eq!(department.len(), 2, "primary and ScoreIndex share the hash");
        assert!(department[0].is_primary());
        assert_eq!(department[1].label(), "ScoreIndex");

        let region = schema.indexes_by_hash_attribute("region");
        assert_eq!(region.len(), 1);
        assert_eq!(region[0].scope, IndexScope::Global);

        assert!(schema.indexes_by_hash_attribute("score").is_empty());
    }

    #[test]
    fn secondary_indexes_sort_lexically_by_name() {
        let mut raw = description();
        raw.global_secondary_indexes.push(SecondaryIndexDescription {
            name: "AAAIndex".into(),
            key_schema: vec![KeySchemaElement::hash("region")],
        });

        let schema = TableSchema::introspect(&raw).unwrap();
        let names: Vec<_> = schema.indexes().iter().map(Index::label).collect();
        assert_eq!(names, ["primary", "AAAIndex", "RegionIndex", "ScoreIndex"]);
    }

    #[test]
    fn unsupported_attribute_type_names_the_attribute() {
        let mut raw = description();
        raw.attribute_definitions
            .push(AttributeDefinition::new("blob", "B"));

        let err = TableSchema::introspect(&raw).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedAttributeType {
                attribute: "blob".into(),
                type_code: "B".into(),
            }
        );
    }

    #[test]
    fn index_on_undeclared_attribute_is_rejected() {
        let mut raw = description();
        raw.global_secondary_indexes.push(SecondaryIndexDescription {
            name: "GhostIndex".into(),
            key_schema: vec![KeySchemaElement::hash("ghost")],
        });

        let err = TableSchema::introspect(&raw).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownIndexAttribute {
                index: "GhostIndex".into(),
                attribute: "ghost".into(),
            }
        );
    }

    #[test]
    fn duplicate_index_names_are_rejected() {
        let mut raw = description();
        raw.global_secondary_indexes.push(SecondaryIndexDescription {
            name: "ScoreIndex".into(),
            key_schema: vec![KeySchemaElement::hash("region")],
        });

        let err = TableSchema::introspect(&raw).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateIndex {
                table: "people".into(),
                index: "ScoreIndex".into(),
            }
        );
    }

    #[test]
    fn missing_hash_key_is_rejected() {
        let mut raw = description();
        raw.key_schema = vec![KeySchemaElement::range("name")];

        assert_eq!(
            TableSchema::introspect(&raw).unwrap_err(),
            SchemaError::MissingHashKey {
                table: "people".into(),
            }
        );
    }
}
