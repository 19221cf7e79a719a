//! In-memory backend double and schema fixtures for exercising the mapping
//! layer without a network client.

use crate::backend::{
    AttrValue, AttributeDefinition, BackendClient, BackendError, CreateTableSpec, ItemStream,
    KeySchemaElement, QueryRequest, RawItem, RawKey, ScanRequest, SecondaryIndexDescription,
    TableDescription, TableStatus,
};
use std::{cmp::Ordering, collections::BTreeMap, sync::Mutex};

/// Native attribute comparison: numeric for number pairs, lexical for string
/// pairs, unordered across types.
pub(crate) fn attr_cmp(left: &AttrValue, right: &AttrValue) -> Option<Ordering> {
    match (left, right) {
        (AttrValue::N(a), AttrValue::N(b)) => {
            a.parse::<f64>().ok()?.partial_cmp(&b.parse::<f64>().ok()?)
        }
        (AttrValue::S(a), AttrValue::S(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn condition_matches(operator: &str, actual: &AttrValue, expected: &AttrValue) -> bool {
    let ordering = attr_cmp(actual, expected);
    match operator {
        "eq" => ordering == Some(Ordering::Equal),
        "ne" => ordering != Some(Ordering::Equal),
        "gt" => matches!(ordering, Some(o) if o.is_gt()),
        "ge" => matches!(ordering, Some(o) if o.is_ge()),
        "le" => matches!(ordering, Some(o) if o.is_le()),
        "lt" => matches!(ordering, Some(o) if o.is_lt()),
        _ => false,
    }
}

fn item_matches(item: &RawItem, conditions: impl Iterator<Item = (String, AttrValue)>) -> bool {
    for (name, expected) in conditions {
        let Some((field, operator)) = name.rsplit_once("__") else {
            return false;
        };
        let Some(actual) = item.get(field) else {
            return false;
        };
        if !condition_matches(operator, actual, &expected) {
            return false;
        }
    }

    true
}

struct TableState {
    description: TableDescription,
    items: BTreeMap<RawKey, RawItem>,
}

impl TableState {
    fn key_of(&self, item: &RawItem) -> Result<RawKey, BackendError> {
        let mut key = RawKey::new();
        for element in &self.description.key_schema {
            let value = item.get(&element.attribute).ok_or_else(|| {
                BackendError::new(format!("item is missing key attribute '{}'", element.attribute))
            })?;
            key.insert(element.attribute.clone(), value.clone());
        }
        Ok(key)
    }

    fn select(
        &self,
        conditions: &[(String, AttrValue)],
        limit: Option<u32>,
        start: Option<&RawKey>,
    ) -> Vec<RawItem> {
        let mut out = Vec::new();
        for (key, item) in &self.items {
            // Continuation keys resume exclusively after the named key.
            if start.is_some_and(|start| key <= start) {
                continue;
            }
            if item_matches(item, conditions.iter().cloned()) {
                out.push(item.clone());
                if limit.is_some_and(|l| out.len() >= l as usize) {
                    break;
                }
            }
        }
        out
    }
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, TableState>,
    calls: Vec<&'static str>,
    last_query: Option<QueryRequest>,
    activation_delay: u32,
}

///
/// MemoryBackend
///
/// Deterministic in-memory [`BackendClient`]: items iterate in key order,
/// numbers compare numerically, continuation keys resume exclusively. Call
/// counts are recorded so tests can assert what reached the backend.
///

pub(crate) struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next created table report `polls` non-active describes
    /// before flipping to active.
    pub(crate) fn delay_activation(&self, polls: u32) {
        self.lock().activation_delay = polls;
    }

    /// Register a pre-existing table with an arbitrary schema.
    pub(crate) fn seed_table(&self, description: TableDescription) {
        let mut state = self.lock();
        state.tables.insert(
            description.name.clone(),
            TableState {
                description,
                items: BTreeMap::new(),
            },
        );
    }

    /// Insert a raw item directly, bypassing the facade.
    pub(crate) fn insert_raw(&self, table: &str, item: RawItem) {
        let mut state = self.lock();
        let table = state.tables.get_mut(table).expect("unknown table");
        let key = table.key_of(&item).expect("item must carry key attributes");
        table.items.insert(key, item);
    }

    pub(crate) fn item_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, |t| t.items.len())
    }

    pub(crate) fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|&&m| m == method).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// The most recent query request, for asserting planner output shape.
    pub(crate) fn last_query(&self) -> Option<QueryRequest> {
        self.lock().last_query.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory backend lock poisoned")
    }
}

impl BackendClient for MemoryBackend {
    fn describe_table(&self, name: &str) -> Result<Option<TableDescription>, BackendError> {
        let mut state = self.lock();
        state.calls.push("describe_table");

        if state.activation_delay > 0 {
            state.activation_delay -= 1;
        }
        let activate = state.activation_delay == 0;
        Ok(state.tables.get_mut(name).map(|table| {
            if activate && !table.description.is_active() {
                table.description.status = TableStatus::Active;
            }
            table.description.clone()
        }))
    }

    fn create_table(&self, spec: &CreateTableSpec) -> Result<TableDescription, BackendError> {
        let mut state = self.lock();
        state.calls.push("create_table");

        let mut attribute_definitions = vec![spec.hash.clone()];
        let mut key_schema = vec![KeySchemaElement::hash(&spec.hash.name)];
        if let Some(range) = &spec.range {
            attribute_definitions.push(range.clone());
            key_schema.push(KeySchemaElement::range(&range.name));
        }

        let status = if state.activation_delay > 0 {
            TableStatus::Creating
        } else {
            TableStatus::Active
        };
        let description = TableDescription {
            name: spec.name.clone(),
            attribute_definitions,
            key_schema,
            local_secondary_indexes: vec![],
            global_secondary_indexes: vec![],
            status,
        };

        state.tables.insert(
            spec.name.clone(),
            TableState {
                description: description.clone(),
                items: BTreeMap::new(),
            },
        );
        Ok(description)
    }

    fn get_item(&self, table: &str, key: &RawKey) -> Result<Option<RawItem>, BackendError> {
        let mut state = self.lock();
        state.calls.push("get_item");

        Ok(state
            .tables
            .get(table)
            .and_then(|t| t.items.get(key).cloned()))
    }

    fn put_item(&self, table: &str, item: RawItem) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push("put_item");

        let table = state
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::new(format!("no such table '{table}'")))?;
        let key = table.key_of(&item)?;
        table.items.insert(key, item);
        Ok(())
    }

    fn delete_item(&self, table: &str, key: &RawKey) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push("delete_item");

        if let Some(table) = state.tables.get_mut(table) {
            table.items.remove(key);
        }
        Ok(())
    }

    fn query(&self, table: &str, request: QueryRequest) -> Result<ItemStream, BackendError> {
        let mut state = self.lock();
        state.calls.push("query");
        state.last_query = Some(request.clone());

        let table = state
            .tables
            .get(table)
            .ok_or_else(|| BackendError::new(format!("no such table '{table}'")))?;
        let conditions: Vec<_> = request
            .key_conditions
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Ok(ItemStream::from_items(table.select(
            &conditions,
            request.limit,
            request.exclusive_start_key.as_ref(),
        )))
    }

    fn scan(&self, table: &str, request: ScanRequest) -> Result<ItemStream, BackendError> {
        let mut state = self.lock();
        state.calls.push("scan");

        let table = state
            .tables
            .get(table)
            .ok_or_else(|| BackendError::new(format!("no such table '{table}'")))?;
        let conditions: Vec<_> = request
            .filter_conditions
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Ok(ItemStream::from_items(table.select(
            &conditions,
            request.limit,
            request.exclusive_start_key.as_ref(),
        )))
    }
}

///
/// schemas
///
/// Introspected fixtures for the four supported table shapes plus the
/// planner scenarios.
///

pub(crate) mod schemas {
    use super::*;
    use crate::schema::TableSchema;

    fn active(
        name: &str,
        attributes: Vec<AttributeDefinition>,
        key_schema: Vec<KeySchemaElement>,
        local: Vec<SecondaryIndexDescription>,
        global: Vec<SecondaryIndexDescription>,
    ) -> TableDescription {
        TableDescription {
            name: name.to_string(),
            attribute_definitions: attributes,
            key_schema,
            local_secondary_indexes: local,
            global_secondary_indexes: global,
            status: TableStatus::Active,
        }
    }

    /// Hash-only table keyed on the canonical key attribute.
    pub(crate) fn hash_on_canonical_key() -> TableSchema {
        let description = active(
            "users",
            vec![AttributeDefinition::new("key", "S")],
            vec![KeySchemaElement::hash("key")],
            vec![],
            vec![],
        );
        TableSchema::introspect(&description).expect("fixture schema")
    }

    /// Hash-only table keyed on a custom field.
    pub(crate) fn hash_on_field(field: &str) -> TableSchema {
        let description = active(
            "users",
            vec![AttributeDefinition::new(field, "S")],
            vec![KeySchemaElement::hash(field)],
            vec![],
            vec![],
        );
        TableSchema::introspect(&description).expect("fixture schema")
    }

    /// The facade's default created shape: reserved partition hash plus the
    /// canonical key as range.
    pub(crate) fn default_table() -> TableSchema {
        let description = active(
            "T",
            vec![
                AttributeDefinition::new("_hash", "S"),
                AttributeDefinition::new("key", "S"),
            ],
            vec![KeySchemaElement::hash("_hash"), KeySchemaElement::range("key")],
            vec![],
            vec![],
        );
        TableSchema::introspect(&description).expect("fixture schema")
    }

    /// Hash and numeric range both parsed out of the terminal key segment.
    pub(crate) fn split_keys(hash_field: &str, range_field: &str) -> TableSchema {
        let description = active(
            "metrics",
            vec![
                AttributeDefinition::new(hash_field, "S"),
                AttributeDefinition::new(range_field, "N"),
            ],
            vec![
                KeySchemaElement::hash(hash_field),
                KeySchemaElement::range(range_field),
            ],
            vec![],
            vec![],
        );
        TableSchema::introspect(&description).expect("fixture schema")
    }

    /// The ScoreIndex scenario table: primary (department, name), local
    /// ScoreIndex (department, score), global RegionIndex (region).
    pub(crate) fn score_description() -> TableDescription {
        active(
            "people",
            vec![
                AttributeDefinition::new("department", "S"),
                AttributeDefinition::new("name", "S"),
                AttributeDefinition::new("score", "N"),
                AttributeDefinition::new("region", "S"),
            ],
            vec![
                KeySchemaElement::hash("department"),
                KeySchemaElement::range("name"),
            ],
            vec![SecondaryIndexDescription {
                name: "ScoreIndex".into(),
                key_schema: vec![
                    KeySchemaElement::hash("department"),
                    KeySchemaElement::range("score"),
                ],
            }],
            vec![SecondaryIndexDescription {
                name: "RegionIndex".into(),
                key_schema: vec![KeySchemaElement::hash("region")],
            }],
        )
    }

    pub(crate) fn score_table() -> TableSchema {
        TableSchema::introspect(&score_description()).expect("fixture schema")
    }

    /// Two global indexes sharing a hash attribute, for tie-break tests.
    pub(crate) fn two_gsi_table() -> TableSchema {
        let description = active(
            "tasks",
            vec![
                AttributeDefinition::new("id", "S"),
                AttributeDefinition::new("owner", "S"),
            ],
            vec![KeySchemaElement::hash("id")],
            vec![],
            vec![
                SecondaryIndexDescription {
                    name: "BetaIndex".into(),
                    key_schema: vec![KeySchemaElement::hash("owner")],
                },
                SecondaryIndexDescription {
                    name: "AlphaIndex".into(),
                    key_schema: vec![KeySchemaElement::hash("owner")],
                },
            ],
        );
        TableSchema::introspect(&description).expect("fixture schema")
    }
}
