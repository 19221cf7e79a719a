//! Datastore facade: orchestration, schema cache, table lifecycle.

use crate::{
    backend::{
        AttributeDefinition, BackendClient, BackendError, CreateTableSpec, RawKey,
        TableDescription,
    },
    cursor::ResultCursor,
    error::{DatastoreError, TableNotReadyError},
    item,
    key::Key,
    plan::{self, PlannedRequest},
    query::{OffsetKey, Query},
    reserved,
    schema::TableSchema,
    table,
    value::Value,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

///
/// ActivationPolicy
///
/// Bounded polling for table activation. The reference behavior looped
/// forever; a bound with a loud failure replaces it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActivationPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

///
/// DatastoreConfig
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DatastoreConfig {
    /// Prefix prepended to every derived table name.
    pub prefix: String,
    pub activation: ActivationPolicy,
}

///
/// Datastore
///
/// Facade over a [`BackendClient`]. Owns the table-schema cache, keyed by
/// table name and filled lazily on first access; the whole
/// check → create → poll → cache path runs under one lock so concurrent
/// first access is race-free. Cached schemas are never mutated — a schema
/// change on the backend requires [`invalidate_table`].
///
/// Reads served through a global secondary index follow the backend's own
/// consistency model and may trail recent writes; the facade does not mask
/// that.
///
/// [`invalidate_table`]: Datastore::invalidate_table
///

pub struct Datastore<C> {
    client: C,
    config: DatastoreConfig,
    tables: Mutex<BTreeMap<String, Arc<TableSchema>>>,
}

impl<C: BackendClient> Datastore<C> {
    #[must_use]
    pub fn new(client: C) -> Self {
        Self::with_config(client, DatastoreConfig::default())
    }

    #[must_use]
    pub const fn with_config(client: C, config: DatastoreConfig) -> Self {
        Self {
            client,
            config,
            tables: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the object named by `key`, or `None` when absent.
    pub fn get(&self, key: &Key) -> Result<Option<Value>, DatastoreError> {
        let schema = self.table(key)?;
        let primary = table::primary_key_from_key(&schema, key)?;

        let Some(raw) = self.client.get_item(schema.name(), &primary.into_raw())? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        Ok(Some(item::unwrap(&raw)?))
    }

    /// Store `value` under `key` with overwrite semantics (last write wins).
    pub fn put(&self, key: &Key, value: &Value) -> Result<(), DatastoreError> {
        let schema = self.table(key)?;
        let (raw, _mode) = item::wrap(&schema, key, value)?;
        table::validate(&schema, key, &raw)?;

        self.client.put_item(schema.name(), raw)?;
        Ok(())
    }

    /// Remove the object named by `key`; deleting an absent object is a
    /// no-op.
    pub fn delete(&self, key: &Key) -> Result<(), DatastoreError> {
        let schema = self.table(key)?;
        let primary = table::primary_key_from_key(&schema, key)?;

        self.client.delete_item(schema.name(), &primary.into_raw())?;
        Ok(())
    }

    /// Whether an object is stored under `key`.
    pub fn contains(&self, key: &Key) -> Result<bool, DatastoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Run a filter query under `query.key`'s scope.
    pub fn query(&self, query: &Query) -> Result<ResultCursor, DatastoreError> {
        // Capability rejections come first so an unsupported query provably
        // issues no backend call, cached schema or not.
        plan::check_capabilities(query)?;

        let schema = self.table(&query.key.child("_"))?;
        let start_key = Self::resolve_offset_key(&schema, query.offset_key.as_ref())?;
        let planned = plan::plan(&schema, query, start_key)?;

        let (stream, post_filters) = match planned {
            PlannedRequest::Query {
                request,
                post_filters,
            } => (self.client.query(schema.name(), request)?, post_filters),
            PlannedRequest::Scan { request } => {
                (self.client.scan(schema.name(), request)?, Vec::new())
            }
        };

        Ok(ResultCursor::new(stream, schema, post_filters))
    }

    /// Borrow the backend client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Drop the cached schema for `name` (with the configured prefix
    /// applied); the next access re-introspects. Returns whether an entry
    /// was cached.
    pub fn invalidate_table(&self, name: &str) -> bool {
        let full = format!("{}{name}", self.config.prefix);
        self.lock_tables().remove(&full).is_some()
    }

    // Resolve (and cache) the schema for the table housing `key`.
    fn table(&self, key: &Key) -> Result<Arc<TableSchema>, DatastoreError> {
        let name = format!("{}{}", self.config.prefix, table::table_name_for(key));
        let mut tables = self.lock_tables();
        if let Some(schema) = tables.get(&name) {
            return Ok(schema.clone());
        }

        let description = match self.client.describe_table(&name)? {
            Some(description) => description,
            None => {
                tracing::info!(table = %name, "creating backend table");
                self.client.create_table(&default_table_spec(&name))?
            }
        };
        let description = self.wait_active(&name, description)?;
        let schema = Arc::new(TableSchema::introspect(&description)?);

        tables.insert(name.clone(), schema.clone());
        tracing::debug!(table = %name, "cached table schema");
        Ok(schema)
    }

    fn wait_active(
        &self,
        name: &str,
        mut description: TableDescription,
    ) -> Result<TableDescription, DatastoreError> {
        let policy = self.config.activation;
        let mut attempts = 0u32;

        while !description.is_active() {
            attempts += 1;
            if attempts > policy.max_attempts {
                return Err(TableNotReadyError {
                    table: name.to_string(),
                    attempts: policy.max_attempts,
                }
                .into());
            }

            tracing::warn!(table = %name, attempt = attempts, "table not active; polling");
            thread::sleep(policy.poll_interval);
            description = self.client.describe_table(name)?.ok_or_else(|| {
                BackendError::new(format!("table '{name}' disappeared while activating"))
            })?;
        }

        Ok(description)
    }

    fn resolve_offset_key(
        schema: &TableSchema,
        offset_key: Option<&OffsetKey>,
    ) -> Result<Option<RawKey>, DatastoreError> {
        match offset_key {
            None => Ok(None),
            Some(OffsetKey::Continuation(raw)) => Ok(Some(raw.clone())),
            Some(OffsetKey::Key(key)) => Ok(Some(
                table::primary_key_from_key(schema, key)?.into_raw(),
            )),
        }
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<TableSchema>>> {
        self.tables.lock().expect("schema cache lock poisoned")
    }
}

// Schema for tables this facade creates itself: partition on the reserved
// hash attribute, range on the canonical key.
fn default_table_spec(name: &str) -> CreateTableSpec {
    CreateTableSpec {
        name: name.to_string(),
        hash: AttributeDefinition::new(reserved::PARTITION, "S"),
        range: Some(AttributeDefinition::new(reserved::KEY, "S")),
    }
}

///
/// TESTS
///
