//! Lazy result cursors.

use crate::{
    backend::{ItemStream, RawKey},
    error::DatastoreError,
    item,
    query::Filter,
    schema::TableSchema,
    table,
    value::Value,
};
use std::sync::Arc;

///
/// ResultCursor
///
/// Forward-only, non-restartable sequence of decoded items. Residual
/// filters from planning are applied lazily before an item is yielded; a
/// decode failure surfaces once and terminates the sequence. [`last_key`]
/// exposes the backend key of the most recently yielded raw item so the
/// caller can build the next page's continuation key.
///
/// [`last_key`]: ResultCursor::last_key
///

pub struct ResultCursor {
    stream: ItemStream,
    schema: Arc<TableSchema>,
    post_filters: Vec<Filter>,
    last_key: Option<RawKey>,
    done: bool,
}

impl std::fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("schema", &self.schema)
            .field("post_filters", &self.post_filters)
            .field("last_key", &self.last_key)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ResultCursor {
    pub(crate) fn new(
        stream: ItemStream,
        schema: Arc<TableSchema>,
        post_filters: Vec<Filter>,
    ) -> Self {
        Self {
            stream,
            schema,
            post_filters,
            last_key: None,
            done: false,
        }
    }

    /// Backend-native key of the most recently yielded raw item.
    #[must_use]
    pub fn last_key(&self) -> Option<&RawKey> {
        self.last_key.as_ref()
    }

    fn finish<T>(&mut self, err: impl Into<DatastoreError>) -> Option<Result<T, DatastoreError>> {
        self.done = true;
        Some(Err(err.into()))
    }
}

impl Iterator for ResultCursor {
    type Item = Result<Value, DatastoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let raw = match self.stream.next()? {
                Ok(raw) => raw,
                Err(err) => return self.finish(err),
            };
            let value = match item::unwrap(&raw) {
                Ok(value) => value,
                Err(err) => return self.finish(err),
            };

            if !self.post_filters.iter().all(|filter| filter.matches(&value)) {
                continue;
            }

            match table::primary_key_from_item(&self.schema, &raw) {
                Ok(primary) => self.last_key = Some(primary.into_raw()),
                Err(err) => return self.finish(err),
            }
            return Some(Ok(value));
        }
    }
}

///
/// TESTS
///
