//! Query vocabulary: filters, operators, continuation.

use crate::{backend::RawKey, key::Key, value::Value};
use derive_more::Display;

///
/// Operator
///
/// Closed comparison set. Displays symbolically; [`Operator::condition_name`]
/// renders the backend condition suffix.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Operator {
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("=")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<=")]
    Le,
    #[display("<")]
    Lt,
}

impl Operator {
    /// Backend condition-name suffix, e.g. `gt` in `score__gt`.
    #[must_use]
    pub const fn condition_name(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Le => "le",
            Self::Lt => "lt",
        }
    }

    /// Parse the symbolic form.
    #[must_use]
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<=" => Some(Self::Le),
            "<" => Some(Self::Lt),
            _ => None,
        }
    }
}

///
/// Filter
///
/// One conjunctive comparison over a named field.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    #[must_use]
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate this filter against a decoded item. Non-document values and
    /// missing fields never match.
    #[must_use]
    pub(crate) fn matches(&self, item: &Value) -> bool {
        let Some(fields) = item.as_map() else {
            return false;
        };
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };

        match self.op {
            Operator::Eq => Value::loose_eq(actual, &self.value),
            Operator::Ne => !Value::loose_eq(actual, &self.value),
            Operator::Gt => matches!(Value::compare(actual, &self.value), Some(o) if o.is_gt()),
            Operator::Ge => matches!(Value::compare(actual, &self.value), Some(o) if o.is_ge()),
            Operator::Le => matches!(Value::compare(actual, &self.value), Some(o) if o.is_le()),
            Operator::Lt => matches!(Value::compare(actual, &self.value), Some(o) if o.is_lt()),
        }
    }
}

///
/// OffsetKey
///
/// Where the next page of results should resume: either an opaque backend
/// continuation key from a previous cursor, or a datastore key resolved to
/// its primary key at query time.
///

#[derive(Clone, Debug, PartialEq)]
pub enum OffsetKey {
    Continuation(RawKey),
    Key(Key),
}

///
/// Query
///
/// Filter-based lookup under a scope key. Ordering and offset counts are
/// carried so the planner can reject them explicitly; the backend supports
/// neither.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub key: Key,
    pub filters: Vec<Filter>,
    pub limit: Option<u32>,
    pub offset_key: Option<OffsetKey>,
    pub orders: Vec<String>,
    pub offset: u32,
}

impl Query {
    #[must_use]
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            filters: Vec::new(),
            limit: None,
            offset_key: None,
            orders: Vec::new(),
            offset: 0,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_offset_key(mut self, offset_key: OffsetKey) -> Self {
        self.offset_key = Some(offset_key);
        self
    }

    /// Request ordering by `field`. Carried verbatim; planning rejects it.
    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>) -> Self {
        self.orders.push(field.into());
        self
    }

    /// Request an offset count. Carried verbatim; planning rejects it.
    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

///
/// TESTS
///
