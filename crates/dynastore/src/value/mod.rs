//! Generic datastore values and their backend attribute codec.

mod codec;


pub use codec::{decode, encode};
pub(crate) use codec::PAYLOAD_MARKER;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap};

///
/// Value
///
/// Closed set of values the datastore API exchanges. Maps use a sorted
/// representation so rendering and comparison are deterministic.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a `Value::Map` from owned entries.
    #[must_use]
    pub fn from_entries<K, V>(entries: Vec<(K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        if let Self::Map(fields) = self {
            Some(fields)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        if let Self::Text(text) = self {
            Some(text.as_str())
        } else {
            None
        }
    }

    /// Ordering comparison between like (or numeric cross-type) values.
    ///
    /// Numbers compare numerically across `Int`/`Float`; text, booleans and
    /// datetimes compare within their own variant. Everything else — and
    /// every cross-variant pair — is unordered.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn compare(left: &Self, right: &Self) -> Option<Ordering> {
        match (left, right) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality that treats numerically-equal `Int`/`Float` pairs as equal.
    #[must_use]
    pub(crate) fn loose_eq(left: &Self, right: &Self) -> bool {
        match Self::compare(left, right) {
            Some(ordering) => ordering == Ordering::Equal,
            None => left == right,
        }
    }
}

macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    bool            => Bool,
    i8              => Int,
    i16             => Int,
    i32             => Int,
    i64             => Int,
    f32             => Float,
    f64             => Float,
    &str            => Text,
    String          => Text,
    DateTime<Utc>   => DateTime,
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(fields: BTreeMap<String, Self>) -> Self {
        Self::Map(fields)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}
