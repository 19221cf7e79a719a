//! Type-preserving codec between [`Value`] and backend attributes.
//!
//! Strings and real numbers pass through unchanged so backend range
//! comparisons stay correct (numeric `2 < 10`, not lexical `"10" < "2"`).
//! Everything else serializes to a marked string carrying an extended-JSON
//! payload able to represent dates and other non-JSON-native values.

use crate::{backend::AttrValue, error::DecodeError, value::Value};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::BTreeMap;

/// Prefix marking a string attribute as an encoded structured payload.
pub(crate) const PAYLOAD_MARKER: &str = "__json:";

/// Extended-JSON tag carrying an RFC 3339 datetime.
const DATE_TAG: &str = "$date";

/// Extended-JSON tag carrying a float JSON cannot represent (NaN, ±inf).
const FLOAT_TAG: &str = "$float";

/// Encode a value into its backend attribute form.
///
/// `Text` and `Int`/`Float` pass through as native string/number attributes;
/// booleans are deliberately excluded from the numeric path so `true` and
/// `false` survive round-trip as booleans rather than `1`/`0`. A text value
/// that itself begins with the payload marker is encoded structurally so
/// decode cannot misclassify it.
#[must_use]
pub fn encode(value: &Value) -> AttrValue {
    match value {
        Value::Text(text) if !text.starts_with(PAYLOAD_MARKER) => AttrValue::S(text.clone()),
        Value::Int(n) => AttrValue::N(n.to_string()),
        Value::Float(f) if f.is_finite() => AttrValue::N(format!("{f:?}")),
        other => encode_opaque(other),
    }
}

// Encode a value as a marked structured payload regardless of its type.
fn encode_opaque(value: &Value) -> AttrValue {
    AttrValue::S(format!("{PAYLOAD_MARKER}{}", to_extended_json(value)))
}

/// Decode a backend attribute back into a value.
///
/// Numeric attributes narrow to `Int` when the decimal text is exactly an
/// integer, else to `Float`; marked strings deserialize their payload and
/// fail loudly when malformed; other strings pass through as `Text`.
pub fn decode(attr: &AttrValue) -> Result<Value, DecodeError> {
    match attr {
        AttrValue::S(text) => match text.strip_prefix(PAYLOAD_MARKER) {
            Some(payload) => {
                let json: Json =
                    serde_json::from_str(payload).map_err(|err| DecodeError::MalformedPayload {
                        reason: err.to_string(),
                    })?;
                from_extended_json(&json)
            }
            None => Ok(Value::Text(text.clone())),
        },
        AttrValue::N(text) => decode_number(text),
    }
}

fn decode_number(text: &str) -> Result<Value, DecodeError> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }

    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| DecodeError::MalformedNumber {
            text: text.to_string(),
        })
}

// Lower a value into the extended-JSON payload representation.
fn to_extended_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number((*n).into()),
        Value::Float(f) => Number::from_f64(*f).map_or_else(
            || tagged(FLOAT_TAG, non_finite_text(*f)),
            Json::Number,
        ),
        Value::Text(text) => Json::String(text.clone()),
        Value::DateTime(at) => tagged(
            DATE_TAG,
            at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        Value::List(items) => Json::Array(items.iter().map(to_extended_json).collect()),
        Value::Map(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), to_extended_json(field)))
                .collect(),
        ),
    }
}

fn from_extended_json(json: &Json) -> Result<Value, DecodeError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => n.as_i64().map(Value::Int).or_else(|| n.as_f64().map(Value::Float)).ok_or_else(|| {
            DecodeError::MalformedNumber {
                text: n.to_string(),
            }
        }),
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Array(items) => Ok(Value::List(
            items
                .iter()
                .map(from_extended_json)
                .collect::<Result<_, _>>()?,
        )),
        Json::Object(fields) => from_extended_object(fields),
    }
}

fn from_extended_object(fields: &JsonMap<String, Json>) -> Result<Value, DecodeError> {
    if fields.len() == 1 {
        if let Some(Json::String(text)) = fields.get(DATE_TAG) {
            let at = DateTime::parse_from_rfc3339(text).map_err(|err| {
                DecodeError::MalformedPayload {
                    reason: format!("bad {DATE_TAG} payload '{text}': {err}"),
                }
            })?;
            return Ok(Value::DateTime(at.with_timezone(&Utc)));
        }
        if let Some(Json::String(text)) = fields.get(FLOAT_TAG) {
            return parse_non_finite(text).map(Value::Float).ok_or_else(|| {
                DecodeError::MalformedPayload {
                    reason: format!("bad {FLOAT_TAG} payload '{text}'"),
                }
            });
        }
    }

    let mut out = BTreeMap::new();
    for (name, field) in fields {
        out.insert(name.clone(), from_extended_json(field)?);
    }
    Ok(Value::Map(out))
}

fn tagged(tag: &str, text: String) -> Json {
    let mut fields = JsonMap::new();
    fields.insert(tag.to_string(), Json::String(text));
    Json::Object(fields)
}

fn non_finite_text(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_sign_positive() {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

fn parse_non_finite(text: &str) -> Option<f64> {
    match text {
        "nan" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}
