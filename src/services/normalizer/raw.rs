// src/services/normalizer/raw.rs

//! Shape detection for stored collections and lenient field readers.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::utils::ids::positional_index;
use crate::utils::timestamp_value;

/// A stored collection, classified once at the store boundary.
///
/// Strings and numbers where a collection is expected carry no payload
/// and classify as `Absent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawCollection<'a> {
    Absent,
    /// Legacy reference placeholder (`true` / `false`) without content
    BooleanPlaceholder(bool),
    Sequence(&'a [Value]),
    Mapping(&'a Map<String, Value>),
}

impl<'a> RawCollection<'a> {
    pub fn classify(raw: Option<&'a Value>) -> Self {
        match raw {
            Some(Value::Array(items)) => Self::Sequence(items),
            Some(Value::Object(map)) => Self::Mapping(map),
            Some(Value::Bool(flag)) => Self::BooleanPlaceholder(*flag),
            _ => Self::Absent,
        }
    }

    /// Entries in display order. Sequence entries carry no key; nulls are skipped.
    pub fn entries(&self) -> Vec<(Option<&'a str>, &'a Value)> {
        match *self {
            Self::Absent | Self::BooleanPlaceholder(_) => Vec::new(),
            Self::Sequence(items) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| (None, item))
                .collect(),
            Self::Mapping(map) => ordered_entries(map)
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (Some(key), value))
                .collect(),
        }
    }
}

/// Object entries in the client's enumeration order: integer-like keys
/// ascending numerically, then the remaining keys.
pub fn ordered_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    entries
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (positional_index(a), positional_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Non-empty string field.
pub fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Identifier field: non-empty string, or an integer written as a number.
pub fn identifier(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => text(obj, key),
    }
}

/// Numeric field, accepting numbers written as strings.
pub fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 2^64, the first float outside the `u64` range.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Non-negative integer field, accepting integers written as strings.
pub fn index(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            // Integral floats such as `2.0` written by other clients
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..U64_LIMIT).contains(f))
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(timestamp_value)
}

/// Fields not in `known`, carried through verbatim.
pub fn extra_fields(obj: &Map<String, Value>, known: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
