// src/storage/tree.rs

//! In-memory tree operations with realtime-database semantics.
//!
//! - `null` and empty objects are never stored; writing them removes the node.
//! - Numeric segments index into arrays on reads.
//! - Writing below an array turns it into an object keyed by index.

use serde_json::{Map, Value};

/// Value at `segments`, `None` when absent.
pub fn get_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = match node {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!node.is_null()).then_some(node)
}

/// Replace the value at `segments`.
pub fn set_at(root: &mut Value, segments: &[&str], value: Value) {
    let value = prune(value);
    if value.is_null() {
        remove_at(root, segments);
        return;
    }

    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = as_object_mut(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    as_object_mut(node).insert(last.to_string(), value);
}

/// Merge `fields` below `segments`; field keys may contain `/`.
pub fn update_at(root: &mut Value, segments: &[&str], fields: &Map<String, Value>) {
    for (key, value) in fields {
        let mut target: Vec<&str> = segments.to_vec();
        target.extend(key.split('/').filter(|s| !s.is_empty()));
        set_at(root, &target, value.clone());
    }
}

/// Remove the value at `segments` and prune parents left empty.
pub fn remove_at(root: &mut Value, segments: &[&str]) {
    if segments.is_empty() {
        *root = Value::Null;
        return;
    }
    if remove_rec(root, segments) {
        *root = Value::Null;
    }
}

/// Returns true when `node` is empty after the removal.
fn remove_rec(node: &mut Value, segments: &[&str]) -> bool {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return true,
    };

    if let Value::Array(_) = node {
        as_object_mut(node);
    }
    let Value::Object(map) = node else {
        return false;
    };

    let child_empty = match map.get_mut(*head) {
        None => return map.is_empty(),
        Some(_) if rest.is_empty() => true,
        Some(child) => remove_rec(child, rest),
    };
    if child_empty {
        map.remove(*head);
    }
    map.is_empty()
}

/// Keys of an object node, indices of non-null array entries.
pub fn child_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, _)| i.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Drop nulls and empty objects recursively, the way the store does on write.
pub fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.into_iter().map(prune).collect();
            if pruned.iter().all(Value::is_null) {
                Value::Null
            } else {
                Value::Array(pruned)
            }
        }
        other => other,
    }
}

/// Whether two trees would read back identically from the store.
///
/// Both sides are pruned first; numbers compare by value (`100` == `100.0`).
pub fn same_tree(a: &Value, b: &Value) -> bool {
    equivalent(&prune(a.clone()), &prune(b.clone()))
}

fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| equivalent(value, other)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| equivalent(l, r))
        }
        _ => a == b,
    }
}

/// Coerce `node` into an object, converting arrays to index-keyed maps.
fn as_object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        let converted = match node.take() {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            _ => Map::new(),
        };
        *node = Value::Object(converted);
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}
