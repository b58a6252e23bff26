//! Dotted-path access into snapshot values.
//!
//! A path is a `.`-separated list of segments. Segments address object keys,
//! or array positions when the current node is an array and the segment is a
//! decimal index (`items.0.sku`).
//!
//! Reads never fail: a missing, `null` or non-indexable intermediate yields
//! `None`. Writes create intermediate objects on demand but never arrays.

use crate::value::Value;

/// Resolve `path` inside `record`.
///
/// Returns `None` as soon as an intermediate segment is missing, `null`, or
/// not indexable. A leaf that exists with a `null` value resolves to
/// `Some(&Value::Null)`.
///
/// # Examples
///
/// ```
/// use fieldtrail_types::{path, Value};
///
/// let doc = Value::from(serde_json::json!({"user": {"tags": ["a", "b"]}}));
/// assert_eq!(path::get(&doc, "user.tags.1"), Some(&Value::from("b")));
/// assert_eq!(path::get(&doc, "user.name"), None);
/// ```
pub fn get<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve `path` inside an optional document.
pub fn resolve<'a>(record: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    record.and_then(|r| get(r, path))
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Existing array positions are followed; scalar intermediates are replaced
/// by an empty object. A segment that does not index an existing array
/// position leaves the document untouched.
pub fn set(record: &mut Value, path: &str, value: Value) {
    let mut current = record;
    for segment in path.split('.') {
        match step_or_create(current, segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    *current = value;
}

/// Remove the leaf at `path`, returning the removed value.
///
/// Missing paths are a no-op. Array positions are never removed (that would
/// shift the remaining elements).
pub fn remove(record: &mut Value, path: &str) -> Option<Value> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let parent = match parents {
        Some(p) => get_mut(record, p)?,
        None => record,
    };
    parent.as_object_mut()?.remove(leaf)
}

fn get_mut<'a>(record: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn step_or_create<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    if !matches!(node, Value::Object(_) | Value::Array(_)) {
        *node = Value::object();
    }
    match node {
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        Value::Object(map) => Some(map.entry(segment.to_string()).or_insert(Value::Null)),
        _ => None,
    }
}
