//! Array differencing.
//!
//! Arrays of primitives are compared as sets. Arrays of objects are matched
//! by a designated key field, so reordering never produces changes and each
//! surviving element can be compared field by field.

use std::collections::{HashMap, HashSet};

use fieldtrail_types::{path, Value};

use crate::compare::identity_key;

/// Set difference between two primitive arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimitiveListDiff {
    /// Elements of `after` missing from `before`, in first-seen order.
    pub added: Vec<Value>,
    /// Elements of `before` missing from `after`, in first-seen order.
    pub removed: Vec<Value>,
}

impl PrimitiveListDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Outcome for one key of a keyed array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyedChange<'a> {
    /// The key only appears after.
    Added { key: &'a Value, after: &'a Value },
    /// The key only appears before.
    Removed { key: &'a Value, before: &'a Value },
    /// The key appears on both sides; the caller compares sub-fields.
    Retained {
        key: &'a Value,
        before: &'a Value,
        after: &'a Value,
    },
}

impl<'a> KeyedChange<'a> {
    pub fn key(&self) -> &'a Value {
        match self {
            KeyedChange::Added { key, .. }
            | KeyedChange::Removed { key, .. }
            | KeyedChange::Retained { key, .. } => key,
        }
    }
}

/// Compare two primitive arrays as sets.
///
/// Duplicates collapse. Missing or non-array input counts as empty.
///
/// # Examples
///
/// ```
/// use fieldtrail_diff::diff_primitive_list;
/// use fieldtrail_types::Value;
///
/// let before = Value::from(serde_json::json!([1, 2]));
/// let after = Value::from(serde_json::json!([2, 3, 3]));
/// let diff = diff_primitive_list(Some(&before), Some(&after));
/// assert_eq!(diff.added, vec![Value::from(3)]);
/// assert_eq!(diff.removed, vec![Value::from(1)]);
/// ```
pub fn diff_primitive_list(before: Option<&Value>, after: Option<&Value>) -> PrimitiveListDiff {
    let before = unique(as_list(before));
    let after = unique(as_list(after));

    let before_keys: HashSet<&str> = before.iter().map(|(k, _)| k.as_str()).collect();
    let after_keys: HashSet<&str> = after.iter().map(|(k, _)| k.as_str()).collect();

    PrimitiveListDiff {
        added: after
            .iter()
            .filter(|(k, _)| !before_keys.contains(k.as_str()))
            .map(|(_, v)| (*v).clone())
            .collect(),
        removed: before
            .iter()
            .filter(|(k, _)| !after_keys.contains(k.as_str()))
            .map(|(_, v)| (*v).clone())
            .collect(),
    }
}

/// Match two object arrays by `key_field`.
///
/// Elements whose key field is missing or falsy are ignored. When a key
/// repeats within one array the last element wins. Keys are visited in
/// before-order, followed by keys that only appear after.
pub fn diff_keyed_list<'a>(
    before: Option<&'a Value>,
    after: Option<&'a Value>,
    key_field: &str,
) -> Vec<KeyedChange<'a>> {
    let before = KeyIndex::build(as_list(before), key_field);
    let after = KeyIndex::build(as_list(after), key_field);

    let mut visited = HashSet::new();
    before
        .order
        .iter()
        .chain(after.order.iter())
        .filter(|id| visited.insert(id.as_str()))
        .filter_map(|id| match (before.get(id), after.get(id)) {
            (Some((key, b)), Some((_, a))) => Some(KeyedChange::Retained {
                key,
                before: b,
                after: a,
            }),
            (None, Some((key, a))) => Some(KeyedChange::Added { key, after: a }),
            (Some((key, b)), None) => Some(KeyedChange::Removed { key, before: b }),
            (None, None) => None,
        })
        .collect()
}

fn as_list(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

fn unique(items: &[Value]) -> Vec<(String, &Value)> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|v| (identity_key(v), v))
        .filter(|(k, _)| seen.insert(k.clone()))
        .collect()
}

struct KeyIndex<'a> {
    order: Vec<String>,
    entries: HashMap<String, (&'a Value, &'a Value)>,
}

impl<'a> KeyIndex<'a> {
    fn build(items: &'a [Value], key_field: &str) -> Self {
        let mut order = Vec::new();
        let mut entries = HashMap::new();
        for item in items {
            let Some(key) = path::get(item, key_field).filter(|k| k.is_truthy()) else {
                continue;
            };
            let id = identity_key(key);
            if entries.insert(id.clone(), (key, item)).is_none() {
                order.push(id);
            }
        }
        Self { order, entries }
    }

    fn get(&self, id: &str) -> Option<(&'a Value, &'a Value)> {
        self.entries.get(id).copied()
    }
}
