//! Sparse patch operations.
//!
//! A [`PatchOperationSet`] is the parsed form of an update document such as
//! `{"$set": {"status": "done"}, "$inc": {"count": 1}, "note": "x"}`.
//! Top-level keys without a `$` prefix are direct assignments. Unknown
//! operators are ignored.

use std::collections::BTreeSet;

use fieldtrail_types::{Map, Value};
use tracing::debug;

/// Per-field operands of one update, grouped by operator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchOperationSet {
    pub(crate) assign: Map,
    pub(crate) set: Map,
    pub(crate) set_on_insert: Map,
    pub(crate) unset: BTreeSet<String>,
    pub(crate) add_to_set: Map,
    pub(crate) push: Map,
    pub(crate) pull: Map,
    pub(crate) pull_all: Map,
    pub(crate) pop: Map,
    pub(crate) inc: Map,
    pub(crate) mul: Map,
    pub(crate) min: Map,
    pub(crate) max: Map,
}

impl PatchOperationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an update document.
    ///
    /// Non-object input yields an empty set; operator operands that are not
    /// objects are skipped.
    pub fn from_value(raw: &Value) -> Self {
        let mut ops = Self::new();
        let Some(doc) = raw.as_object() else {
            return ops;
        };
        for (key, operand) in doc {
            if !key.starts_with('$') {
                ops.assign.insert(key.clone(), operand.clone());
                continue;
            }
            if key == "$unset" {
                ops.unset.extend(unset_paths(operand));
                continue;
            }
            let Some(target) = ops.operator_mut(key) else {
                debug!(operator = %key, "ignoring unsupported patch operator");
                continue;
            };
            if let Some(fields) = operand.as_object() {
                target.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        ops
    }

    fn operator_mut(&mut self, name: &str) -> Option<&mut Map> {
        let map = match name {
            "$set" => &mut self.set,
            "$setOnInsert" => &mut self.set_on_insert,
            "$addToSet" => &mut self.add_to_set,
            "$push" => &mut self.push,
            "$pull" => &mut self.pull,
            "$pullAll" => &mut self.pull_all,
            "$pop" => &mut self.pop,
            "$inc" => &mut self.inc,
            "$mul" => &mut self.mul,
            "$min" => &mut self.min,
            "$max" => &mut self.max,
            _ => return None,
        };
        Some(map)
    }

    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }

    /// Every field path any operator touches.
    pub fn paths(&self) -> BTreeSet<&str> {
        let maps = [
            &self.assign,
            &self.set,
            &self.set_on_insert,
            &self.add_to_set,
            &self.push,
            &self.pull,
            &self.pull_all,
            &self.pop,
            &self.inc,
            &self.mul,
            &self.min,
            &self.max,
        ];
        maps.into_iter()
            .flat_map(|m| m.keys())
            .chain(self.unset.iter())
            .map(String::as_str)
            .collect()
    }

    // ---- Builders ----

    pub fn assign(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assign.insert(path.into(), value.into());
        self
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(path.into(), value.into());
        self
    }

    pub fn set_on_insert(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_on_insert.insert(path.into(), value.into());
        self
    }

    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.unset.insert(path.into());
        self
    }

    pub fn add_to_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_to_set.insert(path.into(), value.into());
        self
    }

    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push.insert(path.into(), value.into());
        self
    }

    pub fn pull(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pull.insert(path.into(), value.into());
        self
    }

    pub fn pull_all(mut self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.pull_all.insert(path.into(), Value::Array(values));
        self
    }

    /// `1` drops the last element, `-1` the first.
    pub fn pop(mut self, path: impl Into<String>, end: i64) -> Self {
        self.pop.insert(path.into(), Value::from(end));
        self
    }

    pub fn inc(mut self, path: impl Into<String>, by: impl Into<Value>) -> Self {
        self.inc.insert(path.into(), by.into());
        self
    }

    pub fn mul(mut self, path: impl Into<String>, by: impl Into<Value>) -> Self {
        self.mul.insert(path.into(), by.into());
        self
    }

    pub fn min(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.min.insert(path.into(), value.into());
        self
    }

    pub fn max(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.max.insert(path.into(), value.into());
        self
    }
}

/// Wrap values in the multi-value form accepted by `add_to_set` and `push`.
pub fn each(values: Vec<Value>) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert("$each".to_string(), Value::Array(values));
    Value::Object(wrapper)
}

fn unset_paths(operand: &Value) -> Vec<String> {
    match operand {
        Value::Object(fields) => fields.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Value::String(path) => vec![path.clone()],
        _ => Vec::new(),
    }
}
