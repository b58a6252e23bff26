//! Patch simulation.
//!
//! Stores usually apply partial updates without handing back a full after
//! snapshot. [`simulate`] predicts the post-update value of every tracked
//! field touched by a [`PatchOperationSet`], so the diff engine can run
//! against `before` and the predicted after state.
//!
//! Operators apply in a fixed order, each one seeing the working result of
//! the previous ones:
//!
//! direct assignment, `set`, `set_on_insert`, `unset`, then per tracked
//! field `add_to_set`, `push`, `pull`, `pull_all`, `pop`, `inc`, `mul`,
//! `min`, `max`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use fieldtrail_diff::structurally_equal;
use fieldtrail_types::{path, FieldSpec, Value};
use tracing::debug;

use crate::ops::PatchOperationSet;

/// Predicted values of tracked fields, keyed by path.
///
/// `None` marks a field removed by `unset`. Tracked fields the patch does not
/// touch are absent from the map.
pub type SimulatedFields = BTreeMap<String, Option<Value>>;

/// Predict the tracked fields changed by `ops` when applied to `before`.
///
/// Only fields whose path exactly matches a top-level spec path are
/// simulated. Keyed specs make `add_to_set` deduplicate by element key.
///
/// # Examples
///
/// ```
/// use fieldtrail_patch::{simulate, PatchOperationSet};
/// use fieldtrail_types::{FieldSpec, Value};
///
/// let before = Value::from(serde_json::json!({"status": "pending", "count": 1}));
/// let ops = PatchOperationSet::new().set("status", "done").inc("count", 2);
/// let specs = [FieldSpec::scalar("status"), FieldSpec::scalar("count")];
///
/// let fields = simulate(&ops, Some(&before), &specs);
/// assert_eq!(fields["status"], Some(Value::from("done")));
/// assert_eq!(fields["count"], Some(Value::from(3)));
/// ```
pub fn simulate(
    ops: &PatchOperationSet,
    before: Option<&Value>,
    specs: &[FieldSpec],
) -> SimulatedFields {
    // Several specs may share a path; each field is simulated once, keyed by
    // the first spec that names it.
    let mut tracked: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    for spec in specs {
        tracked.entry(spec.path.as_str()).or_insert(spec.array.key());
    }
    let is_tracked = |p: &str| tracked.contains_key(p);
    let mut fields = SimulatedFields::new();

    for stage in [&ops.assign, &ops.set, &ops.set_on_insert] {
        for (p, value) in stage.iter().filter(|(p, _)| is_tracked(p)) {
            fields.insert(p.clone(), Some(value.clone()));
        }
    }
    for p in ops.unset.iter().filter(|p| is_tracked(p)) {
        fields.insert(p.clone(), None);
    }

    for (&p, &key) in &tracked {
        let mut field = Field {
            path: p,
            before,
            fields: &mut fields,
        };
        if let Some(operand) = ops.add_to_set.get(p) {
            field.add_to_set(operand, key);
        }
        if let Some(operand) = ops.push.get(p) {
            field.push(operand);
        }
        if let Some(operand) = ops.pull.get(p) {
            field.pull(operand);
        }
        if let Some(operand) = ops.pull_all.get(p) {
            field.pull_all(operand);
        }
        if let Some(operand) = ops.pop.get(p) {
            field.pop(operand);
        }
        if let Some(operand) = ops.inc.get(p) {
            field.arithmetic(operand, |a, b| a.checked_add(b), |a, b| a + b);
        }
        if let Some(operand) = ops.mul.get(p) {
            field.arithmetic(operand, |a, b| a.checked_mul(b), |a, b| a * b);
        }
        if let Some(operand) = ops.min.get(p) {
            field.clamp(operand, Ordering::Less);
        }
        if let Some(operand) = ops.max.get(p) {
            field.clamp(operand, Ordering::Greater);
        }
    }

    debug!(tracked = tracked.len(), simulated = fields.len(), "simulated patch");
    fields
}

/// Overlay simulated fields onto a snapshot.
///
/// Untouched data is preserved; `None` entries remove their path.
pub fn overlay(before: Option<&Value>, fields: &SimulatedFields) -> Value {
    let mut doc = before.cloned().unwrap_or_else(Value::object);
    for (p, value) in fields {
        match value {
            Some(value) => path::set(&mut doc, p, value.clone()),
            None => {
                path::remove(&mut doc, p);
            }
        }
    }
    doc
}

/// Simulate `ops` and overlay the result onto `before` in one step.
pub fn predict_after(
    ops: &PatchOperationSet,
    before: Option<&Value>,
    specs: &[FieldSpec],
) -> Value {
    overlay(before, &simulate(ops, before, specs))
}

/// One tracked field being simulated.
struct Field<'a> {
    path: &'a str,
    before: Option<&'a Value>,
    fields: &'a mut SimulatedFields,
}

impl Field<'_> {
    /// The working value: earlier simulated stages win over the snapshot.
    fn current(&self) -> Option<Value> {
        match self.fields.get(self.path) {
            Some(working) => working.clone(),
            None => path::resolve(self.before, self.path).cloned(),
        }
    }

    /// The working value as a list; a scalar becomes a one-element list.
    fn current_list(&self) -> Vec<Value> {
        match self.current() {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
        }
    }

    fn write(&mut self, value: Value) {
        self.fields.insert(self.path.to_string(), Some(value));
    }

    fn add_to_set(&mut self, operand: &Value, key_field: Option<&str>) {
        let mut list = self.current_list();
        for item in each_items(operand) {
            let duplicate = match key_field {
                Some(key) => match path::get(&item, key) {
                    Some(incoming) => list.iter().any(|existing| {
                        path::get(existing, key).is_some_and(|k| structurally_equal(k, incoming))
                    }),
                    None => false,
                },
                None => list.iter().any(|existing| structurally_equal(existing, &item)),
            };
            if !duplicate {
                list.push(item);
            }
        }
        self.write(Value::Array(list));
    }

    fn push(&mut self, operand: &Value) {
        let mut list = self.current_list();
        list.extend(each_items(operand));
        self.write(Value::Array(list));
    }

    fn pull(&mut self, operand: &Value) {
        if !self.has_value() {
            return;
        }
        let mut list = self.current_list();
        list.retain(|item| !matches_pull(item, operand));
        self.write(Value::Array(list));
    }

    fn pull_all(&mut self, operand: &Value) {
        if !self.has_value() {
            return;
        }
        let targets = match operand {
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        let mut list = self.current_list();
        list.retain(|item| !targets.iter().any(|t| structurally_equal(item, t)));
        self.write(Value::Array(list));
    }

    fn pop(&mut self, operand: &Value) {
        if !self.has_value() {
            return;
        }
        let mut list = self.current_list();
        match operand.as_f64() {
            Some(end) if end == 1.0 => {
                list.pop();
            }
            Some(end) if end == -1.0 => {
                if !list.is_empty() {
                    list.remove(0);
                }
            }
            _ => return,
        }
        self.write(Value::Array(list));
    }

    /// Apply a numeric operator; a missing original counts as zero and a
    /// non-numeric original or operand leaves the field untouched.
    fn arithmetic(
        &mut self,
        operand: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) {
        let base = match self.current() {
            None | Some(Value::Null) => Value::from(0),
            Some(v @ Value::Number(_)) => v,
            Some(_) => return,
        };
        if !matches!(operand, Value::Number(_)) {
            return;
        }
        let result = match (base.as_i64(), operand.as_i64()) {
            (Some(a), Some(b)) => int_op(a, b).map(Value::from),
            _ => None,
        };
        let result = match result {
            Some(v) => v,
            None => match (base.as_f64(), operand.as_f64()) {
                (Some(a), Some(b)) => Value::from_f64(float_op(a, b)),
                _ => return,
            },
        };
        self.write(result);
    }

    /// Keep the operand when the field is absent or when the operand orders
    /// `wanted` relative to the current value.
    fn clamp(&mut self, operand: &Value, wanted: Ordering) {
        let replace = match self.current() {
            None | Some(Value::Null) => true,
            Some(current) => compare(operand, &current) == Some(wanted),
        };
        if replace {
            self.write(operand.clone());
        }
    }

    fn has_value(&self) -> bool {
        !matches!(self.current(), None | Some(Value::Null))
    }
}

/// Items carried by an `add_to_set` / `push` operand, unwrapping `$each`.
fn each_items(operand: &Value) -> Vec<Value> {
    match operand.as_object().and_then(|o| o.get("$each")) {
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
        None => vec![operand.clone()],
    }
}

/// A pull operand matches a scalar by equality, or an object element when
/// every query key resolves to an equal value.
fn matches_pull(item: &Value, operand: &Value) -> bool {
    match operand {
        Value::Object(query) => match item {
            Value::Object(_) => query.iter().all(|(key, expected)| {
                path::get(item, key).is_some_and(|actual| structurally_equal(actual, expected))
            }),
            _ => false,
        },
        _ => structurally_equal(item, operand),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
