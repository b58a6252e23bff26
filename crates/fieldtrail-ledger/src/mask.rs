//! Snapshot masking.
//!
//! Captured snapshots go through the same mask rules as change records so a
//! masked field never leaks through the whole-document copy.

use std::collections::BTreeMap;

use fieldtrail_diff::stringify;
use fieldtrail_types::{path, FieldSpec, MaskRule, Value};

/// Mask rules keyed by document path.
///
/// Masks declared on the children of a keyed array live in a nested rule set
/// that is applied to every element of that array.
#[derive(Clone, Debug, Default)]
pub struct MaskRules {
    fields: BTreeMap<String, MaskRule>,
    elements: BTreeMap<String, MaskRules>,
}

impl MaskRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask the value at `path`.
    pub fn insert(&mut self, path: String, rule: MaskRule) {
        self.fields.insert(path, rule);
    }

    /// Apply `rules` to each element of the array at `path`.
    pub fn insert_elements(&mut self, path: String, rules: MaskRules) {
        self.elements.insert(path, rules);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.elements.is_empty()
    }

    /// Paths masked directly, without element rules.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Rules applied to each element of the array at `path`.
    pub fn elements(&self, path: &str) -> Option<&MaskRules> {
        self.elements.get(path)
    }
}

/// Collect the mask rules declared on `specs` and on their children.
pub fn mask_rules_from_specs(specs: &[FieldSpec]) -> MaskRules {
    let mut rules = MaskRules::new();
    for spec in specs {
        if let Some(mask) = &spec.mask {
            rules.insert(spec.path.clone(), mask.clone());
        }
        let children = mask_rules_from_specs(&spec.children);
        if !children.is_empty() {
            rules.insert_elements(spec.path.clone(), children);
        }
    }
    rules
}

/// Deep-clone `doc`, replacing every masked path with its display string.
///
/// Paths that are absent or `null` stay untouched. A masked array is
/// replaced as a whole before its element rules would run.
pub fn mask_snapshot(doc: &Value, rules: &MaskRules) -> Value {
    let mut masked = doc.clone();
    for (p, rule) in &rules.fields {
        if let Some(text) = stringify(path::get(&masked, p), Some(rule)) {
            path::set(&mut masked, p, Value::String(text));
        }
    }
    for (p, children) in &rules.elements {
        if let Some(Value::Array(items)) = path::get(&masked, p) {
            let items = items.iter().map(|item| mask_snapshot(item, children)).collect();
            path::set(&mut masked, p, Value::Array(items));
        }
    }
    masked
}
