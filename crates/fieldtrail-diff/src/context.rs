//! Context capture for change records.
//!
//! A [`ContextRule`] lists auxiliary paths whose values are copied next to a
//! change so that a reader can identify what changed without the full
//! document. Captured values keep their nesting: the path `user.name`
//! produces `{"document": {"user": {"name": ...}}}`, never a flat
//! `"user.name"` key.

use fieldtrail_types::{path, ContextRule, Map, Value};

/// Build the context object for one change.
///
/// Returns `None` when no rule is configured. Document paths resolve against
/// `after_doc` first and fall back to `before_doc` when the after side is
/// absent or `null`. Item paths resolve against `after_item` when available,
/// otherwise `before_item`.
pub fn extract_context(
    rule: Option<&ContextRule>,
    before_doc: Option<&Value>,
    after_doc: Option<&Value>,
    before_item: Option<&Value>,
    after_item: Option<&Value>,
) -> Option<Value> {
    let rule = rule?;
    let mut context = Map::new();

    if let Some(paths) = rule.document_paths() {
        let mut bucket = Value::object();
        for p in paths {
            let found = path::resolve(after_doc, p)
                .filter(|v| !v.is_null())
                .or_else(|| path::resolve(before_doc, p));
            if let Some(value) = found {
                path::set(&mut bucket, p, value.clone());
            }
        }
        context.insert("document".to_string(), bucket);
    }

    if let Some(paths) = rule.item_paths() {
        let source = after_item.or(before_item);
        let mut bucket = Value::object();
        for p in paths {
            if let Some(value) = path::resolve(source, p) {
                path::set(&mut bucket, p, value.clone());
            }
        }
        context.insert("item".to_string(), bucket);
    }

    Some(Value::Object(context))
}

/// Merge an inherited parent context into a child's own context.
///
/// Keys missing from the child are filled from the parent. When both sides
/// hold objects under the same key they merge recursively; otherwise the
/// child's value is kept.
pub fn merge_context(child: Option<Value>, parent: Option<&Value>) -> Option<Value> {
    match (child, parent) {
        (None, None) => None,
        (None, Some(parent)) => Some(parent.clone()),
        (Some(child), None) => Some(child),
        (Some(mut child), Some(parent)) => {
            fill_missing(&mut child, parent);
            Some(child)
        }
    }
}

fn fill_missing(child: &mut Value, parent: &Value) {
    if let (Value::Object(child), Value::Object(parent)) = (child, parent) {
        for (key, inherited) in parent {
            match child.get_mut(key) {
                Some(own) => fill_missing(own, inherited),
                None => {
                    child.insert(key.clone(), inherited.clone());
                }
            }
        }
    }
}
