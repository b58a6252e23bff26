//! The change-tracking engine.
//!
//! [`diff`] walks a tracking configuration and compares the before and after
//! values of every tracked path, producing a flat ordered list of
//! [`ChangeRecord`]s. Records come out in configuration order; within one
//! primitive array, additions precede removals; within one keyed array,
//! records follow key visiting order.
//!
//! Keyed arrays with `children` recurse: each element present on both sides
//! becomes the document-equivalent pair for the child specs, child field
//! names are qualified as `<array field>.<child path>`, and the array's own
//! context is inherited by every child record.

use fieldtrail_types::{path, ArrayKind, ChangeRecord, ContextRule, FieldSpec, Value};
use tracing::{debug, trace};

use crate::array_diff::{diff_keyed_list, diff_primitive_list, KeyedChange};
use crate::compare::{exists, semantically_equal, stringify};
use crate::context::{extract_context, merge_context};

/// Compare two document snapshots under a tracking configuration.
///
/// Either side may be absent (a create has no before, a delete no after).
/// Missing data never fails: it is classified as absent.
///
/// # Examples
///
/// ```
/// use fieldtrail_diff::diff;
/// use fieldtrail_types::{ChangeKind, FieldSpec, Value};
///
/// let before = Value::from(serde_json::json!({"tags": ["a", "b"]}));
/// let after = Value::from(serde_json::json!({"tags": ["b", "c"]}));
/// let changes = diff(Some(&before), Some(&after), &[FieldSpec::primitive_list("tags")]);
///
/// assert_eq!(changes.len(), 2);
/// assert!(changes.iter().any(|c| c.kind == ChangeKind::Add && c.to_value.as_deref() == Some("c")));
/// assert!(changes.iter().any(|c| c.kind == ChangeKind::Remove && c.from_value.as_deref() == Some("a")));
/// ```
pub fn diff(
    before: Option<&Value>,
    after: Option<&Value>,
    specs: &[FieldSpec],
) -> Vec<ChangeRecord> {
    let scope = Scope {
        before,
        after,
        before_item: None,
        after_item: None,
        prefix: None,
        inherited: None,
    };
    let changes = diff_fields(&scope, specs);
    debug!(fields = specs.len(), changes = changes.len(), "diffed snapshots");
    changes
}

/// Where values and context are resolved from at one recursion level.
#[derive(Clone, Copy)]
struct Scope<'a> {
    /// Document-equivalent pair: whole snapshots at the top level, keyed
    /// array elements below.
    before: Option<&'a Value>,
    after: Option<&'a Value>,
    /// Item context sources; unset at the top level.
    before_item: Option<&'a Value>,
    after_item: Option<&'a Value>,
    /// Qualified name of the enclosing keyed array.
    prefix: Option<&'a str>,
    /// Context inherited from the enclosing keyed array element.
    inherited: Option<&'a Value>,
}

impl<'a> Scope<'a> {
    fn field_name(&self, spec: &FieldSpec) -> String {
        match self.prefix {
            Some(prefix) => format!("{prefix}.{}", spec.path),
            None => spec.path.clone(),
        }
    }

    fn context(
        &self,
        rule: Option<&ContextRule>,
        before_item: Option<&Value>,
        after_item: Option<&Value>,
    ) -> Option<Value> {
        let own = extract_context(rule, self.before, self.after, before_item, after_item);
        merge_context(own, self.inherited)
    }
}

fn diff_fields(scope: &Scope<'_>, specs: &[FieldSpec]) -> Vec<ChangeRecord> {
    specs.iter().flat_map(|spec| diff_field(scope, spec)).collect()
}

fn diff_field(scope: &Scope<'_>, spec: &FieldSpec) -> Vec<ChangeRecord> {
    let name = scope.field_name(spec);
    let before = path::resolve(scope.before, &spec.path);
    let after = path::resolve(scope.after, &spec.path);
    trace!(field = %name, array = %spec.array, "diffing field");

    match &spec.array {
        ArrayKind::None => diff_generic(scope, spec, name, before, after)
            .into_iter()
            .collect(),
        ArrayKind::Primitive => diff_primitive(scope, spec, &name, before, after),
        ArrayKind::Keyed { key } => diff_keyed(scope, spec, &name, key, before, after),
    }
}

fn diff_generic(
    scope: &Scope<'_>,
    spec: &FieldSpec,
    name: String,
    before: Option<&Value>,
    after: Option<&Value>,
) -> Option<ChangeRecord> {
    let mask = spec.mask.as_ref();
    let record = match (exists(before), exists(after)) {
        (false, false) => return None,
        (false, true) => ChangeRecord::add(name, stringify(after, mask)),
        (true, false) => ChangeRecord::remove(name, stringify(before, mask)),
        (true, true) => {
            if semantically_equal(before, after) {
                return None;
            }
            ChangeRecord::edit(name, stringify(before, mask), stringify(after, mask))
        }
    };
    let context = scope.context(spec.context.as_ref(), scope.before_item, scope.after_item);
    Some(record.with_context(context))
}

fn diff_primitive(
    scope: &Scope<'_>,
    spec: &FieldSpec,
    name: &str,
    before: Option<&Value>,
    after: Option<&Value>,
) -> Vec<ChangeRecord> {
    let delta = diff_primitive_list(before, after);
    if delta.is_empty() {
        return Vec::new();
    }
    let mask = spec.mask.as_ref();
    let context = scope.context(spec.context.as_ref(), scope.before_item, scope.after_item);

    let added = delta
        .added
        .iter()
        .map(|v| ChangeRecord::add(name, stringify(Some(v), mask)));
    let removed = delta
        .removed
        .iter()
        .map(|v| ChangeRecord::remove(name, stringify(Some(v), mask)));
    added
        .chain(removed)
        .map(|record| record.with_context(context.clone()))
        .collect()
}

fn diff_keyed(
    scope: &Scope<'_>,
    spec: &FieldSpec,
    name: &str,
    key_field: &str,
    before: Option<&Value>,
    after: Option<&Value>,
) -> Vec<ChangeRecord> {
    let mask = spec.mask.as_ref();
    let rule = spec.context.as_ref();
    let surfaced = |element: &Value| {
        let value = spec
            .value_field
            .as_deref()
            .and_then(|field| path::get(element, field));
        stringify(value, mask)
    };

    let mut records = Vec::new();
    for change in diff_keyed_list(before, after, key_field) {
        match change {
            KeyedChange::Added { after: element, .. } => {
                let context = scope.context(rule, None, Some(element));
                records.push(ChangeRecord::add(name, surfaced(element)).with_context(context));
            }
            KeyedChange::Removed { before: element, .. } => {
                let context = scope.context(rule, Some(element), None);
                records.push(ChangeRecord::remove(name, surfaced(element)).with_context(context));
            }
            KeyedChange::Retained {
                before: old,
                after: new,
                ..
            } => {
                if spec.children.is_empty() {
                    continue;
                }
                let element_context = scope.context(rule, Some(old), Some(new));
                let nested = Scope {
                    before: Some(old),
                    after: Some(new),
                    before_item: Some(old),
                    after_item: Some(new),
                    prefix: Some(name),
                    inherited: element_context.as_ref(),
                };
                records.extend(diff_fields(&nested, &spec.children));
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtrail_types::{ChangeKind, MaskRule};
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    fn run(
        before: serde_json::Value,
        after: serde_json::Value,
        specs: &[FieldSpec],
    ) -> Vec<ChangeRecord> {
        diff(Some(&v(before)), Some(&v(after)), specs)
    }

    // -----------------------------------------------------------------------
    // Generic fields
    // -----------------------------------------------------------------------

    #[test]
    fn unchanged_document_has_no_changes() {
        let doc = json!({"status": "open", "tags": ["a"], "items": [{"sku": "A", "qty": 1}]});
        let specs = vec![
            FieldSpec::scalar("status"),
            FieldSpec::primitive_list("tags"),
            FieldSpec::keyed_list("items", "sku").with_children(vec![FieldSpec::scalar("qty")]),
        ];
        assert!(run(doc.clone(), doc, &specs).is_empty());
    }

    #[test]
    fn added_field() {
        let changes = run(json!({}), json!({"status": "open"}), &[FieldSpec::scalar("status")]);
        assert_eq!(changes, vec![ChangeRecord::add("status", Some("open".into()))]);
    }

    #[test]
    fn removed_field() {
        let changes = run(
            json!({"status": "open"}),
            json!({"status": null}),
            &[FieldSpec::scalar("status")],
        );
        assert_eq!(changes, vec![ChangeRecord::remove("status", Some("open".into()))]);
    }

    #[test]
    fn edited_field() {
        let changes = run(json!({"n": 1}), json!({"n": 2}), &[FieldSpec::scalar("n")]);
        assert_eq!(changes, vec![ChangeRecord::edit("n", Some("1".into()), Some("2".into()))]);
    }

    #[test]
    fn nested_path_edit() {
        let changes = run(
            json!({"address": {"city": "Oslo"}}),
            json!({"address": {"city": "Bergen"}}),
            &[FieldSpec::scalar("address.city")],
        );
        assert_eq!(changes[0].field_name, "address.city");
        assert_eq!(changes[0].kind, ChangeKind::Edit);
    }

    #[test]
    fn zero_and_false_exist_but_empty_string_does_not() {
        let specs = [FieldSpec::scalar("n"), FieldSpec::scalar("b"), FieldSpec::scalar("s")];
        let changes = run(json!({}), json!({"n": 0, "b": false, "s": ""}), &specs);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Add));

        let changes = run(json!({"s": ""}), json!({"s": null}), &specs);
        assert!(changes.is_empty());
    }

    #[test]
    fn number_to_string_is_an_edit() {
        let changes = run(json!({"code": 7}), json!({"code": "7"}), &[FieldSpec::scalar("code")]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Edit);
        assert_eq!(changes[0].from_value, changes[0].to_value);
    }

    #[test]
    fn date_against_its_iso_string_is_unchanged() {
        use chrono::{TimeZone, Utc};
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let mut before = Value::object();
        path::set(&mut before, "due", Value::Date(when));
        let after = v(json!({"due": "2024-03-01T08:30:00.000Z"}));
        assert!(diff(Some(&before), Some(&after), &[FieldSpec::scalar("due")]).is_empty());
    }

    #[test]
    fn object_values_render_as_json() {
        let changes = run(
            json!({"meta": {"a": 1}}),
            json!({"meta": {"a": 2}}),
            &[FieldSpec::scalar("meta")],
        );
        assert_eq!(changes[0].from_value.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(changes[0].to_value.as_deref(), Some(r#"{"a":2}"#));
    }

    #[test]
    fn mask_applies_to_both_sides() {
        let spec = FieldSpec::scalar("name").with_mask(MaskRule::literal("***"));
        let changes = run(json!({"name": "Alice"}), json!({"name": "Bob"}), &[spec]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Edit);
        assert_eq!(changes[0].from_value.as_deref(), Some("***"));
        assert_eq!(changes[0].to_value.as_deref(), Some("***"));
    }

    #[test]
    fn create_and_delete_without_one_side() {
        let doc = v(json!({"status": "open"}));
        let specs = [FieldSpec::scalar("status")];
        let created = diff(None, Some(&doc), &specs);
        assert_eq!(created[0].kind, ChangeKind::Add);
        let deleted = diff(Some(&doc), None, &specs);
        assert_eq!(deleted[0].kind, ChangeKind::Remove);
    }

    #[test]
    fn context_is_absent_without_rule_and_nested_with_rule() {
        let plain = run(json!({"n": 1}), json!({"n": 2}), &[FieldSpec::scalar("n")]);
        assert!(plain[0].context.is_none());

        let spec = FieldSpec::scalar("n").with_context(ContextRule::paths(["user.name"]));
        let with_ctx = run(
            json!({"n": 1, "user": {"name": "Alice"}}),
            json!({"n": 2, "user": {"name": "Alice"}}),
            &[spec],
        );
        assert_eq!(
            with_ctx[0].context,
            Some(v(json!({"document": {"user": {"name": "Alice"}}})))
        );
    }

    // -----------------------------------------------------------------------
    // Primitive arrays
    // -----------------------------------------------------------------------

    #[test]
    fn primitive_list_adds_and_removes() {
        let changes = run(
            json!({"tags": ["a", "b"]}),
            json!({"tags": ["b", "c"]}),
            &[FieldSpec::primitive_list("tags")],
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&ChangeRecord::add("tags", Some("c".into()))));
        assert!(changes.contains(&ChangeRecord::remove("tags", Some("a".into()))));
    }

    #[test]
    fn primitive_list_from_missing() {
        let changes = run(
            json!({}),
            json!({"tags": ["x", "y"]}),
            &[FieldSpec::primitive_list("tags")],
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Add && c.field_name == "tags"));
    }

    // -----------------------------------------------------------------------
    // Keyed arrays
    // -----------------------------------------------------------------------

    #[test]
    fn keyed_child_edit() {
        let spec =
            FieldSpec::keyed_list("items", "sku").with_children(vec![FieldSpec::scalar("qty")]);
        let changes = run(
            json!({"items": [{"sku": "A", "qty": 1}]}),
            json!({"items": [{"sku": "A", "qty": 3}]}),
            &[spec],
        );
        assert_eq!(
            changes,
            vec![ChangeRecord::edit("items.qty", Some("1".into()), Some("3".into()))]
        );
    }

    #[test]
    fn keyed_add_and_remove_surface_value_field() {
        let spec = FieldSpec::keyed_list("items", "sku").with_value_field("name");
        let changes = run(
            json!({"items": [{"sku": "A", "name": "Apple"}]}),
            json!({"items": [{"sku": "B", "name": "Banana"}]}),
            &[spec],
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&ChangeRecord::remove("items", Some("Apple".into()))));
        assert!(changes.contains(&ChangeRecord::add("items", Some("Banana".into()))));
    }

    #[test]
    fn keyed_add_without_value_field_has_no_values() {
        let spec = FieldSpec::keyed_list("items", "sku");
        let changes = run(json!({"items": []}), json!({"items": [{"sku": "A"}]}), &[spec]);
        assert_eq!(changes, vec![ChangeRecord::add("items", None)]);
    }

    #[test]
    fn keyed_retained_without_children_is_silent() {
        let spec = FieldSpec::keyed_list("items", "sku").with_value_field("qty");
        let changes = run(
            json!({"items": [{"sku": "A", "qty": 1}]}),
            json!({"items": [{"sku": "A", "qty": 9}]}),
            &[spec],
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn keyed_reorder_is_not_a_change() {
        let spec =
            FieldSpec::keyed_list("items", "sku").with_children(vec![FieldSpec::scalar("qty")]);
        let changes = run(
            json!({"items": [{"sku": "A", "qty": 1}, {"sku": "B", "qty": 2}]}),
            json!({"items": [{"sku": "B", "qty": 2}, {"sku": "A", "qty": 1}]}),
            &[spec],
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn nested_keyed_arrays_qualify_names() {
        let spec = FieldSpec::keyed_list("orders", "id").with_children(vec![
            FieldSpec::keyed_list("lines", "sku").with_children(vec![FieldSpec::scalar("qty")]),
            FieldSpec::primitive_list("flags"),
        ]);
        let changes = run(
            json!({"orders": [{"id": 1, "flags": ["x"], "lines": [{"sku": "A", "qty": 1}]}]}),
            json!({"orders": [{"id": 1, "flags": ["y"], "lines": [{"sku": "A", "qty": 2}]}]}),
            &[spec],
        );
        let names: Vec<&str> = changes.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(names, vec!["orders.lines.qty", "orders.flags", "orders.flags"]);
    }

    #[test]
    fn child_records_inherit_element_context() {
        let spec = FieldSpec::keyed_list("items", "sku")
            .with_context(ContextRule::Split {
                document: Some(vec!["orderNo".into()]),
                item: Some(vec!["sku".into(), "name".into()]),
            })
            .with_children(vec![FieldSpec::scalar("qty").with_context(ContextRule::Split {
                document: None,
                item: Some(vec!["name".into()]),
            })]);
        let changes = run(
            json!({"orderNo": "O-1", "items": [{"sku": "A", "name": "old", "qty": 1}]}),
            json!({"orderNo": "O-1", "items": [{"sku": "A", "name": "new", "qty": 2}]}),
            &[spec],
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].context,
            Some(v(json!({
                "document": {"orderNo": "O-1"},
                "item": {"sku": "A", "name": "new"}
            })))
        );
    }

    #[test]
    fn keyed_add_context_uses_item() {
        let spec = FieldSpec::keyed_list("items", "sku").with_context(ContextRule::Split {
            document: None,
            item: Some(vec!["sku".into()]),
        });
        let changes = run(json!({"items": [{"sku": "Z"}]}), json!({"items": []}), &[spec]);
        assert_eq!(changes[0].kind, ChangeKind::Remove);
        assert_eq!(changes[0].context, Some(v(json!({"item": {"sku": "Z"}}))));
    }
}
