//! Value comparison and stringification.
//!
//! Two notions of equality are used by the engine:
//!
//! - [`structurally_equal`] — deep equality of arrays and objects, dates by
//!   epoch millisecond, scalars by strict equality.
//! - [`semantically_equal`] — used to classify edits. It additionally lets a
//!   date equal its own ISO-8601 string, and refuses every other cross-type
//!   coercion (`1` never equals `"1"`, `true` never equals `"true"`).
//!
//! [`exists`] decides add/remove classification and deliberately differs
//! from both: zero, `false` and empty containers exist, the empty string does
//! not.

use fieldtrail_types::value::iso8601;
use fieldtrail_types::{MaskRule, Value};
use serde_json::Number;

/// Whether a resolved value counts as present.
///
/// `None`, `null` and `""` are absent. Everything else, including `0`,
/// `false`, `[]` and `{}`, exists.
pub fn exists(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Deep equality without cross-type coercion.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (a, b) {
        (Value::Date(x), Value::Date(y)) => x.timestamp_millis() == y.timestamp_millis(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structurally_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| structurally_equal(l, r)))
        }
        _ => strictly_equal(a, b),
    }
}

/// Equality used to decide whether an existing field was edited.
///
/// Absent and `null` compare equal to each other and unequal to anything
/// else. A date equals a string holding its ISO-8601 rendering.
pub fn semantically_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let (a, b) = match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => return true,
        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => return false,
        (Some(a), Some(b)) => (a, b),
    };
    match (a, b) {
        (Value::Date(x), Value::Date(y)) => x.timestamp_millis() == y.timestamp_millis(),
        (Value::Date(d), Value::String(s)) | (Value::String(s), Value::Date(d)) => iso8601(d) == *s,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), Value::String(_))
        | (Value::String(_), Value::Bool(_)) => false,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            structurally_equal(a, b)
        }
        _ => strictly_equal(a, b),
    }
}

/// Render a value for a change record.
///
/// Absent and `null` stay `None`. A mask, when given, replaces the rendering
/// entirely. Dates render as ISO-8601, strings (ISO-8601 ones included) pass
/// through unchanged, containers render as canonical JSON text, and other
/// scalars use their plain textual form.
pub fn stringify(value: Option<&Value>, mask: Option<&MaskRule>) -> Option<String> {
    let value = match value {
        None | Some(Value::Null) => return None,
        Some(v) => v,
    };
    if let Some(mask) = mask {
        return Some(mask.apply(value));
    }
    let text = match value {
        Value::Null => return None,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Date(d) => iso8601(d),
        Value::Array(_) | Value::Object(_) => value
            .to_canonical_json()
            .unwrap_or_else(|_| lossy_string(value)),
    };
    Some(text)
}

/// Plain textual form of a number: integral floats print without a fraction.
pub fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 1e21 {
                return format!("{f:.0}");
            }
            return f.to_string();
        }
    }
    n.to_string()
}

/// Best-effort rendering used when JSON serialization is unavailable.
fn lossy_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(lossy_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => stringify(Some(other), None).unwrap_or_default(),
    }
}

/// A string uniquely identifying a value for set membership.
///
/// Distinct types never collide (`1` and `"1"` get different keys) and
/// equal values always share a key.
pub(crate) fn identity_key(value: &Value) -> String {
    match value {
        Value::Null => "z".to_string(),
        Value::Bool(b) => format!("b:{b}"),
        Value::Number(n) => format!("n:{}", format_number(n)),
        Value::String(s) => format!("s:{s}"),
        Value::Date(d) => format!("d:{}", d.timestamp_millis()),
        Value::Array(_) | Value::Object(_) => {
            format!("j:{}", value.to_canonical_json().unwrap_or_else(|_| lossy_string(value)))
        }
    }
}

fn strictly_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    x.as_f64() == y.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    #[test]
    fn exists_rules() {
        assert!(!exists(None));
        assert!(!exists(Some(&Value::Null)));
        assert!(!exists(Some(&v(json!("")))));
        assert!(exists(Some(&v(json!(0)))));
        assert!(exists(Some(&v(json!(false)))));
        assert!(exists(Some(&v(json!([])))));
        assert!(exists(Some(&v(json!({})))));
    }

    #[test]
    fn structural_equality() {
        assert!(structurally_equal(&v(json!([1, {"a": 2}])), &v(json!([1, {"a": 2}]))));
        assert!(!structurally_equal(&v(json!([1, 2])), &v(json!([2, 1]))));
        assert!(!structurally_equal(&v(json!([1])), &v(json!([1, 1]))));
        assert!(!structurally_equal(&v(json!({"a": 1})), &v(json!({"a": 1, "b": 2}))));
        assert!(!structurally_equal(&v(json!({"a": 1})), &v(json!({"b": 1}))));
        assert!(structurally_equal(&v(json!(1)), &v(json!(1.0))));
        assert!(!structurally_equal(&v(json!(1)), &v(json!("1"))));
    }

    #[test]
    fn dates_compare_by_epoch() {
        let d = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(structurally_equal(&Value::Date(d), &Value::Date(d)));
        assert!(semantically_equal(Some(&Value::Date(d)), Some(&Value::Date(d))));
    }

    #[test]
    fn date_equals_its_iso_string() {
        let d = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let iso = Value::from("2024-05-01T12:00:00.000Z");
        assert!(semantically_equal(Some(&Value::Date(d)), Some(&iso)));
        assert!(semantically_equal(Some(&iso), Some(&Value::Date(d))));
        assert!(!semantically_equal(Some(&Value::Date(d)), Some(&Value::from("2024-05-01"))));
    }

    #[test]
    fn no_cross_type_coercion() {
        assert!(!semantically_equal(Some(&v(json!(0))), Some(&v(json!("0")))));
        assert!(!semantically_equal(Some(&v(json!("1"))), Some(&v(json!(1)))));
        assert!(!semantically_equal(Some(&v(json!(true))), Some(&v(json!("true")))));
    }

    #[test]
    fn null_and_absent_handling() {
        assert!(semantically_equal(None, None));
        assert!(semantically_equal(Some(&Value::Null), Some(&Value::Null)));
        assert!(!semantically_equal(None, Some(&v(json!(1)))));
        assert!(!semantically_equal(Some(&v(json!("x"))), Some(&Value::Null)));
    }

    #[test]
    fn containers_delegate_to_structural() {
        assert!(semantically_equal(Some(&v(json!({"a": [1]}))), Some(&v(json!({"a": [1]})))));
        assert!(!semantically_equal(Some(&v(json!([1]))), Some(&v(json!({"0": 1})))));
    }

    #[test]
    fn stringify_scalars_and_containers() {
        assert_eq!(stringify(None, None), None);
        assert_eq!(stringify(Some(&Value::Null), None), None);
        assert_eq!(stringify(Some(&v(json!(3))), None).as_deref(), Some("3"));
        assert_eq!(stringify(Some(&v(json!(2.5))), None).as_deref(), Some("2.5"));
        assert_eq!(stringify(Some(&v(json!(4.0))), None).as_deref(), Some("4"));
        assert_eq!(stringify(Some(&v(json!(false))), None).as_deref(), Some("false"));
        assert_eq!(
            stringify(Some(&v(json!({"b": [1, 2], "a": "x"}))), None).as_deref(),
            Some(r#"{"a":"x","b":[1,2]}"#)
        );
        assert_eq!(
            stringify(Some(&v(json!("2024-05-01T12:00:00Z"))), None).as_deref(),
            Some("2024-05-01T12:00:00Z")
        );
    }

    #[test]
    fn stringify_dates_as_iso() {
        let d = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            stringify(Some(&Value::Date(d)), None).as_deref(),
            Some("2023-12-31T23:59:59.000Z")
        );
    }

    #[test]
    fn stringify_applies_masks() {
        let literal = MaskRule::literal("***");
        assert_eq!(stringify(Some(&v(json!("Alice"))), Some(&literal)).as_deref(), Some("***"));
        assert_eq!(stringify(Some(&v(json!(42))), Some(&literal)).as_deref(), Some("***"));
        assert_eq!(stringify(None, Some(&literal)), None);

        let last4 = MaskRule::func(|v| {
            let s = v.as_str().unwrap_or_default();
            format!("****{}", &s[s.len().saturating_sub(4)..])
        });
        assert_eq!(
            stringify(Some(&v(json!("4111111111111111"))), Some(&last4)).as_deref(),
            Some("****1111")
        );
    }

    #[test]
    fn lossy_rendering() {
        assert_eq!(lossy_string(&v(json!([1, "a", null]))), "1,a,");
        assert_eq!(lossy_string(&v(json!({"a": 1}))), "[object Object]");
    }

    #[test]
    fn identity_keys_separate_types() {
        assert_ne!(identity_key(&v(json!(1))), identity_key(&v(json!("1"))));
        assert_eq!(identity_key(&v(json!(1))), identity_key(&v(json!(1.0))));
    }
}
