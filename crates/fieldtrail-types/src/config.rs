//! Loading and validation of tracking configurations.
//!
//! Declarative configurations arrive as untyped JSON (or TOML converted to
//! JSON) and are turned into [`FieldSpec`] trees by [`parse_field_specs`].
//! Each node accepts these keys:
//!
//! - `path` — required, non-empty string
//! - `array_kind` — `"none"` (default), `"primitive"` or `"keyed"`
//! - `array_key` — required for, and only allowed on, keyed arrays
//! - `value_field` — string
//! - `mask` — string literal
//! - `context` — list of paths, or `{ document = [...], item = [...] }`
//! - `children` — nested list of nodes
//!
//! Validation happens once, at setup. The diff engine never re-checks.

use serde_json::Value as Json;

use crate::error::{ConfigError, ConfigResult};
use crate::spec::{ArrayKind, ContextRule, FieldSpec, MaskRule};

/// Parse a raw list of field spec nodes.
///
/// # Examples
///
/// ```
/// use fieldtrail_types::parse_field_specs;
///
/// let raw = serde_json::json!([
///     {"path": "status"},
///     {"path": "items", "array_kind": "keyed", "array_key": "sku",
///      "children": [{"path": "qty"}]},
/// ]);
/// let specs = parse_field_specs(&raw).unwrap();
/// assert_eq!(specs[1].children[0].path, "qty");
///
/// let bad = serde_json::json!([{"path": "items", "array_kind": "keyed"}]);
/// assert!(parse_field_specs(&bad).is_err());
/// ```
pub fn parse_field_specs(raw: &Json) -> ConfigResult<Vec<FieldSpec>> {
    let items = raw.as_array().ok_or_else(|| ConfigError::NotAList {
        found: json_type(raw).to_string(),
    })?;
    parse_nodes(items, None)
}

/// Check programmatically built specs for the invariants that the type
/// system does not already enforce.
pub fn validate_field_specs(specs: &[FieldSpec]) -> ConfigResult<()> {
    validate_nodes(specs, None)
}

fn validate_nodes(specs: &[FieldSpec], parent: Option<&str>) -> ConfigResult<()> {
    for (index, spec) in specs.iter().enumerate() {
        if spec.path.is_empty() {
            return Err(ConfigError::MissingPath {
                at: position(parent, index),
            });
        }
        let at = qualify(parent, &spec.path);
        if let ArrayKind::Keyed { key } = &spec.array {
            if key.is_empty() {
                return Err(ConfigError::MissingArrayKey { at });
            }
        }
        validate_nodes(&spec.children, Some(&at))?;
    }
    Ok(())
}

fn parse_nodes(items: &[Json], parent: Option<&str>) -> ConfigResult<Vec<FieldSpec>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_node(item, parent, index))
        .collect()
}

fn parse_node(raw: &Json, parent: Option<&str>, index: usize) -> ConfigResult<FieldSpec> {
    let obj = raw.as_object().ok_or_else(|| ConfigError::NotAnObject {
        at: position(parent, index),
    })?;

    let path = obj
        .get("path")
        .and_then(Json::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ConfigError::MissingPath {
            at: position(parent, index),
        })?;
    let at = qualify(parent, path);

    let array_key = match obj.get("array_key") {
        None | Some(Json::Null) => None,
        Some(Json::String(key)) => Some(key.as_str()),
        Some(_) => return Err(ConfigError::MissingArrayKey { at }),
    };

    let kind = match obj.get("array_kind") {
        None | Some(Json::Null) => "none",
        Some(Json::String(kind)) => kind.as_str(),
        Some(other) => {
            return Err(ConfigError::UnknownArrayKind {
                at,
                kind: other.to_string(),
            })
        }
    };

    let array = match kind {
        "none" => ArrayKind::None,
        "primitive" => ArrayKind::Primitive,
        "keyed" => match array_key {
            Some(key) if !key.is_empty() => ArrayKind::keyed(key),
            _ => return Err(ConfigError::MissingArrayKey { at }),
        },
        other => {
            return Err(ConfigError::UnknownArrayKind {
                at,
                kind: other.to_string(),
            })
        }
    };
    if array_key.is_some() && array.key().is_none() {
        return Err(ConfigError::UnexpectedArrayKey {
            at,
            kind: kind.to_string(),
        });
    }

    let value_field = match obj.get("value_field") {
        None | Some(Json::Null) => None,
        Some(Json::String(field)) => Some(field.clone()),
        Some(_) => return Err(ConfigError::InvalidValueField { at }),
    };

    let mask = match obj.get("mask") {
        None | Some(Json::Null) => None,
        Some(Json::String(text)) => Some(MaskRule::literal(text.as_str())),
        Some(_) => return Err(ConfigError::InvalidMask { at }),
    };

    let context = match obj.get("context") {
        None | Some(Json::Null) => None,
        Some(raw) => Some(parse_context(raw).ok_or_else(|| {
            ConfigError::InvalidContextRule { at: at.clone() }
        })?),
    };

    let children = match obj.get("children") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => parse_nodes(items, Some(&at))?,
        Some(_) => return Err(ConfigError::InvalidChildren { at }),
    };

    Ok(FieldSpec {
        path: path.to_string(),
        array,
        value_field,
        mask,
        context,
        children,
    })
}

/// Parse a standalone context rule, such as an entry-level one. `at` names
/// the rule in the error.
pub fn parse_context_rule(raw: &Json, at: &str) -> ConfigResult<ContextRule> {
    parse_context(raw).ok_or_else(|| ConfigError::InvalidContextRule { at: at.to_string() })
}

fn parse_context(raw: &Json) -> Option<ContextRule> {
    match raw {
        Json::Array(_) => string_list(raw).map(ContextRule::Paths),
        Json::Object(obj) => {
            let bucket = |name: &str| match obj.get(name) {
                None | Some(Json::Null) => Some(None),
                Some(list) => string_list(list).map(Some),
            };
            Some(ContextRule::Split {
                document: bucket("document")?,
                item: bucket("item")?,
            })
        }
        _ => None,
    }
}

fn string_list(raw: &Json) -> Option<Vec<String>> {
    raw.as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn qualify(parent: Option<&str>, path: &str) -> String {
    match parent {
        Some(p) => format!("{p}.{path}"),
        None => path.to_string(),
    }
}

fn position(parent: Option<&str>, index: usize) -> String {
    match parent {
        Some(p) => format!("{p}.children[{index}]"),
        None => format!("fields[{index}]"),
    }
}

fn json_type(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
