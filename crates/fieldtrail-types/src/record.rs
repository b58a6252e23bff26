//! Change records produced by the diff engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Direction of a field-level change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The field (or array element) did not exist before.
    Add,
    /// The field existed on both sides with different values.
    Edit,
    /// The field (or array element) no longer exists.
    Remove,
}

impl ChangeKind {
    /// The kind observed when the same change is read in reverse.
    pub fn reversed(self) -> Self {
        match self {
            ChangeKind::Add => ChangeKind::Remove,
            ChangeKind::Edit => ChangeKind::Edit,
            ChangeKind::Remove => ChangeKind::Add,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Edit => write!(f, "edit"),
            ChangeKind::Remove => write!(f, "remove"),
        }
    }
}

/// A single field-level change.
///
/// `from_value` / `to_value` are `None` when the value did not exist on that
/// side, which is distinct from existing as an empty string. Several records
/// may share a `field_name` when a keyed array path repeats per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub field_name: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ChangeRecord {
    pub fn add(field_name: impl Into<String>, to_value: Option<String>) -> Self {
        Self {
            field_name: field_name.into(),
            from_value: None,
            to_value,
            kind: ChangeKind::Add,
            context: None,
        }
    }

    pub fn edit(
        field_name: impl Into<String>,
        from_value: Option<String>,
        to_value: Option<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            from_value,
            to_value,
            kind: ChangeKind::Edit,
            context: None,
        }
    }

    pub fn remove(field_name: impl Into<String>, from_value: Option<String>) -> Self {
        Self {
            field_name: field_name.into(),
            from_value,
            to_value: None,
            kind: ChangeKind::Remove,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from_value.as_deref().unwrap_or("(none)");
        let to = self.to_value.as_deref().unwrap_or("(none)");
        write!(f, "{} {}: {} -> {}", self.kind, self.field_name, from, to)
    }
}
