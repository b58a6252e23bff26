//! Field-tracking configuration.
//!
//! A tracking configuration is a list of [`FieldSpec`] nodes. Each node names
//! a dotted path, says how an array at that path is compared, and optionally
//! how the rendered values are masked and which auxiliary context is captured
//! alongside each change. Keyed arrays may carry `children` describing the
//! fields tracked inside each element.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// How the value at a tracked path is compared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ArrayKind {
    /// A scalar or opaque value compared as a whole.
    #[default]
    None,
    /// An array of primitives compared as a set.
    Primitive,
    /// An array of objects matched by the field named `key`.
    Keyed { key: String },
}

impl ArrayKind {
    pub fn keyed(key: impl Into<String>) -> Self {
        ArrayKind::Keyed { key: key.into() }
    }

    /// The element key field, for keyed arrays.
    pub fn key(&self) -> Option<&str> {
        match self {
            ArrayKind::Keyed { key } => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKind::None => write!(f, "none"),
            ArrayKind::Primitive => write!(f, "primitive"),
            ArrayKind::Keyed { key } => write!(f, "keyed({key})"),
        }
    }
}

/// Replacement applied to a value before it is written to a change record.
#[derive(Clone)]
pub enum MaskRule {
    /// Always render as this literal.
    Literal(String),
    /// Render through a function of the real value.
    Func(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl MaskRule {
    pub fn literal(text: impl Into<String>) -> Self {
        MaskRule::Literal(text.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        MaskRule::Func(Arc::new(f))
    }

    /// Produce the display string for `value`.
    pub fn apply(&self, value: &Value) -> String {
        match self {
            MaskRule::Literal(text) => text.clone(),
            MaskRule::Func(f) => f(value),
        }
    }
}

impl fmt::Debug for MaskRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskRule::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            MaskRule::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Which auxiliary paths are captured as context next to a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextRule {
    /// Document-relative paths, captured into the `document` bucket.
    Paths(Vec<String>),
    /// Separate document-relative and array-item-relative path lists.
    Split {
        document: Option<Vec<String>>,
        item: Option<Vec<String>>,
    },
}

impl ContextRule {
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ContextRule::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Paths resolved against the whole document.
    pub fn document_paths(&self) -> Option<&[String]> {
        match self {
            ContextRule::Paths(paths) => Some(paths),
            ContextRule::Split { document, .. } => document.as_deref(),
        }
    }

    /// Paths resolved against the array element involved in a change.
    pub fn item_paths(&self) -> Option<&[String]> {
        match self {
            ContextRule::Paths(_) => None,
            ContextRule::Split { item, .. } => item.as_deref(),
        }
    }
}

/// One node of the tracking configuration.
#[derive(Clone, Debug, Default)]
pub struct FieldSpec {
    /// Dotted path of the tracked field, relative to the document or, for
    /// children, to the enclosing array element.
    pub path: String,
    pub array: ArrayKind,
    /// Scalar inside a keyed element surfaced as from/to on add and remove.
    pub value_field: Option<String>,
    pub mask: Option<MaskRule>,
    pub context: Option<ContextRule>,
    /// Fields tracked inside each element of a keyed array.
    pub children: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Track a value compared as a whole.
    pub fn scalar(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Track an array of primitives as a set.
    pub fn primitive_list(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            array: ArrayKind::Primitive,
            ..Default::default()
        }
    }

    /// Track an array of objects identified by `key`.
    pub fn keyed_list(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            array: ArrayKind::keyed(key),
            ..Default::default()
        }
    }

    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = Some(field.into());
        self
    }

    pub fn with_mask(mut self, mask: MaskRule) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_context(mut self, context: ContextRule) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_children(mut self, children: Vec<FieldSpec>) -> Self {
        self.children = children;
        self
    }
}
