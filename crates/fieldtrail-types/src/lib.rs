//! Foundation types for fieldtrail.
//!
//! This crate provides the snapshot value model, dotted-path access, the
//! declarative field-tracking configuration and the change records produced
//! by the diff engine. Every other fieldtrail crate depends on
//! `fieldtrail-types`.
//!
//! # Key Types
//!
//! - [`Value`] — A document snapshot node (JSON plus a native date variant)
//! - [`FieldSpec`] / [`ArrayKind`] — One node of the tracking configuration
//! - [`MaskRule`] / [`ContextRule`] — Display masking and context capture rules
//! - [`ChangeRecord`] / [`ChangeKind`] — A single field-level change
//! - [`ConfigError`] — Raised when a tracking configuration is malformed

pub mod config;
pub mod error;
pub mod path;
pub mod record;
pub mod spec;
pub mod value;

pub use config::{parse_context_rule, parse_field_specs, validate_field_specs};
pub use error::{ConfigError, ConfigResult};
pub use record::{ChangeKind, ChangeRecord};
pub use spec::{ArrayKind, ContextRule, FieldSpec, MaskRule};
pub use value::{Map, Value};
