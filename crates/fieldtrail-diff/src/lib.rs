//! Change-tracking engine for fieldtrail.
//!
//! Compares a before and an after snapshot under a declarative tracking
//! configuration and produces field-level change records (add, edit,
//! remove), including per-element changes inside keyed object arrays.
//! Everything in this crate is a pure function of its inputs.
//!
//! # Key Items
//!
//! - [`diff`] — Entry point: snapshots + [`FieldSpec`](fieldtrail_types::FieldSpec)s to change records
//! - [`exists`] / [`structurally_equal`] / [`semantically_equal`] / [`stringify`] — Value comparison
//! - [`diff_primitive_list`] / [`diff_keyed_list`] — Array differencing
//! - [`extract_context`] / [`merge_context`] — Context capture

pub mod array_diff;
pub mod compare;
pub mod context;
pub mod engine;

pub use array_diff::{diff_keyed_list, diff_primitive_list, KeyedChange, PrimitiveListDiff};
pub use compare::{exists, semantically_equal, stringify, structurally_equal};
pub use context::{extract_context, merge_context};
pub use engine::diff;
