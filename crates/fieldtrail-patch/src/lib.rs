//! Patch simulation for fieldtrail.
//!
//! Partial updates arrive as operator documents (`$set`, `$inc`, `$push`,
//! ...) rather than full after snapshots. This crate parses those documents
//! and predicts the after state of every tracked field, so that the diff
//! engine can audit partial updates exactly like full replacements.
//!
//! # Key Items
//!
//! - [`PatchOperationSet`] — Parsed update operators
//! - [`simulate`] — Predicted values of the tracked fields a patch touches
//! - [`overlay`] / [`predict_after`] — Predicted after snapshot

pub mod ops;
pub mod simulate;

pub use ops::{each, PatchOperationSet};
pub use simulate::{overlay, predict_after, simulate, SimulatedFields};
