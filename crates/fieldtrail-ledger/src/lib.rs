//! Audit entries for fieldtrail.
//!
//! Wraps change records into persistable [`AuditEntry`] values: subject
//! identity, entry kind, actor, optional context and, when whole-document
//! capture is on, masked and optionally compressed before/after snapshots.
//! Storage itself sits behind the [`AuditSink`] trait.
//!
//! # Key Types
//!
//! - [`AuditEntry`] / [`EntryKind`] — One persisted audit event
//! - [`EntryBuilder`] — Assembles entries, masking and compressing snapshots
//! - [`Compressor`] / [`ZstdCompressor`] — Snapshot compression
//! - [`AuditSink`] / [`InMemoryAuditSink`] — Persistence collaborator

pub mod builder;
pub mod compress;
pub mod entry;
pub mod error;
pub mod mask;
pub mod sink;

pub use builder::EntryBuilder;
pub use compress::{compress_snapshot, decompress_snapshot, Compressor, ZstdCompressor};
pub use entry::{AuditEntry, CompressedSnapshot, EntryKind, SnapshotData, Snapshots};
pub use error::{LedgerError, LedgerResult};
pub use mask::{mask_rules_from_specs, mask_snapshot, MaskRules};
pub use sink::{AuditSink, InMemoryAuditSink};
