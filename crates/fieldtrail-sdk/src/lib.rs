//! High-level SDK for fieldtrail.
//!
//! Wires configuration, patch simulation, diffing, entry assembly and the
//! persistence sink behind one [`Auditor`] per audited subject. This is the
//! main entry point for applications embedding fieldtrail.
//!
//! ```
//! use std::sync::Arc;
//! use fieldtrail_sdk::{Auditor, AuditorConfig, FieldSpec, InMemoryAuditSink, Value};
//!
//! let config = AuditorConfig::new("orders", vec![FieldSpec::scalar("status")]);
//! let auditor = Auditor::new(config, Arc::new(InMemoryAuditSink::new())).unwrap();
//!
//! let before = Value::from(serde_json::json!({"_id": "o-1", "status": "open"}));
//! let patch = Value::from(serde_json::json!({"$set": {"status": "closed"}}));
//! let entry = auditor.record_patch(&before, &patch, Value::from("alice")).unwrap();
//! assert_eq!(entry.changes[0].to_value.as_deref(), Some("closed"));
//! assert_eq!(auditor.history("o-1").unwrap().len(), 1);
//! ```

pub mod auditor;
pub mod config;
pub mod error;
pub mod logger;

pub use auditor::Auditor;
pub use config::{AuditorConfig, DEFAULT_ID_PATH};
pub use error::{SdkError, SdkResult};
pub use logger::{AuditLogger, TracingLogger};

// Re-export key types
pub use fieldtrail_ledger::{AuditEntry, AuditSink, EntryKind, InMemoryAuditSink};
pub use fieldtrail_types::{ChangeKind, ChangeRecord, ContextRule, FieldSpec, MaskRule, Value};
