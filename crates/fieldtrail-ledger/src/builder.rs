use chrono::{DateTime, Utc};
use fieldtrail_types::{ChangeRecord, Value};
use tracing::debug;
use uuid::Uuid;

use crate::compress::{compress_snapshot, Compressor};
use crate::entry::{AuditEntry, EntryKind, SnapshotData, Snapshots};
use crate::error::LedgerResult;
use crate::mask::{mask_snapshot, MaskRules};

/// Assembles an [`AuditEntry`].
///
/// Snapshots are only attached when whole-document capture is enabled; they
/// are masked first and compressed afterwards when a compressor is set.
///
/// # Examples
///
/// ```
/// use fieldtrail_ledger::{EntryBuilder, EntryKind};
/// use fieldtrail_types::{ChangeRecord, Value};
///
/// let entry = EntryBuilder::new("orders", "o-1", EntryKind::Update)
///     .changes(vec![ChangeRecord::edit("status", Some("open".into()), Some("closed".into()))])
///     .actor(Value::from("alice"))
///     .build()
///     .unwrap();
/// assert!(entry.snapshots.is_none());
/// assert!(!entry.deleted);
/// ```
pub struct EntryBuilder<'a> {
    subject: String,
    subject_id: String,
    kind: EntryKind,
    changes: Vec<ChangeRecord>,
    actor: Value,
    context: Option<Value>,
    before: Option<&'a Value>,
    after: Option<&'a Value>,
    capture_whole_document: bool,
    mask_rules: Option<&'a MaskRules>,
    compressor: Option<&'a dyn Compressor>,
    created_at: Option<DateTime<Utc>>,
}

impl<'a> EntryBuilder<'a> {
    pub fn new(subject: impl Into<String>, subject_id: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            subject: subject.into(),
            subject_id: subject_id.into(),
            kind,
            changes: Vec::new(),
            actor: Value::Null,
            context: None,
            before: None,
            after: None,
            capture_whole_document: false,
            mask_rules: None,
            compressor: None,
            created_at: None,
        }
    }

    pub fn changes(mut self, changes: Vec<ChangeRecord>) -> Self {
        self.changes = changes;
        self
    }

    pub fn actor(mut self, actor: Value) -> Self {
        self.actor = actor;
        self
    }

    pub fn context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }

    /// The document before the change; `None` for creations.
    pub fn before(mut self, before: Option<&'a Value>) -> Self {
        self.before = before;
        self
    }

    /// The document after the change; `None` for deletions.
    pub fn after(mut self, after: Option<&'a Value>) -> Self {
        self.after = after;
        self
    }

    pub fn capture_whole_document(mut self, enabled: bool) -> Self {
        self.capture_whole_document = enabled;
        self
    }

    pub fn mask_rules(mut self, rules: &'a MaskRules) -> Self {
        self.mask_rules = Some(rules);
        self
    }

    /// Compress captured snapshots with `compressor`.
    pub fn compress_with(mut self, compressor: &'a dyn Compressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Override the creation timestamp (defaults to now).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn build(self) -> LedgerResult<AuditEntry> {
        let snapshots = if self.capture_whole_document {
            Some(Snapshots {
                before: self.capture(self.before)?,
                after: self.capture(self.after)?,
            })
        } else {
            None
        };

        let entry = AuditEntry {
            id: Uuid::now_v7(),
            subject: self.subject,
            subject_id: self.subject_id,
            kind: self.kind,
            changes: self.changes,
            actor: self.actor,
            context: self.context,
            snapshots,
            deleted: false,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        debug!(
            id = %entry.id,
            subject = %entry.subject,
            kind = %entry.kind,
            changes = entry.changes.len(),
            "built audit entry"
        );
        Ok(entry)
    }

    fn capture(&self, doc: Option<&Value>) -> LedgerResult<Option<SnapshotData>> {
        let Some(doc) = doc.filter(|d| !d.is_null()) else {
            return Ok(None);
        };
        let masked = match self.mask_rules {
            Some(rules) => mask_snapshot(doc, rules),
            None => doc.clone(),
        };
        let data = match self.compressor {
            Some(compressor) => SnapshotData::Compressed(compress_snapshot(&masked, compressor)?),
            None => SnapshotData::Plain(masked),
        };
        Ok(Some(data))
    }
}
