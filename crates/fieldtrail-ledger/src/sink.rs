use std::sync::{PoisonError, RwLock};

use crate::entry::AuditEntry;
use crate::error::{LedgerError, LedgerResult};

/// Persistence collaborator for audit entries.
///
/// Implementations must keep entries in append order per subject so that
/// [`find_by_subject`](AuditSink::find_by_subject) returns history oldest
/// first.
pub trait AuditSink: Send + Sync {
    /// Store one entry.
    fn append(&self, entry: AuditEntry) -> LedgerResult<()>;

    /// Store several entries.
    ///
    /// Default implementation calls `append()` for each entry and stops at the
    /// first failure. Backends may override to write in one round-trip.
    fn append_batch(&self, entries: Vec<AuditEntry>) -> LedgerResult<()> {
        entries.into_iter().try_for_each(|entry| self.append(entry))
    }

    /// All entries recorded for one document.
    fn find_by_subject(&self, subject: &str, subject_id: &str) -> LedgerResult<Vec<AuditEntry>>;
}

/// In-memory, Vec-based audit sink.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`.
pub struct InMemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored entry in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> LedgerResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.push(entry);
        Ok(())
    }

    fn append_batch(&self, batch: Vec<AuditEntry>) -> LedgerResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.extend(batch);
        Ok(())
    }

    fn find_by_subject(&self, subject: &str, subject_id: &str) -> LedgerResult<Vec<AuditEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .filter(|e| e.subject == subject && e.subject_id == subject_id)
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAuditSink")
            .field("entry_count", &self.len())
            .finish()
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Sink("lock poisoned".into())
}
