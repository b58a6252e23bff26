use std::sync::Arc;

use fieldtrail_diff::{diff, extract_context, stringify};
use fieldtrail_ledger::{
    mask_rules_from_specs, AuditEntry, AuditSink, Compressor, EntryBuilder, EntryKind, MaskRules,
    ZstdCompressor,
};
use fieldtrail_patch::{predict_after, PatchOperationSet};
use fieldtrail_types::{path, Value};
use tracing::debug;

use crate::config::AuditorConfig;
use crate::error::{SdkError, SdkResult};
use crate::logger::{AuditLogger, TracingLogger};

/// Audits document writes for one subject.
///
/// `prepare_*` methods are pure: they diff and assemble an entry without
/// touching the sink. `record_*` methods also persist the entry; any failure
/// on that path is reported to the [`AuditLogger`] and swallowed, so auditing
/// never aborts the write being audited.
pub struct Auditor {
    config: AuditorConfig,
    mask_rules: MaskRules,
    sink: Arc<dyn AuditSink>,
    logger: Arc<dyn AuditLogger>,
    compressor: Arc<dyn Compressor>,
}

impl Auditor {
    /// Validate `config` once and wire the default collaborators.
    pub fn new(config: AuditorConfig, sink: Arc<dyn AuditSink>) -> SdkResult<Self> {
        config.validate()?;
        let mask_rules = mask_rules_from_specs(&config.fields);
        debug!(
            subject = %config.subject,
            fields = config.fields.len(),
            "auditor configured"
        );
        Ok(Self {
            config,
            mask_rules,
            sink,
            logger: Arc::new(TracingLogger),
            compressor: Arc::new(ZstdCompressor::default()),
        })
    }

    pub fn with_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    // ---- Pure entry assembly ----

    /// Entry for a newly inserted document. Always produced.
    pub fn prepare_create(&self, after: &Value, actor: Value) -> SdkResult<Option<AuditEntry>> {
        let subject_id = self.subject_id(after)?;
        self.build(EntryKind::Create, subject_id, None, Some(after), actor)
            .map(Some)
    }

    /// Entry for a full replacement; `None` when no tracked field changed.
    pub fn prepare_update(
        &self,
        before: &Value,
        after: &Value,
        actor: Value,
    ) -> SdkResult<Option<AuditEntry>> {
        let subject_id = self
            .subject_id(after)
            .or_else(|_| self.subject_id(before))?;
        let entry = self.build(EntryKind::Update, subject_id, Some(before), Some(after), actor)?;
        Ok(entry.has_changes().then_some(entry))
    }

    /// Entry for a partial update given as an operator document.
    ///
    /// The after state is predicted from `before` and `patch` for the tracked
    /// fields only.
    pub fn prepare_patch(
        &self,
        before: &Value,
        patch: &Value,
        actor: Value,
    ) -> SdkResult<Option<AuditEntry>> {
        self.prepare_ops(before, &PatchOperationSet::from_value(patch), actor)
    }

    /// Entry for a removed document. Always produced.
    pub fn prepare_delete(&self, before: &Value, actor: Value) -> SdkResult<Option<AuditEntry>> {
        let subject_id = self.subject_id(before)?;
        self.build(EntryKind::Delete, subject_id, Some(before), None, actor)
            .map(Some)
    }

    // ---- Persisting variants ----

    /// Audit an insert. Returns the stored entry, or `None` on failure.
    pub fn record_create(&self, after: &Value, actor: Value) -> Option<AuditEntry> {
        self.persist(self.prepare_create(after, actor))
    }

    /// Audit a replacement. Returns the stored entry, or `None` when nothing
    /// changed or the entry could not be stored.
    pub fn record_update(&self, before: &Value, after: &Value, actor: Value) -> Option<AuditEntry> {
        self.persist(self.prepare_update(before, after, actor))
    }

    /// Audit a partial update. A patch without update operators is reported
    /// through [`AuditLogger::warn`] and produces no entry.
    pub fn record_patch(&self, before: &Value, patch: &Value, actor: Value) -> Option<AuditEntry> {
        let ops = PatchOperationSet::from_value(patch);
        if ops.is_empty() {
            self.logger.warn("patch carries no update operators; nothing to audit");
            return None;
        }
        self.persist(self.prepare_ops(before, &ops, actor))
    }

    pub fn record_delete(&self, before: &Value, actor: Value) -> Option<AuditEntry> {
        self.persist(self.prepare_delete(before, actor))
    }

    /// Stored entries for one document, oldest first.
    pub fn history(&self, subject_id: &str) -> SdkResult<Vec<AuditEntry>> {
        Ok(self.sink.find_by_subject(&self.config.subject, subject_id)?)
    }

    fn prepare_ops(
        &self,
        before: &Value,
        ops: &PatchOperationSet,
        actor: Value,
    ) -> SdkResult<Option<AuditEntry>> {
        let after = predict_after(ops, Some(before), &self.config.fields);
        self.prepare_update(before, &after, actor)
    }

    fn persist(&self, prepared: SdkResult<Option<AuditEntry>>) -> Option<AuditEntry> {
        let entry = match prepared {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                self.logger.error(&e, "failed to build audit entry");
                return None;
            }
        };
        match self.sink.append(entry.clone()) {
            Ok(()) => Some(entry),
            Err(e) => {
                self.logger.error(&e, "failed to persist audit entry");
                None
            }
        }
    }

    fn build(
        &self,
        kind: EntryKind,
        subject_id: String,
        before: Option<&Value>,
        after: Option<&Value>,
        actor: Value,
    ) -> SdkResult<AuditEntry> {
        let changes = diff(before, after, &self.config.fields);
        let context = extract_context(self.config.context.as_ref(), before, after, None, None);
        let mut builder = EntryBuilder::new(&self.config.subject, subject_id, kind)
            .changes(changes)
            .actor(actor)
            .context(context)
            .before(before)
            .after(after)
            .capture_whole_document(self.config.capture_whole_document)
            .mask_rules(&self.mask_rules);
        if self.config.compress {
            builder = builder.compress_with(self.compressor.as_ref());
        }
        Ok(builder.build()?)
    }

    fn subject_id(&self, doc: &Value) -> SdkResult<String> {
        stringify(path::get(doc, &self.config.id_path), None)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SdkError::MissingSubjectId {
                path: self.config.id_path.clone(),
            })
    }
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor")
            .field("subject", &self.config.subject)
            .field("fields", &self.config.fields.len())
            .field("codec", &self.compressor.codec())
            .finish()
    }
}
