use std::fmt;

use chrono::{DateTime, Utc};
use fieldtrail_types::{ChangeRecord, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the audited document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Create => "create",
            EntryKind::Update => "update",
            EntryKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A compressed snapshot payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedSnapshot {
    pub codec: String,
    /// Compressed canonical JSON, hex-encoded when serialized.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// CRC32 of `data`.
    pub crc32: u32,
}

/// A whole-document snapshot, stored as-is or compressed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotData {
    Plain(Value),
    Compressed(CompressedSnapshot),
}

impl SnapshotData {
    pub fn is_compressed(&self) -> bool {
        matches!(self, SnapshotData::Compressed(_))
    }

    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            SnapshotData::Plain(v) => Some(v),
            SnapshotData::Compressed(_) => None,
        }
    }
}

/// Captured before/after documents. Either side is `None` when the document
/// did not exist on that side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    pub before: Option<SnapshotData>,
    pub after: Option<SnapshotData>,
}

/// One persisted audit event.
///
/// `snapshots` is present only when whole-document capture is enabled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub subject: String,
    pub subject_id: String,
    pub kind: EntryKind,
    pub changes: Vec<ChangeRecord>,
    pub actor: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Snapshots>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
