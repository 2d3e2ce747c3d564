use chrono::{DateTime, Utc};
use serde::Serialize;

/// A point on the linear timeline. Only created when a scan changed something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub label: String,
    /// Total number of archived records once this snapshot was written.
    pub record_count: usize,
}

/// One full-content capture of a record, belonging to one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub snapshot_id: i64,
    pub record_id: String,
    pub raw_text: String,
    /// SHA-256 of `raw_text` itself.
    pub content_signature: String,
}

/// A history entry waiting for its snapshot id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub record_id: String,
    pub raw_text: String,
    pub content_signature: String,
}

impl PendingEntry {
    #[must_use]
    pub fn new(record_id: &str, raw_text: &str, content_signature: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            raw_text: raw_text.to_string(),
            content_signature: content_signature.to_string(),
        }
    }

    #[must_use]
    pub fn into_entry(self, id: i64, snapshot_id: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            snapshot_id,
            record_id: self.record_id,
            raw_text: self.raw_text,
            content_signature: self.content_signature,
        }
    }
}
