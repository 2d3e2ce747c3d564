//! Storage capabilities the pipelines depend on.
//!
//! `Database` (SQLite) is the durable implementation; [`MemoryStore`] backs
//! tests. Relationships are plain ids resolved at query time.

pub mod memory;

use serde::Serialize;

use crate::error::Result;
use crate::models::{HistoryEntry, PendingEntry, Record, Snapshot};

pub use memory::MemoryStore;

pub trait RecordStore {
    fn all_records(&self) -> Result<Vec<Record>>;

    fn record(&self, unique_id: &str) -> Result<Option<Record>>;

    fn records_by_ids(&self, unique_ids: &[String]) -> Result<Vec<Record>>;

    fn upsert_record(&self, record: &Record) -> Result<()>;

    /// Upsert all records in one batch; either all land or none do.
    fn upsert_records(&self, records: &[Record]) -> Result<()>;
}

pub trait HistoryStore {
    fn create_snapshot(&self, label: &str, record_count: usize) -> Result<Snapshot>;

    fn append_history(
        &self,
        snapshot_id: i64,
        entries: Vec<PendingEntry>,
    ) -> Result<Vec<HistoryEntry>>;

    /// All snapshots, oldest first.
    fn snapshots(&self) -> Result<Vec<Snapshot>>;

    fn snapshot(&self, id: i64) -> Result<Option<Snapshot>>;

    fn history_entry(&self, id: i64) -> Result<Option<HistoryEntry>>;

    /// Every entry for one record, oldest first.
    fn history_for_record(&self, record_id: &str) -> Result<Vec<HistoryEntry>>;

    /// For each record with an entry in a snapshot `<= snapshot_id`, the entry
    /// with the greatest id. Ordered by record id.
    fn records_as_of(&self, snapshot_id: i64) -> Result<Vec<HistoryEntry>>;

    /// Drop every snapshot after `snapshot_id` together with its entries.
    fn delete_snapshots_after(&self, snapshot_id: i64) -> Result<Truncation>;
}

/// Both capabilities plus the atomic write a sync needs.
pub trait ArchiveStore: RecordStore + HistoryStore {
    /// Persist touched records, a new snapshot and one entry per record together.
    fn commit_scan(
        &self,
        label: &str,
        records: &[Record],
        entries: Vec<PendingEntry>,
    ) -> Result<Snapshot>;
}

/// What a timeline truncation removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub snapshots_removed: usize,
    pub entries_removed: usize,
}
