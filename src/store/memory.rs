use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::error::{Result, TransarcError};
use crate::models::{HistoryEntry, PendingEntry, Record, Snapshot};
use crate::store::{ArchiveStore, HistoryStore, RecordStore, Truncation};

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<String, Record>,
    snapshots: Vec<Snapshot>,
    entries: Vec<HistoryEntry>,
    last_snapshot_id: i64,
    last_entry_id: i64,
    reject_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<()> {
        if self.reject_writes {
            return Err(TransarcError::Other("store rejected write".into()));
        }
        Ok(())
    }

    fn push_snapshot(&mut self, label: &str, record_count: usize) -> Snapshot {
        self.last_snapshot_id += 1;
        let snapshot = Snapshot {
            id: self.last_snapshot_id,
            created_at: Utc::now(),
            label: label.to_string(),
            record_count,
        };
        self.snapshots.push(snapshot.clone());
        snapshot
    }

    fn push_entries(&mut self, snapshot_id: i64, entries: Vec<PendingEntry>) -> Vec<HistoryEntry> {
        let mut written = Vec::with_capacity(entries.len());
        for pending in entries {
            self.last_entry_id += 1;
            let entry = pending.into_entry(self.last_entry_id, snapshot_id);
            self.entries.push(entry.clone());
            written.push(entry);
        }
        written
    }
}

/// Arena-backed store. Ids are monotonic and never reused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise persistence failures.
    pub fn reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    /// Number of history entries across all snapshots.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    fn all_records(&self) -> Result<Vec<Record>> {
        Ok(self.lock().records.values().cloned().collect())
    }

    fn record(&self, unique_id: &str) -> Result<Option<Record>> {
        Ok(self.lock().records.get(unique_id).cloned())
    }

    fn records_by_ids(&self, unique_ids: &[String]) -> Result<Vec<Record>> {
        let state = self.lock();
        Ok(unique_ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }

    fn upsert_record(&self, record: &Record) -> Result<()> {
        self.upsert_records(std::slice::from_ref(record))
    }

    fn upsert_records(&self, records: &[Record]) -> Result<()> {
        let mut state = self.lock();
        state.check_writable()?;
        for record in records {
            state
                .records
                .insert(record.unique_id.clone(), record.clone());
        }
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn create_snapshot(&self, label: &str, record_count: usize) -> Result<Snapshot> {
        let mut state = self.lock();
        state.check_writable()?;
        Ok(state.push_snapshot(label, record_count))
    }

    fn append_history(
        &self,
        snapshot_id: i64,
        entries: Vec<PendingEntry>,
    ) -> Result<Vec<HistoryEntry>> {
        let mut state = self.lock();
        state.check_writable()?;
        if !state.snapshots.iter().any(|s| s.id == snapshot_id) {
            return Err(TransarcError::SnapshotNotFound { id: snapshot_id });
        }
        Ok(state.push_entries(snapshot_id, entries))
    }

    fn snapshots(&self) -> Result<Vec<Snapshot>> {
        Ok(self.lock().snapshots.clone())
    }

    fn snapshot(&self, id: i64) -> Result<Option<Snapshot>> {
        Ok(self.lock().snapshots.iter().find(|s| s.id == id).cloned())
    }

    fn history_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        Ok(self.lock().entries.iter().find(|e| e.id == id).cloned())
    }

    fn history_for_record(&self, record_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.record_id == record_id)
            .cloned()
            .collect())
    }

    fn records_as_of(&self, snapshot_id: i64) -> Result<Vec<HistoryEntry>> {
        let state = self.lock();
        let mut latest: HashMap<&str, &HistoryEntry> = HashMap::new();
        for entry in state.entries.iter().filter(|e| e.snapshot_id <= snapshot_id) {
            let slot = latest.entry(entry.record_id.as_str()).or_insert(entry);
            if entry.id > slot.id {
                *slot = entry;
            }
        }
        let mut entries: Vec<HistoryEntry> = latest.into_values().cloned().collect();
        entries.sort_by(|a, b| a.record_id.cmp(&b.record_id));
        Ok(entries)
    }

    fn delete_snapshots_after(&self, snapshot_id: i64) -> Result<Truncation> {
        let mut state = self.lock();
        state.check_writable()?;
        let snapshots_before = state.snapshots.len();
        let entries_before = state.entries.len();
        state.snapshots.retain(|s| s.id <= snapshot_id);
        state.entries.retain(|e| e.snapshot_id <= snapshot_id);
        Ok(Truncation {
            snapshots_removed: snapshots_before - state.snapshots.len(),
            entries_removed: entries_before - state.entries.len(),
        })
    }
}

impl ArchiveStore for MemoryStore {
    fn commit_scan(
        &self,
        label: &str,
        records: &[Record],
        entries: Vec<PendingEntry>,
    ) -> Result<Snapshot> {
        let mut state = self.lock();
        state.check_writable()?;
        for record in records {
            state
                .records
                .insert(record.unique_id.clone(), record.clone());
        }
        let record_count = state.records.len();
        let snapshot = state.push_snapshot(label, record_count);
        state.push_entries(snapshot.id, entries);
        Ok(snapshot)
    }
}
