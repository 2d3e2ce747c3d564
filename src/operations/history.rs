//! Read-only timeline queries.

use crate::error::{Result, TransarcError};
use crate::models::{HistoryEntry, Snapshot};
use crate::store::{HistoryStore, RecordStore};

/// All snapshots, oldest first.
pub fn list_snapshots<S: HistoryStore + ?Sized>(store: &S) -> Result<Vec<Snapshot>> {
    store.snapshots()
}

/// Every archived capture of one record, oldest first.
pub fn record_history<S: RecordStore + HistoryStore + ?Sized>(
    store: &S,
    unique_id: &str,
) -> Result<Vec<HistoryEntry>> {
    if store.record(unique_id)?.is_none() {
        return Err(TransarcError::RecordNotFound {
            unique_id: unique_id.to_string(),
        });
    }
    store.history_for_record(unique_id)
}

/// The most recent capture of a record at or before a snapshot, or `None`
/// when the record had not been archived yet.
pub fn record_as_of<S: HistoryStore + ?Sized>(
    store: &S,
    unique_id: &str,
    snapshot_id: i64,
) -> Result<Option<HistoryEntry>> {
    if store.snapshot(snapshot_id)?.is_none() {
        return Err(TransarcError::SnapshotNotFound { id: snapshot_id });
    }
    Ok(store
        .history_for_record(unique_id)?
        .into_iter()
        .filter(|e| e.snapshot_id <= snapshot_id)
        .max_by_key(|e| e.id))
}
