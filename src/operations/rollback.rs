//! Rollback: return every record to its state as of a snapshot, push it to
//! disk and drop the later timeline.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TransarcError};
use crate::manifest::Manifest;
use crate::models::OperationOutcome;
use crate::operations::restore::{run_restore, RestoreResult, RestoreScope, RestoreTarget};
use crate::store::{ArchiveStore, Truncation};
use crate::vfs::FileAccess;

#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    pub snapshot_id: i64,
    /// Records whose archived state was rewritten.
    pub records_reverted: usize,
    pub restore: RestoreResult,
    pub truncation: Truncation,
    /// Set when the records were reverted but the later snapshots survived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_error: Option<String>,
}

impl From<RollbackResult> for OperationOutcome {
    fn from(result: RollbackResult) -> Self {
        let partial = !result.restore.errors.is_empty() || result.truncation_error.is_some();
        let mut message = format!(
            "{} {} record(s) to snapshot #{}; patched {} file(s), removed {} later snapshot(s)",
            if partial { "Partially rolled back" } else { "Rolled back" },
            result.records_reverted,
            result.snapshot_id,
            result.restore.patched.len(),
            result.truncation.snapshots_removed,
        );
        if result.truncation_error.is_some() {
            message.push_str("; later snapshots were kept");
        }
        let mut details = result.restore.errors;
        details.extend(result.truncation_error);
        Self {
            success: !partial,
            success_count: result.records_reverted,
            error_count: details.len(),
            message,
            details,
        }
    }
}

/// Two phases then truncation. A failing record batch aborts before any
/// file is touched. Once the batch has landed nothing undoes it: disk
/// failures and a failed truncation make the result partial instead.
pub fn run_rollback<S: ArchiveStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    snapshot_id: i64,
) -> Result<RollbackResult> {
    if !fs.is_dir(target.root) {
        return Err(TransarcError::RootNotFound {
            path: target.root.display().to_string(),
        });
    }
    if store.snapshot(snapshot_id)?.is_none() {
        return Err(TransarcError::SnapshotNotFound { id: snapshot_id });
    }

    let entries = store.records_as_of(snapshot_id)?;
    let ids: Vec<String> = entries.iter().map(|e| e.record_id.clone()).collect();
    let mut records = store.records_by_ids(&ids)?;
    let now = Utc::now();

    for record in &mut records {
        let Some(entry) = entries.iter().find(|e| e.record_id == record.unique_id) else {
            continue;
        };
        match Manifest::parse(&entry.raw_text) {
            Ok(manifest) => {
                record.translated_name = manifest.name;
                record.translated_description = manifest.description;
            }
            Err(e) => {
                warn!(id = %record.unique_id, entry = entry.id, error = %e, "archived text no longer parses");
            }
        }
        record.current_raw_text.clone_from(&entry.raw_text);
        record.content_fingerprint = Some(entry.content_signature.clone());
        record.last_updated_at = now;
    }

    store.upsert_records(&records)?;
    info!(snapshot = snapshot_id, records = records.len(), "archived state rolled back");

    let restore = run_restore(store, fs, target, RestoreScope::All)?;
    let (truncation, truncation_error) = match store.delete_snapshots_after(snapshot_id) {
        Ok(truncation) => {
            info!(
                snapshots = truncation.snapshots_removed,
                entries = truncation.entries_removed,
                "later history discarded"
            );
            (truncation, None)
        }
        Err(e) => {
            warn!(snapshot = snapshot_id, error = %e, "records reverted but later history kept");
            (Truncation::default(), Some(format!("timeline truncation failed: {e}")))
        }
    };

    Ok(RollbackResult {
        snapshot_id,
        records_reverted: records.len(),
        restore,
        truncation,
        truncation_error,
    })
}

/// Run a rollback and fold every failure into an [`OperationOutcome`].
pub fn rollback<S: ArchiveStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    snapshot_id: i64,
) -> OperationOutcome {
    match run_rollback(store, fs, target, snapshot_id) {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(error = %e, "rollback failed");
            OperationOutcome::failure(&e)
        }
    }
}
