//! Reset one record to the text captured when it was first archived.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TransarcError};
use crate::models::OperationOutcome;
use crate::operations::restore::{run_restore, RestoreResult, RestoreScope, RestoreTarget};
use crate::store::RecordStore;
use crate::vfs::FileAccess;

#[derive(Debug, Clone, Serialize)]
pub struct ResetResult {
    pub unique_id: String,
    pub restore: RestoreResult,
}

impl From<ResetResult> for OperationOutcome {
    fn from(result: ResetResult) -> Self {
        let patched = result.restore.patched.len();
        Self {
            success: true,
            success_count: patched,
            error_count: result.restore.errors.len(),
            message: format!(
                "Reset {} to its original text; patched {patched} file(s)",
                result.unique_id
            ),
            details: result.restore.errors,
        }
    }
}

/// Put the original name and description back as the record's translation
/// and push them to disk for that record only.
pub fn reset_record<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    unique_id: &str,
) -> Result<ResetResult> {
    let mut record = store
        .record(unique_id)?
        .ok_or_else(|| TransarcError::RecordNotFound {
            unique_id: unique_id.to_string(),
        })?;
    if record.original_raw_text.is_empty() {
        return Err(TransarcError::Other(format!(
            "no original text captured for {unique_id}; run sync first"
        )));
    }

    record.translated_name.clone_from(&record.original_name);
    record.translated_description.clone_from(&record.original_description);
    record.last_updated_at = Utc::now();
    store.upsert_record(&record)?;
    info!(id = %unique_id, "translation reset to baseline");

    let only = [unique_id.to_string()];
    let restore = run_restore(store, fs, target, RestoreScope::Only(&only))?;
    Ok(ResetResult {
        unique_id: unique_id.to_string(),
        restore,
    })
}

/// Run a reset and fold every failure into an [`OperationOutcome`].
pub fn reset<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    unique_id: &str,
) -> OperationOutcome {
    match reset_record(store, fs, target, unique_id) {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(error = %e, "reset failed");
            OperationOutcome::failure(&e)
        }
    }
}
