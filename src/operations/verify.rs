//! Archive health check. Read-only: nothing is repaired.

use std::path::Path;

use crate::db::queries::VerifyReport;
use crate::db::Database;
use crate::error::Result;
use crate::store::RecordStore;
use crate::vfs::FileAccess;

/// Verify archive integrity and check every record against the mods root.
///
/// Checks:
/// - `SQLite` integrity
/// - Orphan history entries (snapshot or record gone)
/// - Stale records (fingerprint does not match the archived text)
/// - Records whose manifest no longer exists on disk
pub fn verify_archive(db: &Database, fs: &dyn FileAccess, root: &Path) -> Result<VerifyReport> {
    let mut report = db.verify_integrity()?;

    for record in db.all_records()? {
        if record.is_stale() {
            report.stale_records.push(record.unique_id.clone());
        }
        if !fs.exists(&root.join(&record.relative_path)) {
            report.missing_manifests.push(record.relative_path);
        }
    }

    Ok(report)
}
