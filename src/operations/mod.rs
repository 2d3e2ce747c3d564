//! Entry points shared by the CLI and library callers.
//!
//! Each mutating operation has a `run_*` form returning a typed result and a
//! thin wrapper folding it into an [`OperationOutcome`](crate::models::OperationOutcome).

pub mod diff;
pub mod history;
pub mod legacy;
pub mod reset;
pub mod restore;
pub mod rollback;
pub mod sync;
pub mod verify;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Result, TransarcError};

pub use diff::{build_diff, diff_entry, diff_snapshots, ChangeKind, FieldChange, ManifestDiff, RecordDiff};
pub use history::{list_snapshots, record_as_of, record_history};
pub use legacy::{
    build_legacy_backup, export_legacy, import_legacy, import_legacy_text, ImportResult,
    LegacyBackup, LegacyEntry,
};
pub use reset::{reset, reset_record, ResetResult};
pub use restore::{restore, run_restore, RestoreResult, RestoreScope, RestoreTarget};
pub use rollback::{rollback, run_rollback, RollbackResult};
pub use sync::{run_sync, sync, SyncResult};
pub use verify::verify_archive;

/// Open the archive for a mods root, creating `.transarc/` and a default
/// `config.toml` on first use. The root itself must already exist.
pub fn open_archive(config: &Config) -> Result<Database> {
    if !config.mods_root.is_dir() {
        return Err(TransarcError::RootNotFound {
            path: config.mods_root.display().to_string(),
        });
    }
    config.ensure_data_dir()?;
    if !config.config_path.exists() {
        config.save_settings()?;
    }
    Database::open(&config.db_path)
}

/// Restore target described by the configuration.
#[must_use]
pub fn restore_target(config: &Config) -> RestoreTarget<'_> {
    RestoreTarget {
        root: &config.mods_root,
        manifest_name: &config.settings.scan.manifest_name,
        max_depth: config.settings.restore.max_depth,
    }
}
