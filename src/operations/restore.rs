//! Restore: push archived translations back onto the manifests on disk.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, TransarcError};
use crate::manifest::{patch_field, Manifest, ManifestField};
use crate::models::{OperationOutcome, Record};
use crate::store::RecordStore;
use crate::vfs::{relative_path, FileAccess};

/// Which records a restore may touch.
#[derive(Debug, Clone, Copy)]
pub enum RestoreScope<'a> {
    All,
    Only(&'a [String]),
}

impl RestoreScope<'_> {
    fn includes(&self, unique_id: &str) -> bool {
        match self {
            RestoreScope::All => true,
            RestoreScope::Only(ids) => ids.iter().any(|id| id == unique_id),
        }
    }
}

/// Where to look for manifests and how deep.
#[derive(Debug, Clone, Copy)]
pub struct RestoreTarget<'a> {
    pub root: &'a Path,
    pub manifest_name: &'a str,
    pub max_depth: Option<usize>,
}

/// Statistics from one restore run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreResult {
    /// Records that had a translation to push.
    pub translated_records: usize,
    pub files_examined: usize,
    /// Relative paths of files that were rewritten.
    pub patched: Vec<String>,
    pub errors: Vec<String>,
}

impl From<RestoreResult> for OperationOutcome {
    fn from(result: RestoreResult) -> Self {
        let message = if result.translated_records == 0 {
            "Nothing needed restoring: no record has a translation".to_string()
        } else if result.patched.is_empty() {
            format!("All {} manifest(s) already up to date", result.files_examined)
        } else {
            format!(
                "Restored translations into {} of {} manifest(s)",
                result.patched.len(),
                result.files_examined
            )
        };
        Self {
            success: true,
            success_count: result.patched.len(),
            error_count: result.errors.len(),
            message,
            details: result.errors,
        }
    }
}

enum FileRestore {
    Patched(String),
    Untouched,
    Failed(String),
}

/// Patch every manifest under the target whose record carries a translation
/// that differs from what the file holds. Files are written only when the
/// text actually changed.
pub fn run_restore<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    scope: RestoreScope<'_>,
) -> Result<RestoreResult> {
    if !fs.is_dir(target.root) {
        return Err(TransarcError::RootNotFound {
            path: target.root.display().to_string(),
        });
    }

    let records: HashMap<String, Record> = store
        .all_records()?
        .into_iter()
        .filter(|r| r.has_translation() && scope.includes(&r.unique_id))
        .map(|r| (r.unique_id.clone(), r))
        .collect();

    let mut result = RestoreResult {
        translated_records: records.len(),
        ..Default::default()
    };
    if records.is_empty() {
        debug!("no translated records, nothing to restore");
        return Ok(result);
    }

    let paths = fs.find_files(target.root, target.manifest_name, target.max_depth)?;
    result.files_examined = paths.len();

    let outcomes: Vec<FileRestore> = paths
        .par_iter()
        .map(|path| restore_file(fs, target.root, path, &records))
        .collect();

    for outcome in outcomes {
        match outcome {
            FileRestore::Patched(rel) => result.patched.push(rel),
            FileRestore::Untouched => {}
            FileRestore::Failed(detail) => result.errors.push(detail),
        }
    }

    info!(
        patched = result.patched.len(),
        examined = result.files_examined,
        errors = result.errors.len(),
        "restore finished"
    );
    Ok(result)
}

fn restore_file(
    fs: &dyn FileAccess,
    root: &Path,
    path: &Path,
    records: &HashMap<String, Record>,
) -> FileRestore {
    let rel = relative_path(root, path);
    match patch_one(fs, path, &rel, records) {
        Ok(true) => FileRestore::Patched(rel),
        Ok(false) => FileRestore::Untouched,
        Err(e) => {
            warn!(path = %rel, error = %e, "cannot restore manifest");
            FileRestore::Failed(format!("{rel}: {e}"))
        }
    }
}

/// Returns whether the file was rewritten.
fn patch_one(
    fs: &dyn FileAccess,
    path: &Path,
    rel: &str,
    records: &HashMap<String, Record>,
) -> Result<bool> {
    let text = fs.read_text(path)?;
    let manifest = Manifest::parse_file(&text, rel)?;
    let Some(record) = manifest
        .unique_id
        .as_deref()
        .and_then(|id| records.get(id))
    else {
        return Ok(false);
    };

    let mut patched = text.clone();
    if differs(record.translated_name.as_deref(), manifest.name.as_deref()) {
        patched = patch_field(&patched, ManifestField::Name, record.translated_name.as_deref());
    }
    if differs(
        record.translated_description.as_deref(),
        manifest.description.as_deref(),
    ) {
        patched = patch_field(
            &patched,
            ManifestField::Description,
            record.translated_description.as_deref(),
        );
    }

    if patched == text {
        return Ok(false);
    }
    fs.write_text(path, &patched)?;
    debug!(path = %rel, id = %record.unique_id, "patched");
    Ok(true)
}

fn differs(translated: Option<&str>, current: Option<&str>) -> bool {
    translated.is_some_and(|t| !t.is_empty() && Some(t) != current)
}

/// Run a restore and fold every failure into an [`OperationOutcome`].
pub fn restore<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    target: &RestoreTarget<'_>,
    scope: RestoreScope<'_>,
) -> OperationOutcome {
    match run_restore(store, fs, target, scope) {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(error = %e, "restore failed");
            OperationOutcome::failure(&e)
        }
    }
}
