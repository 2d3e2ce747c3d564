//! Sync: scan the mods root and archive every changed manifest.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::ScanSettings;
use crate::error::{Result, TransarcError};
use crate::ingest::hasher;
use crate::ingest::scanner::{discover_manifests, ScanOutcome, ScannedManifest, Scanner};
use crate::models::{OperationOutcome, PendingEntry, Record, Snapshot};
use crate::store::ArchiveStore;
use crate::vfs::{path_key, FileAccess};

/// Statistics from one sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub files_scanned: usize,
    pub unchanged: usize,
    /// UniqueIDs archived in this run.
    pub changed: Vec<String>,
    /// One human-readable line per file that could not be ingested.
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    pub cancelled: bool,
}

impl From<SyncResult> for OperationOutcome {
    fn from(result: SyncResult) -> Self {
        let changed = result.changed.len();
        let message = match (&result.snapshot, result.cancelled) {
            (Some(s), true) => format!(
                "Sync cancelled; archived {changed} record(s) into snapshot #{}",
                s.id
            ),
            (None, true) => "Sync cancelled before any change was archived".to_string(),
            (Some(s), false) => format!("Archived {changed} changed record(s) into snapshot #{}", s.id),
            (None, false) => format!("No changes detected in {} manifest(s)", result.files_scanned),
        };
        Self {
            success: !result.cancelled,
            success_count: changed,
            error_count: result.errors.len(),
            message,
            details: result.errors,
        }
    }
}

/// Scan `root`, fold changed manifests into records and persist them with one
/// snapshot. Fails only when the root is missing or the store rejects the batch.
pub fn run_sync<S: ArchiveStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    root: &Path,
    settings: &ScanSettings,
    label: Option<&str>,
    cancel: &CancelToken,
) -> Result<SyncResult> {
    if !fs.is_dir(root) {
        return Err(TransarcError::RootNotFound {
            path: root.display().to_string(),
        });
    }

    let paths = discover_manifests(fs, root, &settings.manifest_name, settings.ingest_depth)?;
    let existing = store.all_records()?;
    let scanner = Scanner::new(fs, root, &existing);
    let outcomes = scanner.scan(&paths, cancel);

    let mut result = SyncResult {
        files_scanned: paths.len(),
        ..Default::default()
    };

    // Aggregation is single-threaded; only this loop touches the batch.
    let mut by_id: HashMap<String, Record> = existing
        .into_iter()
        .map(|r| (r.unique_id.clone(), r))
        .collect();
    let mut touched: Vec<Record> = Vec::new();
    let mut entries: Vec<PendingEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let owners = claim_owners(&outcomes, &by_id);
    let now = Utc::now();

    for outcome in outcomes {
        match outcome {
            ScanOutcome::Unchanged { relative_path, .. } => {
                debug!(path = %relative_path, "unchanged");
                result.unchanged += 1;
            }
            ScanOutcome::Failed {
                relative_path,
                error,
            } => {
                warn!(path = %relative_path, error = %error, "cannot ingest manifest");
                result.errors.push(error.to_string());
            }
            ScanOutcome::Changed(scanned) => {
                match ingest(&mut by_id, &mut seen, &owners, &scanned, now) {
                    Ok(record) => {
                        entries.push(PendingEntry::new(
                            &record.unique_id,
                            &record.current_raw_text,
                            &hasher::hash_bytes(record.current_raw_text.as_bytes()),
                        ));
                        result.changed.push(record.unique_id.clone());
                        touched.push(record);
                    }
                    Err(error) => {
                        warn!(path = %scanned.relative_path, error = %error, "skipping manifest");
                        result.errors.push(error.to_string());
                    }
                }
            }
            ScanOutcome::Cancelled => {
                result.cancelled = true;
                break;
            }
        }
        // Whatever was folded so far is still committed.
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }
    }

    if !touched.is_empty() {
        let label = label.unwrap_or(&settings.default_label);
        let snapshot = store.commit_scan(label, &touched, entries)?;
        info!(
            snapshot = snapshot.id,
            records = touched.len(),
            "archived changed manifests"
        );
        result.snapshot = Some(snapshot);
    } else {
        debug!("no changes, no snapshot");
    }

    Ok(result)
}

/// UniqueID -> path key of the file that keeps the record this run.
///
/// A file still at its record's archived path owns that record, whether it
/// is unchanged or edited. Any other file carrying the same id (a backup
/// copy of the mod folder, say) is a duplicate and cannot move the record.
fn claim_owners(outcomes: &[ScanOutcome], by_id: &HashMap<String, Record>) -> HashMap<String, String> {
    let mut owners = HashMap::new();
    for outcome in outcomes {
        match outcome {
            ScanOutcome::Unchanged {
                relative_path,
                unique_id,
            } => {
                owners.insert(unique_id.clone(), path_key(relative_path));
            }
            ScanOutcome::Changed(scanned) => {
                let Some(id) = scanned.manifest.unique_id.as_deref() else {
                    continue;
                };
                let key = path_key(&scanned.relative_path);
                if by_id
                    .get(id)
                    .is_some_and(|r| path_key(&r.relative_path) == key)
                {
                    owners.insert(id.to_string(), key);
                }
            }
            ScanOutcome::Failed { .. } | ScanOutcome::Cancelled => {}
        }
    }
    owners
}

/// Resolve (or create) the record for one scanned manifest and fold the
/// new content into it.
fn ingest(
    by_id: &mut HashMap<String, Record>,
    seen: &mut HashSet<String>,
    owners: &HashMap<String, String>,
    scanned: &ScannedManifest,
    now: chrono::DateTime<Utc>,
) -> Result<Record> {
    let unique_id = scanned
        .manifest
        .require_unique_id(&scanned.relative_path)?
        .to_string();

    let claimed_elsewhere = owners
        .get(&unique_id)
        .is_some_and(|owner| *owner != path_key(&scanned.relative_path));
    if claimed_elsewhere || !seen.insert(unique_id.clone()) {
        return Err(TransarcError::Parse {
            path: scanned.relative_path.clone(),
            detail: format!("duplicate UniqueID {unique_id}"),
        });
    }

    let record = by_id
        .entry(unique_id.clone())
        .or_insert_with(|| Record::new(unique_id.clone(), scanned.relative_path.clone()));

    if record.relative_path != scanned.relative_path {
        debug!(
            id = %unique_id,
            from = %record.relative_path,
            to = %scanned.relative_path,
            "manifest moved"
        );
        record.content_fingerprint = None;
    }

    record.ingest(
        &scanned.relative_path,
        &scanned.raw_text,
        &scanned.fingerprint,
        &scanned.manifest,
        now,
    );
    Ok(record.clone())
}

/// Run a sync and fold every failure into an [`OperationOutcome`].
pub fn sync<S: ArchiveStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    root: &Path,
    settings: &ScanSettings,
    label: Option<&str>,
    cancel: &CancelToken,
) -> OperationOutcome {
    match run_sync(store, fs, root, settings, label, cancel) {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(error = %e, "sync failed");
            OperationOutcome::failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{HistoryStore, MemoryStore, RecordStore};
    use crate::vfs::MemoryFs;
    use std::path::PathBuf;

    const ROOT: &str = "/mods";

    fn setup(files: &[(&str, &str)]) -> (MemoryStore, MemoryFs) {
        let fs = MemoryFs::new();
        fs.add_dir(ROOT);
        for (path, text) in files {
            fs.add_file(format!("{ROOT}/{path}"), text);
        }
        (MemoryStore::new(), fs)
    }

    fn run(store: &MemoryStore, fs: &MemoryFs) -> SyncResult {
        run_sync(
            store,
            fs,
            Path::new(ROOT),
            &ScanSettings::default(),
            None,
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn missing_root_is_fatal() {
        let (store, fs) = setup(&[]);
        let out = sync(
            &store,
            &fs,
            Path::new("/elsewhere"),
            &ScanSettings::default(),
            None,
            &CancelToken::new(),
        );
        assert!(!out.success);
        assert!(out.message.contains("/elsewhere"));
    }

    #[test]
    fn missing_unique_id_is_reported_not_fatal() {
        let (store, fs) = setup(&[
            ("A/manifest.json", r#"{"Name":"A","UniqueID":"  "}"#),
            ("B/manifest.json", r#"{"Name":"B","UniqueID":"B.B"}"#),
        ]);
        let result = run(&store, &fs);
        assert_eq!(result.changed, vec!["B.B".to_string()]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("A/manifest.json"));
    }

    #[test]
    fn duplicate_ids_keep_the_first() {
        let (store, fs) = setup(&[
            ("A/manifest.json", r#"{"Name":"first","UniqueID":"Same"}"#),
            ("B/manifest.json", r#"{"Name":"second","UniqueID":"Same"}"#),
        ]);
        let result = run(&store, &fs);
        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.errors.len(), 1);
        let record = store.record("Same").unwrap().unwrap();
        assert_eq!(record.translated_name.as_deref(), Some("first"));
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn duplicate_copy_does_not_churn_across_syncs() {
        let (store, fs) = setup(&[
            ("A/manifest.json", r#"{"Name":"first","UniqueID":"Same"}"#),
            ("B/manifest.json", r#"{"Name":"second","UniqueID":"Same"}"#),
        ]);
        assert_eq!(run(&store, &fs).changed.len(), 1);

        for _ in 0..3 {
            let result = run(&store, &fs);
            assert!(result.changed.is_empty());
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].contains("B/manifest.json"));
        }
        assert_eq!(store.snapshots().unwrap().len(), 1);
        let record = store.record("Same").unwrap().unwrap();
        assert_eq!(record.relative_path, "A/manifest.json");
        assert_eq!(record.translated_name.as_deref(), Some("first"));
    }

    #[test]
    fn backup_copy_cannot_take_over_an_edited_record() {
        let (store, fs) = setup(&[("Zeta/manifest.json", r#"{"Name":"z","UniqueID":"Z"}"#)]);
        run(&store, &fs);

        // The copy sorts first and the original is edited in the same run.
        fs.add_file("/mods/Backup/manifest.json", r#"{"Name":"old","UniqueID":"Z"}"#);
        fs.add_file("/mods/Zeta/manifest.json", r#"{"Name":"z2","UniqueID":"Z"}"#);
        let result = run(&store, &fs);
        assert_eq!(result.changed, vec!["Z".to_string()]);
        assert!(result.errors[0].contains("Backup/manifest.json"));

        let record = store.record("Z").unwrap().unwrap();
        assert_eq!(record.relative_path, "Zeta/manifest.json");
        assert_eq!(record.translated_name.as_deref(), Some("z2"));
        assert!(run(&store, &fs).changed.is_empty());
    }

    #[test]
    fn moved_manifest_is_archived_again() {
        let text = r#"{"Name":"A","UniqueID":"X.Y"}"#;
        let (store, fs) = setup(&[("Old/manifest.json", text)]);
        run(&store, &fs);

        fs.remove_file("/mods/Old/manifest.json");
        fs.add_file("/mods/New/manifest.json", text);
        let result = run(&store, &fs);

        assert_eq!(result.changed, vec!["X.Y".to_string()]);
        assert_eq!(store.snapshots().unwrap().len(), 2);
        let record = store.record("X.Y").unwrap().unwrap();
        assert_eq!(record.relative_path, "New/manifest.json");
        assert!(!record.is_stale());
    }

    #[test]
    fn snapshot_counts_all_records() {
        let (store, fs) = setup(&[
            ("A/manifest.json", r#"{"UniqueID":"A"}"#),
            ("B/manifest.json", r#"{"UniqueID":"B"}"#),
        ]);
        run(&store, &fs);
        fs.add_file("/mods/A/manifest.json", r#"{"UniqueID":"A","Name":"x"}"#);
        let result = run(&store, &fs);
        let snapshot = result.snapshot.unwrap();
        assert_eq!(snapshot.record_count, 2);
        assert_eq!(result.changed, vec!["A".to_string()]);
    }

    #[test]
    fn explicit_label_is_used() {
        let (store, fs) = setup(&[("A/manifest.json", r#"{"UniqueID":"A"}"#)]);
        let result = run_sync(
            &store,
            &fs,
            Path::new(ROOT),
            &ScanSettings::default(),
            Some("before update"),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.snapshot.unwrap().label, "before update");
    }

    #[test]
    fn cancelled_sync_reports_failure_and_writes_nothing() {
        let (store, fs) = setup(&[("A/manifest.json", r#"{"UniqueID":"A"}"#)]);
        let token = CancelToken::new();
        token.cancel();
        let out = sync(
            &store,
            &fs,
            Path::new(ROOT),
            &ScanSettings::default(),
            None,
            &token,
        );
        assert!(!out.success);
        assert_eq!(out.success_count, 0);
        assert!(store.snapshots().unwrap().is_empty());
    }

    /// Cancels the token as soon as `trigger` is read.
    struct CancelOnRead<'a> {
        inner: &'a MemoryFs,
        trigger: PathBuf,
        token: CancelToken,
    }

    impl FileAccess for CancelOnRead<'_> {
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }

        fn child_dirs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
            self.inner.child_dirs(dir)
        }

        fn find_files(
            &self,
            root: &Path,
            file_name: &str,
            max_depth: Option<usize>,
        ) -> Result<Vec<PathBuf>> {
            self.inner.find_files(root, file_name, max_depth)
        }

        fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
            if path == self.trigger {
                self.token.cancel();
            }
            self.inner.read_bytes(path)
        }

        fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
            self.inner.write_text(path, contents)
        }
    }

    #[test]
    fn cancel_during_sync_commits_what_was_folded() {
        let (store, fs) = setup(&[
            ("A/manifest.json", r#"{"UniqueID":"A"}"#),
            ("B/manifest.json", r#"{"UniqueID":"B"}"#),
            ("C/manifest.json", r#"{"UniqueID":"C"}"#),
        ]);
        let token = CancelToken::new();
        let cancelling = CancelOnRead {
            inner: &fs,
            trigger: PathBuf::from("/mods/A/manifest.json"),
            token: token.clone(),
        };

        let result = run_sync(
            &store,
            &cancelling,
            Path::new(ROOT),
            &ScanSettings::default(),
            None,
            &token,
        )
        .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.changed, vec!["A".to_string()]);
        let snapshot = result.snapshot.clone().unwrap();
        assert_eq!(snapshot.record_count, 1);
        assert!(store.record("A").unwrap().is_some());
        assert!(store.record("B").unwrap().is_none());
        assert_eq!(store.entry_count(), 1);

        let out = OperationOutcome::from(result);
        assert!(!out.success);
        assert_eq!(out.success_count, 1);
        assert!(out.message.contains("archived 1 record(s)"));
    }

    #[test]
    fn rejected_batch_is_fatal() {
        let (store, fs) = setup(&[("A/manifest.json", r#"{"UniqueID":"A"}"#)]);
        store.reject_writes(true);
        let out = sync(
            &store,
            &fs,
            Path::new(ROOT),
            &ScanSettings::default(),
            None,
            &CancelToken::new(),
        );
        assert!(!out.success);
        assert!(store.all_records().unwrap().is_empty());
    }
}
