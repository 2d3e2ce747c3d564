//! Sync / rollback / restore scenarios through the library API.
//!
//! Every scenario runs twice: against the in-memory store and filesystem,
//! and against SQLite plus a real temp directory.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use transarc::cancel::CancelToken;
use transarc::config::{Config, ScanSettings};
use transarc::db::Database;
use transarc::manifest::Manifest;
use transarc::models::{OperationOutcome, Record};
use transarc::operations::{self, RestoreScope, RestoreTarget};
use transarc::store::{ArchiveStore, HistoryStore, MemoryStore, RecordStore};
use transarc::vfs::{DiskFs, FileAccess, MemoryFs};

const TEXT_A: &str = "{\n  // translator note: keep\n  \"Name\": \"A\",\n  \"UniqueID\": \"X.Y\"\n}\n";

enum Files {
    Memory(MemoryFs),
    Disk(DiskFs, TempDir),
}

impl Files {
    fn access(&self) -> &dyn FileAccess {
        match self {
            Files::Memory(fs) => fs,
            Files::Disk(fs, _) => fs,
        }
    }

    fn write(&self, path: &Path, text: &str) {
        match self {
            Files::Memory(fs) => fs.add_file(path, text),
            Files::Disk(..) => {
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, text).unwrap();
            }
        }
    }

    fn read(&self, path: &Path) -> String {
        self.access().read_text(path).unwrap()
    }
}

struct Harness<S> {
    store: S,
    files: Files,
    root: PathBuf,
}

fn memory() -> Harness<MemoryStore> {
    let fs = MemoryFs::new();
    fs.add_dir("/mods");
    Harness {
        store: MemoryStore::new(),
        files: Files::Memory(fs),
        root: PathBuf::from("/mods"),
    }
}

fn disk() -> Harness<Database> {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let store = operations::open_archive(&Config::new(&root)).unwrap();
    Harness {
        store,
        files: Files::Disk(DiskFs, tmp),
        root,
    }
}

impl<S: ArchiveStore> Harness<S> {
    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn write(&self, rel: &str, text: &str) {
        self.files.write(&self.path(rel), text);
    }

    fn read(&self, rel: &str) -> String {
        self.files.read(&self.path(rel))
    }

    fn target(&self) -> RestoreTarget<'_> {
        RestoreTarget {
            root: &self.root,
            manifest_name: "manifest.json",
            max_depth: None,
        }
    }

    fn sync(&self) -> OperationOutcome {
        operations::sync(
            &self.store,
            self.files.access(),
            &self.root,
            &ScanSettings::default(),
            None,
            &CancelToken::new(),
        )
    }

    fn restore(&self) -> OperationOutcome {
        operations::restore(&self.store, self.files.access(), &self.target(), RestoreScope::All)
    }

    fn rollback(&self, snapshot: i64) -> OperationOutcome {
        operations::rollback(&self.store, self.files.access(), &self.target(), snapshot)
    }

    fn record(&self, id: &str) -> Record {
        self.store.record(id).unwrap().unwrap()
    }
}

fn timeline<S: ArchiveStore>(h: &Harness<S>) {
    // A: first sighting
    h.write("ModA/manifest.json", TEXT_A);
    let out = h.sync();
    assert!(out.success, "{}", out.message);
    assert_eq!(out.success_count, 1);
    assert_eq!(h.record("X.Y").translated_name.as_deref(), Some("A"));
    let snapshots = h.store.snapshots().unwrap();
    assert_eq!(snapshots.len(), 1);
    let first = snapshots[0].id;
    assert_eq!(h.store.history_for_record("X.Y").unwrap().len(), 1);

    // B: nothing changed
    let out = h.sync();
    assert!(out.success);
    assert_eq!(out.success_count, 0);
    assert_eq!(h.store.snapshots().unwrap().len(), 1);
    assert_eq!(h.store.history_for_record("X.Y").unwrap().len(), 1);

    // C: edit on disk
    h.write("ModA/manifest.json", &TEXT_A.replace("\"A\"", "\"B\""));
    let out = h.sync();
    assert_eq!(out.success_count, 1);
    assert_eq!(h.store.snapshots().unwrap().len(), 2);
    let history = h.store.history_for_record("X.Y").unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].raw_text.contains("\"B\""));
    let c_entry = history[1].id;
    assert_eq!(h.record("X.Y").translated_name.as_deref(), Some("B"));

    // D: back to A
    let out = h.rollback(first);
    assert!(out.success, "{}", out.message);
    let record = h.record("X.Y");
    assert_eq!(record.translated_name.as_deref(), Some("A"));
    assert!(!record.is_stale());
    assert_eq!(h.read("ModA/manifest.json"), TEXT_A);
    assert_eq!(h.store.snapshots().unwrap().len(), 1);
    assert!(h.store.history_entry(c_entry).unwrap().is_none());

    // The timeline continues cleanly: the undone edit is not seen as new.
    let out = h.sync();
    assert_eq!(out.success_count, 0);
}

#[test]
fn timeline_in_memory() {
    timeline(&memory());
}

#[test]
fn timeline_on_disk_with_sqlite() {
    timeline(&disk());
}

#[test]
fn minimal_manifest_creates_one_snapshot_and_entry() {
    let h = disk();
    h.write("Mod/manifest.json", r#"{"Name":"A","UniqueID":"X.Y"}"#);
    assert_eq!(h.sync().success_count, 1);
    assert_eq!(h.store.snapshots().unwrap().len(), 1);
    let history = h.store.history_for_record("X.Y").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].raw_text, r#"{"Name":"A","UniqueID":"X.Y"}"#);
}

#[test]
fn restore_with_no_translations_has_nothing_to_do() {
    let h = memory();
    h.write("ModA/manifest.json", r#"{"UniqueID":"X.Y"}"#);
    let out = h.restore();
    assert!(out.success);
    assert_eq!(out.success_count, 0);
    assert!(out.message.contains("Nothing needed restoring"));
}

#[test]
fn nested_manifest_is_restored_but_never_ingested() {
    let h = memory();
    h.write("Pack/Inner/manifest.json", r#"{"Name":"Inner","UniqueID":"Deep"}"#);
    let out = h.sync();
    assert_eq!(out.success_count, 0);
    assert!(h.store.record("Deep").unwrap().is_none());

    let mut record = Record::new("Deep", "Pack/Inner/manifest.json");
    record.translated_name = Some("内层".into());
    h.store.upsert_record(&record).unwrap();
    let out = h.restore();
    assert_eq!(out.success_count, 1);
    let manifest = Manifest::parse(&h.read("Pack/Inner/manifest.json")).unwrap();
    assert_eq!(manifest.name.as_deref(), Some("内层"));
}

#[test]
fn upstream_update_then_restore_keeps_new_content() {
    let h = disk();
    h.write(
        "ModA/manifest.json",
        "{\n  \"Name\": \"甲\",\n  \"Version\": \"1.0\",\n  \"UniqueID\": \"X.Y\"\n}",
    );
    h.sync();

    // The mod update overwrites the translated file.
    let updated = "{\n  // new upstream comment\n  \"Name\": \"Alpha\",\n  \"Version\": \"2.0\",\n  \"UniqueID\": \"X.Y\"\n}";
    h.write("ModA/manifest.json", updated);
    let out = h.restore();
    assert_eq!(out.success_count, 1);
    assert_eq!(h.read("ModA/manifest.json"), updated.replace("Alpha", "甲"));
}

#[test]
fn quote_in_translation_survives_restore() {
    let h = memory();
    h.write("ModA/manifest.json", TEXT_A);
    h.sync();
    let mut record = h.record("X.Y");
    record.translated_name = Some("A\"B".into());
    h.store.upsert_record(&record).unwrap();

    h.restore();
    let text = h.read("ModA/manifest.json");
    assert!(text.contains("  // translator note: keep\n"));
    assert_eq!(Manifest::parse(&text).unwrap().name.as_deref(), Some("A\"B"));
}

#[test]
fn second_sync_over_many_mods_writes_nothing() {
    let h = memory();
    for i in 0..20 {
        h.write(
            &format!("Mod{i}/manifest.json"),
            &format!(r#"{{"Name":"Mod {i}","UniqueID":"Mod.{i}"}}"#),
        );
    }
    assert_eq!(h.sync().success_count, 20);
    let entries = h.store.entry_count();

    let out = h.sync();
    assert_eq!(out.success_count, 0);
    assert_eq!(h.store.entry_count(), entries);
    assert_eq!(h.store.snapshots().unwrap().len(), 1);
}

#[test]
fn broken_manifest_does_not_block_the_batch() {
    let h = disk();
    h.write("Good/manifest.json", r#"{"Name":"G","UniqueID":"Good"}"#);
    h.write("Bad/manifest.json", r#"{"Name": "oops""#);
    let out = h.sync();
    assert!(out.success);
    assert_eq!(out.success_count, 1);
    assert_eq!(out.error_count, 1);
    assert!(out.details[0].contains("Bad/manifest.json"));
}

#[test]
fn rollback_with_partial_disk_failure_still_truncates() {
    let h = memory();
    h.write("ModA/manifest.json", TEXT_A);
    h.sync();
    h.write("ModA/manifest.json", &TEXT_A.replace("\"A\"", "\"B\""));
    h.sync();

    let Files::Memory(fs) = &h.files else {
        unreachable!()
    };
    fs.set_read_only(h.path("ModA/manifest.json"));
    let out = h.rollback(1);
    assert!(!out.success);
    assert_eq!(out.error_count, 1);
    assert_eq!(h.record("X.Y").translated_name.as_deref(), Some("A"));
    assert_eq!(h.store.snapshots().unwrap().len(), 1);
}

#[test]
fn legacy_import_then_restore_then_sync() {
    let h = disk();
    h.write("ModA/manifest.json", TEXT_A);
    let outcome = operations::import_legacy_text(
        &h.store,
        r#"{"ModA": {"UniqueID": "X.Y", "Name": "甲", "Path": "ModA", "IsChinese": true}}"#,
    )
    .unwrap();
    assert_eq!(outcome.created, 1);
    assert!(h.store.snapshots().unwrap().is_empty());

    assert_eq!(h.restore().success_count, 1);
    let out = h.sync();
    assert_eq!(out.success_count, 1);
    let record = h.record("X.Y");
    assert_eq!(record.translated_name.as_deref(), Some("甲"));
    assert!(!record.is_stale());
}
