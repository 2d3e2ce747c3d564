//! Import and export of the flat JSON backup written by the old scripts.
//!
//! The file maps a mod folder (relative to the mods root) to its fields:
//! `{"ModA": {"UniqueID", "Name", "Description", "Path", "IsChinese", "Nurl"}}`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LegacySettings;
use crate::error::Result;
use crate::manifest::{contains_cjk, mask_comments, Manifest};
use crate::models::{OperationOutcome, Record};
use crate::store::RecordStore;
use crate::vfs::FileAccess;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyEntry {
    #[serde(rename = "UniqueID")]
    pub unique_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub path: Option<String>,
    pub is_chinese: Option<bool>,
    pub nurl: Option<String>,
}

impl LegacyEntry {
    /// An explicit `IsChinese` wins; untagged entries count when they hold CJK text.
    #[must_use]
    pub fn is_translated(&self) -> bool {
        self.is_chinese.unwrap_or_else(|| {
            self.name.as_deref().is_some_and(contains_cjk)
                || self.description.as_deref().is_some_and(contains_cjk)
        })
    }
}

pub type LegacyBackup = BTreeMap<String, LegacyEntry>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    /// Records that did not exist before the import.
    pub created: usize,
    /// Backup keys that were not marked as translated.
    pub skipped: Vec<String>,
}

impl From<ImportResult> for OperationOutcome {
    fn from(result: ImportResult) -> Self {
        Self::ok(
            result.imported,
            format!(
                "Imported {} translation(s) ({} new record(s)), skipped {}",
                result.imported,
                result.created,
                result.skipped.len()
            ),
        )
    }
}

/// Fold a legacy backup into the record store. No snapshot is written; new
/// records stay stale until the next sync ingests their manifests.
pub fn import_legacy_text<S: RecordStore + ?Sized>(store: &S, text: &str) -> Result<ImportResult> {
    let backup: LegacyBackup = serde_json::from_str(&mask_comments(text))?;
    let mut result = ImportResult::default();
    let mut touched: HashMap<String, Record> = HashMap::new();
    let now = Utc::now();

    for (key, entry) in &backup {
        if !entry.is_translated() {
            debug!(key = %key, "not marked as translated");
            result.skipped.push(key.clone());
            continue;
        }

        let folder = entry
            .path
            .as_deref()
            .unwrap_or(key)
            .replace('\\', "/")
            .trim_matches('/')
            .to_string();
        let unique_id = match entry.unique_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => folder.rsplit('/').next().unwrap_or(&folder).to_string(),
        };

        let mut record = match touched.remove(&unique_id) {
            Some(record) => record,
            None => match store.record(&unique_id)? {
                Some(record) => record,
                None => {
                    result.created += 1;
                    Record::new(unique_id.clone(), format!("{folder}/manifest.json"))
                }
            },
        };
        if let Some(name) = entry.name.as_deref().filter(|n| !n.is_empty()) {
            record.translated_name = Some(name.to_string());
        }
        if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
            record.translated_description = Some(description.to_string());
        }
        record.last_updated_at = now;
        touched.insert(unique_id, record);
        result.imported += 1;
    }

    let records: Vec<Record> = touched.into_values().collect();
    store.upsert_records(&records)?;
    info!(imported = result.imported, created = result.created, "legacy backup imported");
    Ok(result)
}

/// Read the backup at `path` and import it.
pub fn import_legacy<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    path: &Path,
) -> OperationOutcome {
    let imported = fs
        .read_text(path)
        .and_then(|text| import_legacy_text(store, &text));
    match imported {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "legacy import failed");
            OperationOutcome::failure(&e)
        }
    }
}

/// Build the legacy backup from the current records. Records without any
/// translated text are left out.
pub fn build_legacy_backup<S: RecordStore + ?Sized>(
    store: &S,
    settings: &LegacySettings,
) -> Result<LegacyBackup> {
    let mut backup = LegacyBackup::new();
    for record in store.all_records()? {
        if !record.has_translation() {
            continue;
        }
        let folder = record
            .relative_path
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir)
            .to_string();
        let is_chinese = record.translated_name.as_deref().is_some_and(contains_cjk)
            || record
                .translated_description
                .as_deref()
                .is_some_and(contains_cjk);
        let nurl = Manifest::parse(&record.current_raw_text)
            .ok()
            .and_then(|m| m.nexus_id())
            .map(|id| settings.mod_url_template.replace("{id}", &id));

        backup.insert(
            folder.clone(),
            LegacyEntry {
                unique_id: Some(record.unique_id),
                name: record.translated_name,
                description: record.translated_description,
                path: Some(folder),
                is_chinese: Some(is_chinese),
                nurl,
            },
        );
    }
    Ok(backup)
}

/// Write the legacy backup to `path` as pretty JSON.
pub fn export_legacy<S: RecordStore + ?Sized>(
    store: &S,
    fs: &dyn FileAccess,
    path: &Path,
    settings: &LegacySettings,
) -> OperationOutcome {
    let exported = build_legacy_backup(store, settings).and_then(|backup| {
        let json = serde_json::to_string_pretty(&backup)?;
        fs.write_text(path, &json)?;
        Ok(backup.len())
    });
    match exported {
        Ok(count) => {
            info!(entries = count, path = %path.display(), "legacy backup written");
            OperationOutcome::ok(count, format!("Exported {count} translation(s) to {}", path.display()))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "legacy export failed");
            OperationOutcome::failure(&e)
        }
    }
}
