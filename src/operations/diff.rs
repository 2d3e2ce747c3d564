//! Field-level comparison of two archived manifest texts.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, TransarcError};
use crate::manifest::Manifest;
use crate::models::HistoryEntry;
use crate::store::HistoryStore;

/// One compared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: Option<String>,
    pub new: Option<String>,
    /// `old != new`; an absent value and an empty string differ.
    pub changed: bool,
}

impl FieldChange {
    fn new(field: &'static str, old: Option<String>, new: Option<String>) -> Self {
        let changed = old != new;
        Self {
            field,
            old,
            new,
            changed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "Added",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Modified => "Modified",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    pub kind: ChangeKind,
    pub fields: Vec<FieldChange>,
    pub changed_count: usize,
    pub summary: String,
}

/// Compare two optional raw texts. Text that fails to parse compares as if
/// every field were absent.
#[must_use]
pub fn build_diff(old: Option<&str>, new: Option<&str>) -> ManifestDiff {
    let kind = match (old, new) {
        (None, Some(_)) => ChangeKind::Added,
        (Some(_), None) => ChangeKind::Deleted,
        _ => ChangeKind::Modified,
    };
    let old_manifest = old.and_then(|t| Manifest::parse(t).ok()).unwrap_or_default();
    let new_manifest = new.and_then(|t| Manifest::parse(t).ok()).unwrap_or_default();

    let fields = vec![
        FieldChange::new("Name", old_manifest.name.clone(), new_manifest.name.clone()),
        FieldChange::new(
            "Description",
            old_manifest.description.clone(),
            new_manifest.description.clone(),
        ),
        FieldChange::new("Author", old_manifest.author.clone(), new_manifest.author.clone()),
        FieldChange::new("Version", old_manifest.version.clone(), new_manifest.version.clone()),
        FieldChange::new("NexusId", old_manifest.nexus_id(), new_manifest.nexus_id()),
    ];
    let changed_count = fields.iter().filter(|f| f.changed).count();
    let summary = match changed_count {
        0 => format!("{kind}: no field changes"),
        1 => format!("{kind}: 1 field changed"),
        n => format!("{kind}: {n} fields changed"),
    };

    ManifestDiff {
        kind,
        fields,
        changed_count,
        summary,
    }
}

/// A diff attributed to one record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDiff {
    pub record_id: String,
    /// Entry on the old side, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_entry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_entry: Option<i64>,
    #[serde(flatten)]
    pub diff: ManifestDiff,
}

/// Diff a history entry against the previous entry of the same record.
pub fn diff_entry<S: HistoryStore + ?Sized>(store: &S, entry_id: i64) -> Result<RecordDiff> {
    let entry = store
        .history_entry(entry_id)?
        .ok_or(TransarcError::HistoryEntryNotFound { id: entry_id })?;
    let previous = store
        .history_for_record(&entry.record_id)?
        .into_iter()
        .filter(|e| e.id < entry.id)
        .max_by_key(|e| e.id);

    Ok(RecordDiff {
        diff: build_diff(
            previous.as_ref().map(|e| e.raw_text.as_str()),
            Some(&entry.raw_text),
        ),
        record_id: entry.record_id,
        from_entry: previous.map(|e| e.id),
        to_entry: Some(entry.id),
    })
}

/// Per-record diffs between the reconstructed states at two snapshots.
/// Records whose archived text is identical on both sides are omitted.
pub fn diff_snapshots<S: HistoryStore + ?Sized>(
    store: &S,
    from: i64,
    to: i64,
) -> Result<Vec<RecordDiff>> {
    for id in [from, to] {
        if store.snapshot(id)?.is_none() {
            return Err(TransarcError::SnapshotNotFound { id });
        }
    }

    let mut sides: BTreeMap<String, (Option<HistoryEntry>, Option<HistoryEntry>)> = BTreeMap::new();
    for entry in store.records_as_of(from)? {
        let id = entry.record_id.clone();
        sides.entry(id).or_default().0 = Some(entry);
    }
    for entry in store.records_as_of(to)? {
        let id = entry.record_id.clone();
        sides.entry(id).or_default().1 = Some(entry);
    }

    Ok(sides
        .into_iter()
        .filter(|(_, (old, new))| match (old, new) {
            (Some(o), Some(n)) => o.raw_text != n.raw_text,
            _ => true,
        })
        .map(|(record_id, (old, new))| RecordDiff {
            diff: build_diff(
                old.as_ref().map(|e| e.raw_text.as_str()),
                new.as_ref().map(|e| e.raw_text.as_str()),
            ),
            from_entry: old.map(|e| e.id),
            to_entry: new.map(|e| e.id),
            record_id,
        })
        .collect())
}
