use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, TransarcError};
use crate::models::{HistoryEntry, PendingEntry, Record, Snapshot};
use crate::store::{ArchiveStore, HistoryStore, Truncation};

use super::queries::{count_records_on, upsert_record_on};
use super::Database;

const ENTRY_COLUMNS: &str = "id, snapshot_id, record_id, raw_text, content_signature";

fn map_snapshot(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    let record_count: i64 = row.get(3)?;
    Ok(Snapshot {
        id: row.get(0)?,
        created_at: row.get(1)?,
        label: row.get(2)?,
        record_count: record_count as usize,
    })
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        snapshot_id: row.get(1)?,
        record_id: row.get(2)?,
        raw_text: row.get(3)?,
        content_signature: row.get(4)?,
    })
}

fn insert_snapshot_on(conn: &Connection, label: &str, record_count: usize) -> Result<Snapshot> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO snapshots (created_at, label, record_count) VALUES (?1, ?2, ?3)",
        params![created_at, label, record_count as i64],
    )?;
    Ok(Snapshot {
        id: conn.last_insert_rowid(),
        created_at,
        label: label.to_string(),
        record_count,
    })
}

fn insert_entries_on(
    conn: &Connection,
    snapshot_id: i64,
    entries: Vec<PendingEntry>,
) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO history_entries (snapshot_id, record_id, raw_text, content_signature)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut written = Vec::with_capacity(entries.len());
    for pending in entries {
        stmt.execute(params![
            snapshot_id,
            pending.record_id,
            pending.raw_text,
            pending.content_signature
        ])?;
        written.push(pending.into_entry(conn.last_insert_rowid(), snapshot_id));
    }
    Ok(written)
}

fn snapshot_exists_on(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM snapshots WHERE id = ?1", params![id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

impl Database {
    fn query_entries(&self, sql: &str, param: impl rusqlite::ToSql) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn().prepare_cached(sql)?;
        let rows = stmt.query_map(params![param], map_entry)?;
        let mut entries = Vec::new();
        for r in rows {
            entries.push(r?);
        }
        Ok(entries)
    }
}

impl HistoryStore for Database {
    fn create_snapshot(&self, label: &str, record_count: usize) -> Result<Snapshot> {
        insert_snapshot_on(self.conn(), label, record_count)
    }

    fn append_history(
        &self,
        snapshot_id: i64,
        entries: Vec<PendingEntry>,
    ) -> Result<Vec<HistoryEntry>> {
        self.in_transaction(|conn| {
            if !snapshot_exists_on(conn, snapshot_id)? {
                return Err(TransarcError::SnapshotNotFound { id: snapshot_id });
            }
            insert_entries_on(conn, snapshot_id, entries)
        })
    }

    fn snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, created_at, label, record_count FROM snapshots ORDER BY id")?;
        let rows = stmt.query_map([], map_snapshot)?;
        let mut snapshots = Vec::new();
        for r in rows {
            snapshots.push(r?);
        }
        Ok(snapshots)
    }

    fn snapshot(&self, id: i64) -> Result<Option<Snapshot>> {
        let mut stmt = self.conn().prepare_cached(
            "SELECT id, created_at, label, record_count FROM snapshots WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], map_snapshot).optional()?)
    }

    fn history_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {ENTRY_COLUMNS} FROM history_entries WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], map_entry).optional()?)
    }

    fn history_for_record(&self, record_id: &str) -> Result<Vec<HistoryEntry>> {
        self.query_entries(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM history_entries WHERE record_id = ?1 ORDER BY id"
            ),
            record_id,
        )
    }

    fn records_as_of(&self, snapshot_id: i64) -> Result<Vec<HistoryEntry>> {
        self.query_entries(
            "SELECT h.id, h.snapshot_id, h.record_id, h.raw_text, h.content_signature
             FROM history_entries h
             JOIN (SELECT MAX(id) AS id FROM history_entries
                   WHERE snapshot_id <= ?1
                   GROUP BY record_id) latest ON latest.id = h.id
             ORDER BY h.record_id",
            snapshot_id,
        )
    }

    fn delete_snapshots_after(&self, snapshot_id: i64) -> Result<Truncation> {
        self.in_transaction(|conn| {
            let entries_removed = conn.execute(
                "DELETE FROM history_entries WHERE snapshot_id > ?1",
                params![snapshot_id],
            )?;
            let snapshots_removed =
                conn.execute("DELETE FROM snapshots WHERE id > ?1", params![snapshot_id])?;
            Ok(Truncation {
                snapshots_removed,
                entries_removed,
            })
        })
    }
}

impl ArchiveStore for Database {
    fn commit_scan(
        &self,
        label: &str,
        records: &[Record],
        entries: Vec<PendingEntry>,
    ) -> Result<Snapshot> {
        self.in_transaction(|conn| {
            for record in records {
                upsert_record_on(conn, record)?;
            }
            let record_count = count_records_on(conn)?;
            let snapshot = insert_snapshot_on(conn, label, record_count)?;
            insert_entries_on(conn, snapshot.id, entries)?;
            Ok(snapshot)
        })
    }
}
