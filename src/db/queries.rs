use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::Record;
use crate::store::RecordStore;

use super::Database;

const RECORD_COLUMNS: &str = "unique_id, relative_path, original_name, original_description, \
     translated_name, translated_description, content_fingerprint, original_raw_text, \
     current_raw_text, last_updated_at";

fn map_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        unique_id: row.get(0)?,
        relative_path: row.get(1)?,
        original_name: row.get(2)?,
        original_description: row.get(3)?,
        translated_name: row.get(4)?,
        translated_description: row.get(5)?,
        content_fingerprint: row.get(6)?,
        original_raw_text: row.get(7)?,
        current_raw_text: row.get(8)?,
        last_updated_at: row.get(9)?,
    })
}

/// Insert or update one record on `conn` (usable inside a transaction).
pub(crate) fn upsert_record_on(conn: &Connection, record: &Record) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO records (unique_id, relative_path, original_name, original_description,
                              translated_name, translated_description, content_fingerprint,
                              original_raw_text, current_raw_text, last_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(unique_id) DO UPDATE SET
             relative_path = excluded.relative_path,
             original_name = excluded.original_name,
             original_description = excluded.original_description,
             translated_name = excluded.translated_name,
             translated_description = excluded.translated_description,
             content_fingerprint = excluded.content_fingerprint,
             original_raw_text = excluded.original_raw_text,
             current_raw_text = excluded.current_raw_text,
             last_updated_at = excluded.last_updated_at",
    )?;
    stmt.execute(params![
        record.unique_id,
        record.relative_path,
        record.original_name,
        record.original_description,
        record.translated_name,
        record.translated_description,
        record.content_fingerprint,
        record.original_raw_text,
        record.current_raw_text,
        record.last_updated_at,
    ])?;
    Ok(())
}

pub(crate) fn count_records_on(conn: &Connection) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
    Ok(count as usize)
}

impl RecordStore for Database {
    fn all_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records ORDER BY unique_id"
        ))?;
        let rows = stmt.query_map([], map_record)?;
        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    fn record(&self, unique_id: &str) -> Result<Option<Record>> {
        let mut stmt = self.conn().prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE unique_id = ?1"
        ))?;
        Ok(stmt.query_row(params![unique_id], map_record).optional()?)
    }

    fn records_by_ids(&self, unique_ids: &[String]) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(unique_ids.len());
        for id in unique_ids {
            if let Some(record) = self.record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn upsert_record(&self, record: &Record) -> Result<()> {
        upsert_record_on(self.conn(), record)?;
        Ok(())
    }

    fn upsert_records(&self, records: &[Record]) -> Result<()> {
        self.in_transaction(|conn| {
            for record in records {
                upsert_record_on(conn, record)?;
            }
            Ok(())
        })
    }
}

impl Database {
    /// Verify archive integrity and return a report.
    pub fn verify_integrity(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        let integrity: String = self
            .conn()
            .query_row("PRAGMA integrity_check", [], |r| r.get(0))?;
        report.sqlite_ok = integrity == "ok";
        if !report.sqlite_ok {
            report.sqlite_error = Some(integrity);
        }

        let orphan_entries: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM history_entries
             WHERE snapshot_id NOT IN (SELECT id FROM snapshots)
                OR record_id NOT IN (SELECT unique_id FROM records)",
            [],
            |r| r.get(0),
        )?;
        report.orphan_entries = orphan_entries as u64;

        Ok(report)
    }
}

/// Report from archive integrity verification.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerifyReport {
    /// Whether `SQLite` integrity check passed.
    pub sqlite_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_error: Option<String>,
    /// History entries pointing at a missing snapshot or record.
    pub orphan_entries: u64,
    /// Records whose fingerprint does not match their current raw text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stale_records: Vec<String>,
    /// Records whose manifest is no longer on disk.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_manifests: Vec<String>,
}

impl VerifyReport {
    /// Returns true if all checks passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.sqlite_ok
            && self.orphan_entries == 0
            && self.stale_records.is_empty()
            && self.missing_manifests.is_empty()
    }
}
