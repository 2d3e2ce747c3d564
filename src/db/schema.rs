/// SQL statements for creating the archive schema.
pub const CREATE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS records (
    unique_id TEXT PRIMARY KEY,
    relative_path TEXT NOT NULL,
    original_name TEXT,
    original_description TEXT,
    translated_name TEXT,
    translated_description TEXT,
    content_fingerprint TEXT,
    original_raw_text TEXT NOT NULL DEFAULT '',
    current_raw_text TEXT NOT NULL DEFAULT '',
    last_updated_at TEXT NOT NULL
);

-- AUTOINCREMENT: ids of truncated snapshots are never handed out again
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    label TEXT NOT NULL,
    record_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS history_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    record_id TEXT NOT NULL REFERENCES records(unique_id),
    raw_text TEXT NOT NULL,
    content_signature TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_path ON records(relative_path);
CREATE INDEX IF NOT EXISTS idx_history_snapshot ON history_entries(snapshot_id);
-- Point-in-time queries group by record and filter by snapshot
CREATE INDEX IF NOT EXISTS idx_history_record_snapshot ON history_entries(record_id, snapshot_id);
";
