use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransarcError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("mods root not found: {path}")]
    RootNotFound { path: String },

    #[error("parse error in {path}: {detail}")]
    Parse { path: String, detail: String },

    #[error("missing UniqueID in {path}")]
    MissingUniqueId { path: String },

    #[error("snapshot not found: #{id}")]
    SnapshotNotFound { id: i64 },

    #[error("record not found: {unique_id}")]
    RecordNotFound { unique_id: String },

    #[error("history entry not found: #{id}")]
    HistoryEntryNotFound { id: i64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl TransarcError {
    /// Whether this error aborts a whole operation rather than a single file.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TransarcError::Io(_)
                | TransarcError::Json(_)
                | TransarcError::Parse { .. }
                | TransarcError::MissingUniqueId { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransarcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_errors_are_not_fatal() {
        let parse = TransarcError::Parse {
            path: "A/manifest.json".into(),
            detail: "expected value".into(),
        };
        assert!(!parse.is_fatal());
        assert!(!TransarcError::MissingUniqueId { path: "A".into() }.is_fatal());
    }

    #[test]
    fn directory_and_store_errors_are_fatal() {
        assert!(TransarcError::RootNotFound { path: "/nope".into() }.is_fatal());
        assert!(TransarcError::Database(rusqlite::Error::InvalidQuery).is_fatal());
    }
}
