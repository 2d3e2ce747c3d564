use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::hasher;
use crate::manifest::Manifest;

/// The archived translation state of one mod, keyed by its UniqueID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub unique_id: String,
    /// Manifest path relative to the mods root (forward slashes).
    pub relative_path: String,
    /// Baseline captured on first sighting.
    pub original_name: Option<String>,
    pub original_description: Option<String>,
    /// What restore pushes back onto disk.
    pub translated_name: Option<String>,
    pub translated_description: Option<String>,
    /// SHA-256 of the raw manifest bytes at last ingest. `None` forces a re-ingest.
    pub content_fingerprint: Option<String>,
    #[serde(skip_serializing)]
    pub original_raw_text: String,
    #[serde(skip_serializing)]
    pub current_raw_text: String,
    pub last_updated_at: DateTime<Utc>,
}

impl Record {
    /// A record with no captured content yet.
    #[must_use]
    pub fn new(unique_id: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            relative_path: relative_path.into(),
            original_name: None,
            original_description: None,
            translated_name: None,
            translated_description: None,
            content_fingerprint: None,
            original_raw_text: String::new(),
            current_raw_text: String::new(),
            last_updated_at: Utc::now(),
        }
    }

    /// Fold freshly read manifest content into the record.
    ///
    /// The baseline is captured only once; the translation fields always
    /// follow whatever text currently lives in the file.
    pub fn ingest(
        &mut self,
        relative_path: &str,
        raw_text: &str,
        fingerprint: &str,
        manifest: &Manifest,
        now: DateTime<Utc>,
    ) {
        if self.original_raw_text.is_empty() {
            self.original_raw_text = raw_text.to_string();
            self.original_name.clone_from(&manifest.name);
            self.original_description.clone_from(&manifest.description);
        }
        self.relative_path = relative_path.to_string();
        self.current_raw_text = raw_text.to_string();
        self.translated_name.clone_from(&manifest.name);
        self.translated_description.clone_from(&manifest.description);
        self.content_fingerprint = Some(fingerprint.to_string());
        self.last_updated_at = now;
    }

    /// Whether either translated field has text to restore.
    #[must_use]
    pub fn has_translation(&self) -> bool {
        non_empty(self.translated_name.as_deref()) || non_empty(self.translated_description.as_deref())
    }

    /// Fingerprint no longer matches `current_raw_text`.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.content_fingerprint.as_deref()
            != Some(hasher::hash_bytes(self.current_raw_text.as_bytes()).as_str())
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, description: &str) -> Manifest {
        Manifest {
            name: Some(name.into()),
            description: Some(description.into()),
            unique_id: Some("X.Y".into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_record_is_stale_and_untranslated() {
        let r = Record::new("X.Y", "ModA/manifest.json");
        assert!(r.is_stale());
        assert!(!r.has_translation());
    }

    #[test]
    fn first_ingest_captures_baseline() {
        let mut r = Record::new("X.Y", "ModA/manifest.json");
        let text = r#"{"Name":"A","UniqueID":"X.Y"}"#;
        let fp = hasher::hash_bytes(text.as_bytes());
        r.ingest("ModA/manifest.json", text, &fp, &manifest("A", "d"), Utc::now());

        assert_eq!(r.original_name.as_deref(), Some("A"));
        assert_eq!(r.translated_name.as_deref(), Some("A"));
        assert_eq!(r.original_raw_text, text);
        assert!(!r.is_stale());
    }

    #[test]
    fn later_ingest_keeps_baseline() {
        let mut r = Record::new("X.Y", "ModA/manifest.json");
        r.ingest("ModA/manifest.json", "one", "h1", &manifest("A", "d"), Utc::now());
        r.ingest("Moved/manifest.json", "two", "h2", &manifest("B", "e"), Utc::now());

        assert_eq!(r.original_name.as_deref(), Some("A"));
        assert_eq!(r.original_raw_text, "one");
        assert_eq!(r.translated_name.as_deref(), Some("B"));
        assert_eq!(r.translated_description.as_deref(), Some("e"));
        assert_eq!(r.relative_path, "Moved/manifest.json");
        assert_eq!(r.current_raw_text, "two");
    }

    #[test]
    fn empty_strings_are_not_translations() {
        let mut r = Record::new("X.Y", "p");
        r.translated_name = Some(String::new());
        assert!(!r.has_translation());
        r.translated_description = Some("d".into());
        assert!(r.has_translation());
    }
}
