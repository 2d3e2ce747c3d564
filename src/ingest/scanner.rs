use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::error::{Result, TransarcError};
use crate::ingest::hasher;
use crate::manifest::Manifest;
use crate::models::Record;
use crate::vfs::{path_key, relative_path, FileAccess};

/// Manifest files sitting 1 to `depth` directories below `root`, found by
/// walking child directories one level at a time.
///
/// Only the root itself must be listable; unreadable subdirectories are
/// skipped with a warning.
pub fn discover_manifests(
    fs: &dyn FileAccess,
    root: &Path,
    manifest_name: &str,
    depth: usize,
) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut level = vec![root.to_path_buf()];

    for _ in 0..depth {
        let mut next = Vec::new();
        for dir in &level {
            let children = match fs.child_dirs(dir) {
                Ok(children) => children,
                Err(e) if dir != root => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for child in children {
                let candidate = child.join(manifest_name);
                if fs.exists(&candidate) && !fs.is_dir(&candidate) {
                    found.push(candidate);
                }
                next.push(child);
            }
        }
        level = next;
    }

    found.sort();
    Ok(found)
}

/// A manifest that was read, fingerprinted and parsed.
#[derive(Debug, Clone)]
pub struct ScannedManifest {
    pub path: PathBuf,
    pub relative_path: String,
    pub raw_text: String,
    pub fingerprint: String,
    pub manifest: Manifest,
}

/// Immutable result of one file's parallel task.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Path and fingerprint match an archived record; nothing was parsed.
    Unchanged {
        relative_path: String,
        unique_id: String,
    },
    Changed(Box<ScannedManifest>),
    Failed {
        relative_path: String,
        error: TransarcError,
    },
    /// Cancellation was observed before the file was read.
    Cancelled,
}

/// Parallel read/fingerprint/parse over candidate manifests.
pub struct Scanner<'a> {
    fs: &'a dyn FileAccess,
    root: &'a Path,
    /// Normalized relative path -> archived manifest at that path.
    known: HashMap<String, KnownManifest>,
}

struct KnownManifest {
    fingerprint: String,
    unique_id: String,
}

impl<'a> Scanner<'a> {
    /// Build a scanner whose unchanged check uses the given archived records.
    pub fn new(fs: &'a dyn FileAccess, root: &'a Path, records: &[Record]) -> Self {
        let known = records
            .iter()
            .filter_map(|r| {
                r.content_fingerprint.as_ref().map(|fp| {
                    let known = KnownManifest {
                        fingerprint: fp.clone(),
                        unique_id: r.unique_id.clone(),
                    };
                    (path_key(&r.relative_path), known)
                })
            })
            .collect();
        Self { fs, root, known }
    }

    /// Fan out over `paths`. Results come back in input order.
    pub fn scan(&self, paths: &[PathBuf], cancel: &CancelToken) -> Vec<ScanOutcome> {
        paths
            .par_iter()
            .map(|path| self.scan_one(path, cancel))
            .collect()
    }

    fn scan_one(&self, path: &Path, cancel: &CancelToken) -> ScanOutcome {
        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }
        let relative_path = relative_path(self.root, path);
        match self.classify(path, &relative_path) {
            Ok(outcome) => outcome,
            Err(error) => ScanOutcome::Failed {
                relative_path,
                error,
            },
        }
    }

    fn classify(&self, path: &Path, relative_path: &str) -> Result<ScanOutcome> {
        // One read serves both the fingerprint and the parse.
        let bytes = self.fs.read_bytes(path)?;
        let fingerprint = hasher::hash_bytes(&bytes);

        if let Some(known) = self
            .known
            .get(&path_key(relative_path))
            .filter(|k| k.fingerprint == fingerprint)
        {
            return Ok(ScanOutcome::Unchanged {
                relative_path: relative_path.to_string(),
                unique_id: known.unique_id.clone(),
            });
        }

        let raw_text = String::from_utf8(bytes)
            .map_err(|e| TransarcError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let manifest = Manifest::parse_file(&raw_text, relative_path)?;

        Ok(ScanOutcome::Changed(Box::new(ScannedManifest {
            path: path.to_path_buf(),
            relative_path: relative_path.to_string(),
            raw_text,
            fingerprint,
            manifest,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;

    const ROOT: &str = "/mods";

    fn fs_with(files: &[(&str, &str)]) -> MemoryFs {
        let fs = MemoryFs::new();
        fs.add_dir(ROOT);
        for (path, text) in files {
            fs.add_file(format!("{ROOT}/{path}"), text);
        }
        fs
    }

    #[test]
    fn discover_respects_depth() {
        let fs = fs_with(&[
            ("manifest.json", "{}"),
            ("A/manifest.json", "{}"),
            ("Pack/Inner/manifest.json", "{}"),
            ("Empty/readme.txt", ""),
        ]);
        let root = Path::new(ROOT);

        let shallow = discover_manifests(&fs, root, "manifest.json", 1).unwrap();
        assert_eq!(shallow, vec![PathBuf::from("/mods/A/manifest.json")]);

        let deeper = discover_manifests(&fs, root, "manifest.json", 2).unwrap();
        assert_eq!(deeper.len(), 2);
    }

    #[test]
    fn discover_missing_root_fails() {
        let fs = MemoryFs::new();
        assert!(discover_manifests(&fs, Path::new("/nope"), "manifest.json", 1).is_err());
    }

    #[test]
    fn scan_classifies_files() {
        let good = r#"{"Name":"A","UniqueID":"X.Y"}"#;
        let fs = fs_with(&[
            ("A/manifest.json", good),
            ("B/manifest.json", "{ not json"),
            ("C/manifest.json", r#"{"Name":"C","UniqueID":"C.C"}"#),
        ]);
        let mut known = Record::new("X.Y", "a/MANIFEST.json");
        known.content_fingerprint = Some(hasher::hash_bytes(good.as_bytes()));

        let root = Path::new(ROOT);
        let scanner = Scanner::new(&fs, root, &[known]);
        let paths = discover_manifests(&fs, root, "manifest.json", 1).unwrap();
        let outcomes = scanner.scan(&paths, &CancelToken::new());

        assert!(matches!(
            &outcomes[0],
            ScanOutcome::Unchanged { relative_path, unique_id }
                if relative_path == "A/manifest.json" && unique_id == "X.Y"
        ));
        assert!(matches!(&outcomes[1], ScanOutcome::Failed { error: TransarcError::Parse { .. }, .. }));
        let ScanOutcome::Changed(scanned) = &outcomes[2] else {
            panic!("expected a changed manifest");
        };
        assert_eq!(scanned.manifest.unique_id.as_deref(), Some("C.C"));
        assert_eq!(scanned.relative_path, "C/manifest.json");
    }

    #[test]
    fn scan_after_cancel_reads_nothing() {
        let fs = fs_with(&[("A/manifest.json", r#"{"UniqueID":"A"}"#)]);
        let root = Path::new(ROOT);
        let token = CancelToken::new();
        token.cancel();
        let outcomes =
            Scanner::new(&fs, root, &[]).scan(&[PathBuf::from("/mods/A/manifest.json")], &token);
        assert!(matches!(outcomes[0], ScanOutcome::Cancelled));
    }
}
