//! File access capability.
//!
//! Pipelines only touch the filesystem through [`FileAccess`], so tests can
//! swap the real disk for [`MemoryFs`].

pub mod disk;
pub mod memory;

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, TransarcError};

pub use disk::DiskFs;
pub use memory::MemoryFs;

pub trait FileAccess: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate, non-hidden child directories of `dir`, sorted.
    fn child_dirs(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Files literally named `file_name` at least one directory below `root`
    /// and at most `max_depth` directories below it (`None` = unbounded).
    fn find_files(
        &self,
        root: &Path,
        file_name: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<PathBuf>>;

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| TransarcError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()>;
}

/// Root-relative path with forward slashes.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Lookup key for a relative path: separators normalized, case folded.
#[must_use]
pub fn path_key(relative: &str) -> String {
    relative
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_matches('/')
        .to_lowercase()
}
