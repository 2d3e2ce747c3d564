use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::vfs::FileAccess;

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    read_only: BTreeSet<PathBuf>,
}

/// In-memory filesystem for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: RwLock<Tree>,
}

impl MemoryFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        for dir in path.as_ref().ancestors() {
            tree.dirs.insert(dir.to_path_buf());
        }
    }

    /// Create or replace a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.files
            .insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.files.remove(path.as_ref()).is_some()
    }

    /// Make writes to `path` fail with `PermissionDenied`.
    pub fn set_read_only(&self, path: impl AsRef<Path>) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.read_only.insert(path.as_ref().to_path_buf());
    }

    #[must_use]
    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.files
            .get(path.as_ref())
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

impl FileAccess for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.files.contains_key(path) || tree.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.dirs.contains(path)
    }

    fn child_dirs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        if !tree.dirs.contains(dir) {
            return Err(io::Error::new(io::ErrorKind::NotFound, dir.display().to_string()).into());
        }
        Ok(tree
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(dir) && !is_hidden(d))
            .cloned()
            .collect())
    }

    fn find_files(
        &self,
        root: &Path,
        file_name: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<PathBuf>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tree
            .files
            .keys()
            .filter(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == file_name))
            .filter(|p| {
                let Ok(rel) = p.strip_prefix(root) else {
                    return false;
                };
                if rel.components().any(|c| c.as_os_str().to_string_lossy().starts_with('.')) {
                    return false;
                }
                let dirs_below_root = rel.components().count().saturating_sub(1);
                dirs_below_root >= 1 && max_depth.is_none_or(|max| dirs_below_root <= max)
            })
            .cloned()
            .collect())
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, path.display().to_string()).into()
        })
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if tree.read_only.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                path.display().to_string(),
            )
            .into());
        }
        tree.files
            .insert(path.to_path_buf(), contents.as_bytes().to_vec());
        Ok(())
    }
}
