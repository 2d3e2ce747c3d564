use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::Result;
use crate::vfs::FileAccess;

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

impl FileAccess for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn child_dirs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() && !is_hidden(&path) {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn find_files(
        &self,
        root: &Path,
        file_name: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<PathBuf>> {
        // Walk depth counts the file itself, so a file in root/A sits at depth 2.
        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(true) // skips .transarc and friends
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false) // Prevent symlink loops
            .max_depth(max_depth.map(|d| d + 1))
            .build()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.depth() >= 2)
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|e| e.file_name().to_string_lossy() == file_name)
            .map(ignore::DirEntry::into_path)
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents)?;
        Ok(())
    }
}
