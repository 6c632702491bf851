//! Source directory scanning

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// List every file below `root`
///
/// Entries are visited sorted by file name so that two scans of the same
/// tree yield the same order. Symlinks are not followed; a link is listed
/// like a file unless it points to a directory. Unreadable entries are
/// logged and skipped.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::MissingDirectory {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(entry) if entry.path_is_symlink() => {
                if entry.path().is_dir() {
                    debug!(path = ?entry.path(), "Skipping symlink to directory");
                } else {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping unreadable entry"),
        }
    }

    debug!(?root, count = files.len(), "Scanned directory");
    Ok(files)
}

/// Total size in bytes of all files below `root`, `None` if it does not exist
pub fn directory_size(root: &Path) -> Option<u64> {
    if !root.exists() {
        return None;
    }

    let total = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum();

    Some(total)
}
