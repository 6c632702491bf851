//! Removal of directories left empty after moving

use crate::context::{EventKind, Phase, RunContext};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directories removed by one prune call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    /// Directories that were empty but could not be removed
    pub failed: Vec<(PathBuf, String)>,
    /// Walks performed, at most the requested depth
    pub passes: usize,
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// Remove empty directories below `root`, walking bottom-up up to `depth` times
///
/// Stops as soon as a walk removes nothing. `root` itself is never removed.
pub fn prune_empty_dirs(root: &Path, depth: usize, ctx: &mut RunContext) -> PruneReport {
    let mut report = PruneReport::default();
    if !root.is_dir() {
        warn!(?root, "Directory to prune does not exist");
        return report;
    }

    let mut failed: HashSet<PathBuf> = HashSet::new();
    ctx.progress().phase_started(Phase::PruneSource, depth);

    for _ in 0..depth {
        report.passes += 1;
        let mut removed_in_pass = 0;

        let dirs = WalkDir::new(root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path());

        for dir in dirs {
            if failed.contains(&dir) || !is_empty_dir(&dir) {
                continue;
            }

            match fs::remove_dir(&dir) {
                Ok(()) => {
                    debug!(?dir, "Removed empty directory");
                    ctx.record(Phase::PruneSource, EventKind::DirectoryRemoved, &dir, None);
                    report.removed.push(dir);
                    removed_in_pass += 1;
                }
                Err(e) => {
                    warn!(?dir, error = %e, "Failed to remove empty directory");
                    report.failed.push((dir.clone(), e.to_string()));
                    failed.insert(dir);
                }
            }
        }

        ctx.progress().advanced(Phase::PruneSource);
        if removed_in_pass == 0 {
            break;
        }
    }

    ctx.progress().phase_finished(Phase::PruneSource);
    info!(
        removed = report.removed.len(),
        passes = report.passes,
        "Pruned empty directories"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prunes_nested_empty_dirs_but_keeps_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a").join("b").join("c")).unwrap();
        fs::create_dir_all(root.join("keep").join("empty")).unwrap();
        fs::write(root.join("keep").join("file.txt"), b"x").unwrap();

        let report = prune_empty_dirs(root, 10, &mut RunContext::new());

        assert!(root.is_dir());
        assert!(!root.join("a").exists());
        assert!(root.join("keep").join("file.txt").is_file());
        assert!(!root.join("keep").join("empty").exists());
        assert_eq!(report.removed.len(), 4);
        assert!(report.failed.is_empty());
        // The second walk finds nothing left and ends the loop
        assert_eq!(report.passes, 2);
    }

    #[test]
    fn test_empty_root_is_kept() {
        let dir = TempDir::new().unwrap();
        let report = prune_empty_dirs(dir.path(), 10, &mut RunContext::new());
        assert!(dir.path().is_dir());
        assert!(report.removed.is_empty());
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn test_zero_depth_removes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let report = prune_empty_dirs(dir.path(), 0, &mut RunContext::new());
        assert!(dir.path().join("empty").exists());
        assert_eq!(report.passes, 0);
    }

    #[test]
    fn test_removed_dirs_are_logged_in_context() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let mut ctx = RunContext::new();
        prune_empty_dirs(dir.path(), 3, &mut ctx);
        assert_eq!(ctx.events_of(EventKind::DirectoryRemoved).count(), 1);
    }
}
