//! Duplicate reconciliation in the destination tree
//!
//! Every `<stem>_Kopie(n).<ext>` file is compared against `<stem>.<ext>` in
//! the same folder. Equal size counts as a duplicate and the copy is
//! deleted. Size is a cheap stand-in for content: two different files of
//! identical size are treated as duplicates.

use crate::context::{EventKind, Phase, RunContext};
use crate::destination::strip_copy_marker;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Why a copy was not deleted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileProblem {
    #[error("size mismatch: copy has {copy_size} bytes, original {original_size}")]
    SizeMismatch { copy_size: u64, original_size: u64 },

    #[error("file vanished")]
    FileVanished,

    #[error("original missing: {}", original.display())]
    OriginalMissing { original: PathBuf },

    #[error("could not be deleted: {reason}")]
    CouldNotDelete { reason: String },
}

/// A file carrying the copy marker and the original it was named after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub copy: PathBuf,
    pub original: PathBuf,
}

/// A copy confirmed as duplicate of its original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCopy {
    pub copy: PathBuf,
    pub original: PathBuf,
    pub size: u64,
}

/// Result of one reconciliation
///
/// Every candidate ends up either in `deleted` or in `problems`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub candidates: Vec<Candidate>,
    pub deleted: Vec<DuplicateCopy>,
    pub problems: Vec<(PathBuf, ReconcileProblem)>,
    /// Deletion passes needed, at most the retry limit
    pub deletion_passes: usize,
}

impl ReconcileReport {
    /// Bytes freed by the deleted copies
    pub fn reclaimed_bytes(&self) -> u64 {
        self.deleted.iter().map(|d| d.size).sum()
    }
}

/// Collect every file below `root` whose name carries the copy marker
pub fn find_candidates(root: &Path) -> Vec<Candidate> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            let (original_name, _) = strip_copy_marker(name)?;
            let original = e.path().with_file_name(original_name);
            Some(Candidate {
                copy: e.into_path(),
                original,
            })
        })
        .collect()
}

fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Decide whether a candidate is a duplicate of its original
fn inspect(candidate: &Candidate) -> Result<DuplicateCopy, ReconcileProblem> {
    let copy_size = file_size(&candidate.copy).ok_or(ReconcileProblem::FileVanished)?;
    let original_size =
        file_size(&candidate.original).ok_or_else(|| ReconcileProblem::OriginalMissing {
            original: candidate.original.clone(),
        })?;

    if copy_size != original_size {
        return Err(ReconcileProblem::SizeMismatch {
            copy_size,
            original_size,
        });
    }

    Ok(DuplicateCopy {
        copy: candidate.copy.clone(),
        original: candidate.original.clone(),
        size: copy_size,
    })
}

/// Delete marked copies, retrying those still present up to `retry_limit` passes
///
/// Returns the deleted copies, the ones left over with their problem, and
/// the number of passes made.
fn delete_with_retry<F>(
    marked: Vec<DuplicateCopy>,
    retry_limit: usize,
    mut remove: F,
) -> (Vec<DuplicateCopy>, Vec<(DuplicateCopy, ReconcileProblem)>, usize)
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut pending = marked;
    let mut deleted = Vec::new();
    let mut leftovers = Vec::new();
    let mut last_error: HashMap<PathBuf, String> = HashMap::new();
    let mut passes = 0;

    while !pending.is_empty() && passes < retry_limit {
        passes += 1;
        let mut still_present = Vec::new();

        for duplicate in pending {
            let result = remove(&duplicate.copy);
            if let Err(e) = &result
                && e.kind() == io::ErrorKind::NotFound
                && passes == 1
            {
                // Gone before we got to it
                leftovers.push((duplicate, ReconcileProblem::FileVanished));
                continue;
            }
            if fs::symlink_metadata(&duplicate.copy).is_err() {
                deleted.push(duplicate);
                continue;
            }
            if let Err(e) = result {
                last_error.insert(duplicate.copy.clone(), e.to_string());
            }
            still_present.push(duplicate);
        }

        if !still_present.is_empty() {
            debug!(
                pass = passes,
                remaining = still_present.len(),
                "Copies still present after deletion pass"
            );
        }
        pending = still_present;
    }

    leftovers.extend(pending.into_iter().map(|duplicate| {
        let reason = last_error
            .remove(&duplicate.copy)
            .unwrap_or_else(|| format!("still present after {passes} passes"));
        (duplicate, ReconcileProblem::CouldNotDelete { reason })
    }));

    (deleted, leftovers, passes)
}

/// Find, verify and delete duplicate copies below `root`
pub fn reconcile(root: &Path, retry_limit: usize, ctx: &mut RunContext) -> ReconcileReport {
    let _span = span!(Level::INFO, "reconcile", ?root).entered();
    let mut report = ReconcileReport::default();
    if !root.is_dir() {
        debug!(?root, "Destination does not exist, nothing to reconcile");
        return report;
    }

    report.candidates = find_candidates(root);
    info!(count = report.candidates.len(), "Found renamed copies");
    ctx.progress()
        .phase_started(Phase::Reconcile, report.candidates.len());

    let mut marked = Vec::new();
    for candidate in &report.candidates {
        match inspect(candidate) {
            Ok(duplicate) => marked.push(duplicate),
            Err(problem) => {
                warn!(copy = ?candidate.copy, %problem, "Keeping renamed copy");
                ctx.record(
                    Phase::Reconcile,
                    EventKind::ReconcileProblem,
                    &candidate.copy,
                    Some(problem.to_string()),
                );
                report.problems.push((candidate.copy.clone(), problem));
            }
        }
        ctx.progress().advanced(Phase::Reconcile);
    }

    let (deleted, leftovers, passes) =
        delete_with_retry(marked, retry_limit, |path| fs::remove_file(path));
    report.deletion_passes = passes;

    for duplicate in &deleted {
        debug!(copy = ?duplicate.copy, original = ?duplicate.original, "Deleted duplicate copy");
        ctx.record(
            Phase::Reconcile,
            EventKind::DuplicateDeleted,
            &duplicate.copy,
            Some(duplicate.original.display().to_string()),
        );
    }
    report.deleted = deleted;

    for (duplicate, problem) in leftovers {
        warn!(copy = ?duplicate.copy, %problem, "Duplicate copy was not deleted");
        ctx.record(
            Phase::Reconcile,
            EventKind::ReconcileProblem,
            &duplicate.copy,
            Some(problem.to_string()),
        );
        report.problems.push((duplicate.copy, problem));
    }

    ctx.progress().phase_finished(Phase::Reconcile);
    info!(
        candidates = report.candidates.len(),
        deleted = report.deleted.len(),
        problems = report.problems.len(),
        reclaimed_bytes = report.reclaimed_bytes(),
        "Reconciliation complete"
    );
    report
}
