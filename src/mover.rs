//! Moving a single file into its resolved destination

use crate::destination::Destination;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Result of moving one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved under its intended name
    Success,
    /// Moved, but under a `_Kopie(n)` name because the intended one was taken
    SuccessWithDisambiguation,
    /// Not moved; the source is left where it was
    Failure(String),
}

impl MoveOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, MoveOutcome::Failure(_))
    }
}

/// Move `source` to a destination produced by [`crate::destination::resolve`]
///
/// Never returns an error: every failure becomes [`MoveOutcome::Failure`]
/// so the caller can go on with the next file.
pub fn move_file(source: &Path, destination: &Destination) -> MoveOutcome {
    match relocate(source, &destination.path) {
        Ok(()) if destination.is_disambiguated() => MoveOutcome::SuccessWithDisambiguation,
        Ok(()) => MoveOutcome::Success,
        Err(e) => {
            warn!(?source, dest = ?destination.path, error = %e, "Failed to move file");
            MoveOutcome::Failure(e.to_string())
        }
    }
}

/// Rename, falling back to copy + delete across file systems
///
/// A failed copy may leave a partial file at `dest`.
fn relocate(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let rename_err = match fs::rename(source, dest) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    // Nothing to copy from, report the rename failure itself
    if !source.is_file() {
        return Err(rename_err);
    }

    debug!(?source, ?dest, error = %rename_err, "Rename failed, copying instead");
    fs::copy(source, dest)?;

    // Preserve modification time
    if let Ok(metadata) = fs::metadata(source)
        && let Ok(mtime) = metadata.modified()
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    fs::remove_file(source)
}
