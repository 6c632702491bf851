//! Error types for the photo organizer

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo organizer
///
/// Only run-level failures end up here. Per-file problems are reported
/// through [`crate::mover::MoveOutcome`] and
/// [`crate::reconcile::ReconcileProblem`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Directory does not exist: {}", path.display())]
    MissingDirectory { path: PathBuf },
}
