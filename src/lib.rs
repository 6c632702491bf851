//! Photo Organizer - A CLI tool that sorts photos into date folders
//!
//! This library moves the files of a source directory into an organized
//! destination tree with support for:
//! - EXIF capture-date extraction for images
//! - Date folders (`YYYY_MM`, optionally nested in `YYYY`)
//! - Grouping of non-image files by extension
//! - Collision-free naming with `_Kopie(n)` suffixes
//! - Pruning of emptied source folders
//! - Size-based removal of duplicate copies

pub mod classify;
pub mod cli;
pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod metadata;
pub mod mover;
pub mod process;
pub mod prune;
pub mod reconcile;
pub mod report;
pub mod scan;

pub use cli::Cli;
pub use config::{Config, ConfigError, discover_config_files, select_config};
pub use context::{EventKind, Phase, ProgressSink, RunContext};
pub use error::{Error, Result};
pub use process::{Organizer, PhaseReport};
pub use reconcile::{ReconcileProblem, ReconcileReport};
pub use report::{RunReport, format_bytes};
