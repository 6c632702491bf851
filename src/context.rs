//! Per-run context handed to every phase
//!
//! Holds the run start time, the structured event log and the progress
//! sink. Nothing here is global: two runs in one process do not share
//! state.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Phases of an organizer run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Images,
    OtherFiles,
    PruneSource,
    Reconcile,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Images => "Moving pictures",
            Phase::OtherFiles => "Moving other files",
            Phase::PruneSource => "Removing empty folders",
            Phase::Reconcile => "Deleting duplicate copies",
        }
    }
}

/// What happened to a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Moved,
    Disambiguated,
    MoveFailed,
    MetadataUnavailable,
    DirectoryRemoved,
    DuplicateDeleted,
    ReconcileProblem,
}

/// One entry of the run log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    /// Time since the run started
    pub at: Duration,
    pub phase: Phase,
    pub kind: EventKind,
    pub path: PathBuf,
    pub detail: Option<String>,
}

/// Receives progress notifications; every method defaults to doing nothing
pub trait ProgressSink {
    fn phase_started(&mut self, _phase: Phase, _total: usize) {}

    fn advanced(&mut self, _phase: Phase) {}

    fn phase_finished(&mut self, _phase: Phase) {}
}

/// Sink for runs without any progress display
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

pub struct RunContext {
    started: Instant,
    events: Vec<RunEvent>,
    progress: Box<dyn ProgressSink>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_progress(Box::new(NoProgress))
    }

    pub fn with_progress(progress: Box<dyn ProgressSink>) -> Self {
        Self {
            started: Instant::now(),
            events: Vec::new(),
            progress,
        }
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn record(&mut self, phase: Phase, kind: EventKind, path: &Path, detail: Option<String>) {
        self.events.push(RunEvent {
            at: self.elapsed(),
            phase,
            kind,
            path: path.to_path_buf(),
            detail,
        });
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    pub fn progress(&mut self) -> &mut dyn ProgressSink {
        self.progress.as_mut()
    }
}
