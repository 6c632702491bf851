//! Aggregated results of a run and byte-size formatting

use crate::process::PhaseReport;
use crate::prune::PruneReport;
use crate::reconcile::ReconcileReport;
use std::time::Duration;

/// Reconciliation result together with the destination size around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub report: ReconcileReport,
    pub size_before: u64,
    pub size_after: u64,
}

impl ReconcileSummary {
    /// Space freed in the destination
    pub fn saved_bytes(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub source_files: usize,
    pub source_bytes: u64,
    pub images: PhaseReport,
    pub others: PhaseReport,
    /// Present when `delete_empty_source` is set
    pub pruned: Option<PruneReport>,
    /// Present when `delete_copy_pictures` is set
    pub reconciliation: Option<ReconcileSummary>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total_moved(&self) -> usize {
        self.images.moved() + self.others.moved()
    }

    pub fn total_disambiguated(&self) -> usize {
        self.images.disambiguated.len() + self.others.disambiguated.len()
    }

    pub fn total_failed(&self) -> usize {
        self.images.failures.len() + self.others.failures.len()
    }
}

const UNIT_LABELS: [&str; 5] = ["bytes", "kilobytes", "megabytes", "gigabytes", "terabytes"];

/// Scale a byte count by powers of 1024, rounded to three decimals
///
/// Returns the scaled value and its unit label, `(1.5, "kilobytes")` for
/// 1536. Values beyond the last label stay in terabytes.
pub fn scale_bytes(size: u64) -> (f64, &'static str) {
    let mut value = size as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNIT_LABELS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    ((value * 1000.0).round() / 1000.0, UNIT_LABELS[unit])
}

/// Human-readable byte count, e.g. `"1.5 kilobytes"`
pub fn format_bytes(size: u64) -> String {
    let (value, unit) = scale_bytes(size);
    format!("{value} {unit}")
}
