//! Organizer pipeline
//!
//! Handles the core logic of:
//! - Scanning and classifying the source directory
//! - Extracting capture dates from images
//! - Resolving collision-free destinations and moving files
//! - Optional cleanup of empty source folders and duplicate copies
//!
//! Files are processed one at a time in traversal order. A file that fails
//! is recorded and skipped; it never stops the batch.

use crate::classify::{FileRecord, classify};
use crate::config::Config;
use crate::context::{EventKind, Phase, RunContext};
use crate::destination;
use crate::error::Result;
use crate::metadata;
use crate::mover::{self, MoveOutcome};
use crate::prune;
use crate::reconcile;
use crate::report::{ReconcileSummary, RunReport};
use crate::scan;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{Level, debug, info, span, warn};

/// A file that reached its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A file that stayed at its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMove {
    pub source: PathBuf,
    /// Destination that was resolved before the move failed, if any
    pub destination: Option<PathBuf>,
    pub reason: String,
}

/// Outcome of moving one set of files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Moved under their intended name
    pub successes: Vec<MovedFile>,
    /// Moved under a `_Kopie(n)` name
    pub disambiguated: Vec<MovedFile>,
    pub failures: Vec<FailedMove>,
    /// Images filed under `No_exif_data`
    pub without_metadata: usize,
    pub elapsed: Duration,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            successes: Vec::new(),
            disambiguated: Vec::new(),
            failures: Vec::new(),
            without_metadata: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Number of files handled, equal to the input length of the phase
    pub fn total(&self) -> usize {
        self.successes.len() + self.disambiguated.len() + self.failures.len()
    }

    /// Files that left the source, with or without a copy marker
    pub fn moved(&self) -> usize {
        self.successes.len() + self.disambiguated.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Moved: {}, Renamed copies: {}, Failed: {}, Time: {:.1}s",
            self.total(),
            self.successes.len(),
            self.disambiguated.len(),
            self.failures.len(),
            self.elapsed.as_secs_f64()
        )
    }

    fn record(
        &mut self,
        source: &Path,
        destination: Option<PathBuf>,
        outcome: MoveOutcome,
        ctx: &mut RunContext,
    ) {
        match (outcome, destination) {
            (MoveOutcome::Success, Some(dest)) => {
                debug!(?source, destination = ?dest, "Moved file");
                ctx.record(self.phase, EventKind::Moved, source, Some(dest.display().to_string()));
                self.successes.push(MovedFile {
                    source: source.to_path_buf(),
                    destination: dest,
                });
            }
            (MoveOutcome::SuccessWithDisambiguation, Some(dest)) => {
                info!(?source, destination = ?dest, "Moved file under a copy name");
                ctx.record(
                    self.phase,
                    EventKind::Disambiguated,
                    source,
                    Some(dest.display().to_string()),
                );
                self.disambiguated.push(MovedFile {
                    source: source.to_path_buf(),
                    destination: dest,
                });
            }
            (MoveOutcome::Failure(reason), destination) => {
                ctx.record(self.phase, EventKind::MoveFailed, source, Some(reason.clone()));
                self.failures.push(FailedMove {
                    source: source.to_path_buf(),
                    destination,
                    reason,
                });
            }
            (_, None) => {
                // A success always carries its destination
                ctx.record(self.phase, EventKind::MoveFailed, source, None);
                self.failures.push(FailedMove {
                    source: source.to_path_buf(),
                    destination: None,
                    reason: "no destination".to_string(),
                });
            }
        }
    }
}

/// Main organizer driving a complete run
pub struct Organizer {
    config: Config,
}

impl Organizer {
    /// Create an organizer for the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the complete pipeline
    ///
    /// Only configuration problems and an unreadable source root return an
    /// error, and both happen before any file is moved.
    pub fn run(&self, ctx: &mut RunContext) -> Result<RunReport> {
        let _span = span!(Level::INFO, "organizer_run").entered();
        let started = Instant::now();

        self.config.validate()?;

        info!(source = %self.config.source_path.display(), "Scanning source directory...");
        let files = scan::list_files(&self.config.source_path)?;
        let source_bytes = scan::directory_size(&self.config.source_path).unwrap_or(0);
        info!(count = files.len(), bytes = source_bytes, "Found files");

        let classified = classify(files);
        info!(
            images = classified.images.len(),
            others = classified.others.len(),
            "Classified files"
        );

        let images = self.organize_images(&classified.images, ctx);
        let others = self.organize_others(&classified.others, ctx);

        let pruned = if self.config.delete_empty_source {
            Some(prune::prune_empty_dirs(
                &self.config.source_path,
                self.config.prune_depth,
                ctx,
            ))
        } else {
            None
        };

        let reconciliation = if self.config.delete_copy_pictures {
            let dest = &self.config.destination_path;
            let size_before = scan::directory_size(dest).unwrap_or(0);
            let report = reconcile::reconcile(dest, self.config.delete_retry_limit, ctx);
            let size_after = scan::directory_size(dest).unwrap_or(0);
            Some(ReconcileSummary {
                report,
                size_before,
                size_after,
            })
        } else {
            None
        };

        let report = RunReport {
            source_files: classified.total(),
            source_bytes,
            images,
            others,
            pruned,
            reconciliation,
            elapsed: started.elapsed(),
        };

        info!(
            moved = report.total_moved(),
            failed = report.total_failed(),
            elapsed_secs = report.elapsed.as_secs(),
            "Run complete"
        );
        Ok(report)
    }

    /// Move images into date folders, or `No_exif_data` without a date
    pub fn organize_images(&self, images: &[PathBuf], ctx: &mut RunContext) -> PhaseReport {
        let _span = span!(Level::INFO, "organize_images", count = images.len()).entered();
        let started = Instant::now();
        let mut report = PhaseReport::new(Phase::Images);
        let dest_root = &self.config.destination_path;
        let include_year = self.config.include_year_in_destination_folder_level;

        ctx.progress().phase_started(Phase::Images, images.len());
        for path in images {
            let (base_dir, stem, extension) = match metadata::extract(path) {
                Ok(meta) => (
                    destination::image_dir(dest_root, Some(&meta), include_year),
                    meta.file_stem,
                    meta.extension,
                ),
                Err(reason) => {
                    debug!(?path, %reason, "No capture date, filing under No_exif_data");
                    ctx.record(
                        Phase::Images,
                        EventKind::MetadataUnavailable,
                        path,
                        Some(reason.to_string()),
                    );
                    report.without_metadata += 1;
                    let record = FileRecord::new(path);
                    (
                        destination::image_dir(dest_root, None, include_year),
                        record.stem,
                        record.extension,
                    )
                }
            };

            self.place(path, &base_dir, &stem, &extension, &mut report, ctx);
            ctx.progress().advanced(Phase::Images);
        }
        ctx.progress().phase_finished(Phase::Images);

        report.elapsed = started.elapsed();
        info!("{}", report.summary());
        report
    }

    /// Move non-image files into `Other Files/<ext>_Files`
    pub fn organize_others(&self, others: &[PathBuf], ctx: &mut RunContext) -> PhaseReport {
        let _span = span!(Level::INFO, "organize_others", count = others.len()).entered();
        let started = Instant::now();
        let mut report = PhaseReport::new(Phase::OtherFiles);

        ctx.progress().phase_started(Phase::OtherFiles, others.len());
        for path in others {
            let record = FileRecord::new(path);
            let base_dir = destination::other_dir(&self.config.destination_path, &record.extension);
            self.place(
                path,
                &base_dir,
                &record.stem,
                &record.extension,
                &mut report,
                ctx,
            );
            ctx.progress().advanced(Phase::OtherFiles);
        }
        ctx.progress().phase_finished(Phase::OtherFiles);

        report.elapsed = started.elapsed();
        info!("{}", report.summary());
        report
    }

    /// Resolve a free name below `base_dir` and move `source` there
    fn place(
        &self,
        source: &Path,
        base_dir: &Path,
        stem: &str,
        extension: &str,
        report: &mut PhaseReport,
        ctx: &mut RunContext,
    ) {
        match destination::resolve(base_dir, stem, extension) {
            Ok(dest) => {
                let outcome = mover::move_file(source, &dest);
                report.record(source, Some(dest.path), outcome, ctx);
            }
            Err(e) => {
                warn!(?source, ?base_dir, error = %e, "Failed to resolve destination");
                let outcome = MoveOutcome::Failure(format!("could not prepare destination: {e}"));
                report.record(source, None, outcome, ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{jpeg_with_datetime, jpeg_without_exif};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("sorted");
        fs::create_dir_all(&source).unwrap();
        Fixture {
            _dir: dir,
            source,
            dest,
        }
    }

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_phase_report_summary() {
        let mut report = PhaseReport::new(Phase::Images);
        let mut ctx = RunContext::new();
        report.record(
            Path::new("/a.jpg"),
            Some(PathBuf::from("/out/a.jpg")),
            MoveOutcome::Success,
            &mut ctx,
        );
        report.record(
            Path::new("/b.jpg"),
            Some(PathBuf::from("/out/a_Kopie(1).jpg")),
            MoveOutcome::SuccessWithDisambiguation,
            &mut ctx,
        );
        report.record(
            Path::new("/c.jpg"),
            None,
            MoveOutcome::Failure("denied".into()),
            &mut ctx,
        );

        let summary = report.summary();
        assert!(summary.contains("Total: 3"));
        assert!(summary.contains("Moved: 1"));
        assert!(summary.contains("Renamed copies: 1"));
        assert!(summary.contains("Failed: 1"));
        assert_eq!(report.moved(), 2);
        assert_eq!(ctx.events().len(), 3);
    }

    #[test]
    fn test_image_with_capture_date_goes_to_year_folder() {
        let fx = fixture();
        let photo = fx.source.join("photo.jpg");
        write(&photo, &jpeg_with_datetime("2021:05:03 10:15:00"));

        let mut config = Config::new(&fx.source, &fx.dest);
        config.include_year_in_destination_folder_level = true;
        let mut ctx = RunContext::new();
        let report = Organizer::new(config).organize_images(&[photo.clone()], &mut ctx);

        let expected = fx.dest.join("2021").join("2021_05").join("IMG_20210503_101500.jpg");
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.successes[0].destination, expected);
        assert!(expected.is_file());
        assert!(!photo.exists());
    }

    #[test]
    fn test_image_without_year_level() {
        let fx = fixture();
        let photo = fx.source.join("photo.jpg");
        write(&photo, &jpeg_with_datetime("2021:05:03 10:15:00"));

        let config = Config::new(&fx.source, &fx.dest);
        let report = Organizer::new(config).organize_images(&[photo], &mut RunContext::new());

        assert_eq!(
            report.successes[0].destination,
            fx.dest.join("2021_05").join("IMG_20210503_101500.jpg")
        );
    }

    #[test]
    fn test_image_without_exif_keeps_its_name() {
        let fx = fixture();
        let photo = fx.source.join("photo.JPG");
        write(&photo, &jpeg_without_exif());

        let config = Config::new(&fx.source, &fx.dest);
        let mut ctx = RunContext::new();
        let report = Organizer::new(config).organize_images(&[photo], &mut ctx);

        assert_eq!(report.without_metadata, 1);
        assert_eq!(
            report.successes[0].destination,
            fx.dest.join("No_exif_data").join("photo.jpg")
        );
        assert_eq!(ctx.events_of(EventKind::MetadataUnavailable).count(), 1);
    }

    #[test]
    fn test_same_capture_time_gets_copy_names() {
        let fx = fixture();
        let shots: Vec<PathBuf> = ["a", "b", "c"]
            .iter()
            .map(|dir| {
                let path = fx.source.join(dir).join("photo.jpg");
                write(&path, &jpeg_with_datetime("2022:08:14 07:00:01"));
                path
            })
            .collect();

        let config = Config::new(&fx.source, &fx.dest);
        let report = Organizer::new(config).organize_images(&shots, &mut RunContext::new());

        let folder = fx.dest.join("2022_08");
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.successes[0].destination, folder.join("IMG_20220814_070001.jpg"));
        let copies: Vec<_> = report
            .disambiguated
            .iter()
            .map(|m| m.destination.clone())
            .collect();
        assert_eq!(
            copies,
            vec![
                folder.join("IMG_20220814_070001_Kopie(1).jpg"),
                folder.join("IMG_20220814_070001_Kopie(2).jpg"),
            ]
        );
    }

    #[test]
    fn test_other_files_grouped_by_extension() {
        let fx = fixture();
        let doc = fx.source.join("document.pdf");
        let archive = fx.source.join("backup.TAR.gz");
        let bare = fx.source.join("README");
        write(&doc, b"%PDF");
        write(&archive, b"gz");
        write(&bare, b"read me");

        let config = Config::new(&fx.source, &fx.dest);
        let report = Organizer::new(config)
            .organize_others(&[doc, archive, bare], &mut RunContext::new());

        let other = fx.dest.join("Other Files");
        let destinations: Vec<_> = report
            .successes
            .iter()
            .map(|m| m.destination.clone())
            .collect();
        assert_eq!(
            destinations,
            vec![
                other.join("pdf_Files").join("document.pdf"),
                other.join("tar.gz_Files").join("backup.tar.gz"),
                other.join("No_extension_Files").join("README"),
            ]
        );
    }

    #[test]
    fn test_failure_is_isolated() {
        let fx = fixture();
        let first = fx.source.join("first.txt");
        let vanished = fx.source.join("vanished.txt");
        let last = fx.source.join("last.txt");
        write(&first, b"1");
        write(&last, b"3");

        let config = Config::new(&fx.source, &fx.dest);
        let report = Organizer::new(config).organize_others(
            &[first, vanished.clone(), last],
            &mut RunContext::new(),
        );

        assert_eq!(report.total(), 3);
        assert_eq!(report.successes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, vanished);
        assert!(fx.dest.join("Other Files").join("txt_Files").join("last.txt").is_file());
    }

    #[test]
    fn test_full_run_and_second_run_is_idempotent() {
        let fx = fixture();
        write(
            &fx.source.join("cam").join("photo.jpg"),
            &jpeg_with_datetime("2021:05:03 10:15:00"),
        );
        write(&fx.source.join("scan.png"), &jpeg_without_exif());
        write(&fx.source.join("docs").join("document.pdf"), b"%PDF");

        let mut config = Config::new(&fx.source, &fx.dest);
        config.include_year_in_destination_folder_level = true;
        config.delete_empty_source = true;
        config.delete_copy_pictures = true;
        let organizer = Organizer::new(config);

        let mut ctx = RunContext::new();
        let first = organizer.run(&mut ctx).unwrap();
        assert_eq!(first.source_files, 3);
        assert_eq!(first.images.total(), 2);
        assert_eq!(first.others.total(), 1);
        assert_eq!(first.total_moved(), 3);
        assert_eq!(first.total_failed(), 0);
        assert!(fx.dest.join("2021/2021_05/IMG_20210503_101500.jpg").is_file());
        assert!(fx.dest.join("No_exif_data/scan.png").is_file());
        assert!(fx.dest.join("Other Files/pdf_Files/document.pdf").is_file());

        // Emptied source folders are gone, the source root stays
        assert!(fx.source.is_dir());
        assert!(!fx.source.join("cam").exists());
        assert!(!fx.source.join("docs").exists());

        let second = organizer.run(&mut RunContext::new()).unwrap();
        assert_eq!(second.source_files, 0);
        assert_eq!(second.total_moved(), 0);
        assert_eq!(second.total_failed(), 0);
        let reconciled = second.reconciliation.unwrap();
        assert!(reconciled.report.candidates.is_empty());
    }

    #[test]
    fn test_run_rejects_bad_config_before_touching_files() {
        let fx = fixture();
        let file = fx.source.join("keep.txt");
        write(&file, b"stay");

        let config = Config::new(&fx.source, fx.source.join("sorted"));
        assert!(Organizer::new(config).run(&mut RunContext::new()).is_err());
        assert!(file.is_file());

        let roundabout = fx.dest.join("..").join("source").join("sorted");
        let config = Config::new(&fx.source, roundabout);
        assert!(Organizer::new(config).run(&mut RunContext::new()).is_err());
        assert!(file.is_file());
    }
}
