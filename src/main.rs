//! Photo Organizer - sort photos into date folders
//!
//! Picks a JSON config, asks for approval, runs the organizer with
//! progress bars and prints a summary of what was moved and cleaned up.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use photo_organizer::{
    Cli, Config, ConfigError, Organizer, Phase, ProgressSink, RunContext, RunReport,
    discover_config_files, format_bytes, select_config,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored terminal output for the final summary

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a title centered in the separator width
    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));
        let _ = stdout().execute(Print(&format!("{left_pad}{}\n\n", title.bold())));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{msg}\n")));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{msg}\n")));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{msg}\n")));
    }

    pub fn print_key_value(key: &str, value: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// One line per file: icon, source, then destination or reason
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{path}\n")));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// One progress bar per phase
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    fn new() -> Self {
        Self { bar: None }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ")
    }
}

impl ProgressSink for BarProgress {
    fn phase_started(&mut self, phase: Phase, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(phase.label());
        self.bar = Some(bar);
    }

    fn advanced(&mut self, _phase: Phase) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn phase_finished(&mut self, phase: Phase) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{} done", phase.label()));
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_path = get_log_path(&cli.log_dir);
    // Dropped when main returns, which flushes the file log
    let _guard = setup_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Photo Organizer starting"
    );

    let config = match load_config(&cli) {
        Ok(Some(config)) => config,
        Ok(None) => {
            cli_output::print_hint("No configuration selected, nothing to do.");
            info!("No configuration selected");
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Ok(report_failure(&e)),
    };

    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    if !approve(&cli, &config)? {
        cli_output::print_hint("Run cancelled.");
        info!("Run declined by user");
        return Ok(ExitCode::SUCCESS);
    }

    let organizer = Organizer::new(config);
    let mut ctx = RunContext::with_progress(Box::new(BarProgress::new()));

    match organizer.run(&mut ctx) {
        Ok(report) => {
            print_summary(&cli, organizer.config(), &report);
            cli_output::print_separator();
            cli_output::print_log_path(&log_path.display().to_string());
            info!(log_file = %log_path.display(), "Processing complete. Log saved to");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&anyhow::Error::from(e))),
    }
}

/// Log and print a run-ending error
fn report_failure(e: &anyhow::Error) -> ExitCode {
    error!(error = %e, "Run aborted");
    cli_output::print_error(&format!("Error: {e:#}"));
    ExitCode::FAILURE
}

/// Log file below `log_dir`, named after the start time
fn get_log_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("Run_{timestamp}.log"))
}

/// Resolve config path - supports shorthand syntax
///
/// `--config holiday` finds `holiday.json` in the working directory or in
/// the config directory.
fn resolve_config_path(config_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("json")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = with_extension
        .file_name()
        .unwrap_or(config_path.as_os_str());
    let in_config_dir = config_dir.join(filename);
    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load the config named on the command line or chosen from the config directory
///
/// Returns `None` when the user leaves the selection without a choice.
fn load_config(cli: &Cli) -> Result<Option<Config>> {
    let path = match cli.config {
        Some(ref config_path) => resolve_config_path(&cli.config_dir, config_path),
        None => {
            let candidates = discover_config_files(&cli.config_dir)?;
            if candidates.is_empty() {
                return Err(ConfigError::NoConfigFound {
                    dir: cli.config_dir.clone(),
                }
                .into());
            }

            let chosen = select_config(&candidates, |list| {
                if cli.yes {
                    return Ok(Some(0));
                }
                let names: Vec<String> = list
                    .iter()
                    .enumerate()
                    .map(|(i, path)| {
                        let name = path.file_name().unwrap_or(path.as_os_str());
                        format!("{}: {}", i + 1, name.to_string_lossy())
                    })
                    .collect();
                Select::with_theme(&ColorfulTheme::default())
                    .with_prompt("Select a configuration")
                    .items(&names)
                    .default(0)
                    .interact_opt()
            })?;

            match chosen {
                Some(path) => path.to_path_buf(),
                None => return Ok(None),
            }
        }
    };

    info!(config_file = %path.display(), "Loading configuration from file");
    let file_config = Config::load_from_file(&path)?;
    Ok(Some(cli.merge_with_config(file_config)))
}

/// Show the config and ask before touching any file
fn approve(cli: &Cli, config: &Config) -> Result<bool> {
    if cli.yes {
        return Ok(true);
    }

    cli_output::print_separator();
    cli_output::print_title("Configuration");
    println!("{}", config.to_pretty_json()?);
    cli_output::print_separator();

    let approved = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Start with this configuration?")
        .default(false)
        .interact()?;
    Ok(approved)
}

fn print_summary(cli: &Cli, config: &Config, report: &RunReport) {
    use cli_output::*;

    print_separator();
    print_title("Processing complete");
    print_separator();

    print_blank();
    print_key_value("Source", &config.source_path.display().to_string());
    print_key_value("Destination", &config.destination_path.display().to_string());
    print_key_value(
        "Files found",
        &format!("{} ({})", report.source_files, format_bytes(report.source_bytes)),
    );
    print_key_value("Images", &report.images.total().to_string());
    print_key_value("Other files", &report.others.total().to_string());
    print_blank();

    print_stat("Moved", &report.total_moved().to_string(), CliTheme::SUCCESS);
    print_stat(
        "Renamed copies",
        &report.total_disambiguated().to_string(),
        CliTheme::ACCENT,
    );
    print_stat(
        "Without capture date",
        &report.images.without_metadata.to_string(),
        CliTheme::WARNING,
    );
    print_stat("Failed", &report.total_failed().to_string(), CliTheme::ERROR);

    if let Some(pruned) = &report.pruned {
        print_stat(
            "Empty folders removed",
            &pruned.removed.len().to_string(),
            CliTheme::SUCCESS,
        );
    }

    if let Some(reconciled) = &report.reconciliation {
        print_stat(
            "Duplicates deleted",
            &reconciled.report.deleted.len().to_string(),
            CliTheme::SUCCESS,
        );
        print_stat(
            "Space saved",
            &format_bytes(reconciled.saved_bytes()),
            CliTheme::SUCCESS,
        );
        if !reconciled.report.problems.is_empty() {
            print_stat(
                "Copies kept",
                &reconciled.report.problems.len().to_string(),
                CliTheme::WARNING,
            );
        }
    }
    print_blank();

    if cli.verbose {
        print_separator();
        print_hint("Detailed results");
        print_blank();

        for phase in [&report.images, &report.others] {
            for moved in &phase.successes {
                print_result(
                    "✓",
                    CliTheme::SUCCESS,
                    &moved.source.display().to_string(),
                    &format!("→ {}", moved.destination.display()),
                );
            }
            for moved in &phase.disambiguated {
                print_result(
                    "≡",
                    CliTheme::ACCENT,
                    &moved.source.display().to_string(),
                    &format!("→ {}", moved.destination.display()),
                );
            }
        }

        if let Some(reconciled) = &report.reconciliation {
            for (copy, problem) in &reconciled.report.problems {
                print_result(
                    "⊘",
                    CliTheme::WARNING,
                    &copy.display().to_string(),
                    &problem.to_string(),
                );
            }
        }
    }

    let failures: Vec<_> = report
        .images
        .failures
        .iter()
        .chain(&report.others.failures)
        .collect();

    if !failures.is_empty() {
        print_separator();
        print_warning(&format!("{} files could not be moved", failures.len()));
        print_blank();
        for failure in failures {
            print_result(
                "✗",
                CliTheme::ERROR,
                &failure.source.display().to_string(),
                &failure.reason,
            );
        }
    }
}

/// Setup logging (file + console)
///
/// The console layer only shows warnings so that it does not tear up the
/// progress bars.
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    }

    Ok(guard)
}
