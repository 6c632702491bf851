//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Photo Organizer - sort photos into date folders by their EXIF capture time
///
/// Images are moved into `YYYY_MM` folders (optionally nested in `YYYY`)
/// and renamed after their capture time. Other files are grouped by
/// extension. Name clashes get a `_Kopie(n)` suffix.
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    ///
    /// Without it, the config directory is searched for `*.json` files.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Directory searched for configuration files
    #[arg(long, default_value = "configs", env = "PHOTO_ORGANIZER_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Run unattended: take the first config found and skip the approval prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the source directory of the config file
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Override the destination directory of the config file
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, default_value = "Log")]
    pub log_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_path = source.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination_path = destination.clone();
        }
        config
    }
}
