//! Configuration types for the photo organizer
//!
//! A run is driven by one JSON file. Config files live in a config
//! directory, one file per source/destination pair:
//!
//! ```json
//! {
//!     "source_path": "/media/card/DCIM",
//!     "destination_path": "/home/me/Pictures/Sorted",
//!     "include_year_in_destination_folder_level": "True",
//!     "delete_empty_source": "true",
//!     "delete_copy_pictures": false
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default number of bottom-up passes when pruning empty directories
pub const DEFAULT_PRUNE_DEPTH: usize = 10;

/// Default number of deletion passes during duplicate reconciliation
pub const DEFAULT_DELETE_RETRY_LIMIT: usize = 10;

/// Configuration for one organizer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory whose files get organized
    pub source_path: PathBuf,

    /// Root of the organized tree
    pub destination_path: PathBuf,

    /// Nest `YYYY_MM` folders inside a `YYYY` folder
    #[serde(default, deserialize_with = "bool_like")]
    pub include_year_in_destination_folder_level: bool,

    /// Remove directories left empty in the source after moving
    #[serde(default, deserialize_with = "bool_like")]
    pub delete_empty_source: bool,

    /// Delete disambiguated copies whose size matches their original
    #[serde(default, deserialize_with = "bool_like")]
    pub delete_copy_pictures: bool,

    /// Maximum bottom-up passes of the empty directory pruner
    #[serde(default = "default_prune_depth")]
    pub prune_depth: usize,

    /// Maximum deletion passes of the duplicate reconciler
    #[serde(default = "default_delete_retry_limit")]
    pub delete_retry_limit: usize,
}

fn default_prune_depth() -> usize {
    DEFAULT_PRUNE_DEPTH
}

fn default_delete_retry_limit() -> usize {
    DEFAULT_DELETE_RETRY_LIMIT
}

/// Accept `true`/`false` as well as strings, which count as true only when
/// they equal `"true"` ignoring case. Every other value is false.
fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

impl Config {
    /// Create a config with every optional switch turned off
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            include_year_in_destination_folder_level: false,
            delete_empty_source: false,
            delete_copy_pictures: false,
            prune_depth: DEFAULT_PRUNE_DEPTH,
            delete_retry_limit: DEFAULT_DELETE_RETRY_LIMIT,
        }
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(config_file = %path.display(), "Configuration parsed");
        Ok(config)
    }

    /// Pretty JSON rendering shown to the user before a run starts
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the paths before any file is touched
    ///
    /// Both paths are resolved first, so `..` segments and symlinks cannot
    /// hide a destination that lies inside the source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let source_missing = || ConfigError::SourceMissing {
            path: self.source_path.clone(),
        };
        if !self.source_path.is_dir() {
            return Err(source_missing());
        }
        let source = fs::canonicalize(&self.source_path).map_err(|_| source_missing())?;

        if resolve_path(&self.destination_path).starts_with(&source) {
            return Err(ConfigError::DestinationInsideSource {
                destination: self.destination_path.clone(),
                source_dir: self.source_path.clone(),
            });
        }

        Ok(())
    }
}

/// Absolute form of a path that may not exist yet
///
/// The longest existing prefix is canonicalized, the missing rest is
/// appended with `.` dropped and `..` removing the previous segment.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    let mut resolved = loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            break canonical;
        }
        match existing.parent() {
            Some(parent) => {
                missing.push(existing.components().next_back());
                existing = parent;
            }
            None => break existing.to_path_buf(),
        }
    };

    for component in missing.into_iter().rev().flatten() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// List the `*.json` files of a config directory, sorted by name
pub fn discover_config_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Pick one config file out of the discovered candidates
///
/// No candidates yields `None`, a single candidate is taken without asking,
/// otherwise `choose` receives the sorted list and returns an index. An
/// index outside the list counts as no choice.
pub fn select_config<E, F>(candidates: &[PathBuf], choose: F) -> Result<Option<&Path>, E>
where
    F: FnOnce(&[PathBuf]) -> Result<Option<usize>, E>,
{
    match candidates {
        [] => Ok(None),
        [only] => Ok(Some(only.as_path())),
        _ => Ok(choose(candidates)?
            .and_then(|index| candidates.get(index))
            .map(PathBuf::as_path)),
    }
}

/// Errors that end a run before any file is moved
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to read config directory '{}': {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No configuration file found in '{}'", dir.display())]
    NoConfigFound { dir: PathBuf },

    #[error("Source directory '{}' does not exist", path.display())]
    SourceMissing { path: PathBuf },

    #[error(
        "Destination '{}' is inside the source directory '{}'",
        destination.display(),
        source_dir.display()
    )]
    DestinationInsideSource {
        destination: PathBuf,
        source_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bool_like_values() {
        let config = parse(
            r#"{
                "source_path": "/in",
                "destination_path": "/out",
                "include_year_in_destination_folder_level": "True",
                "delete_empty_source": true,
                "delete_copy_pictures": "yes"
            }"#,
        );
        assert!(config.include_year_in_destination_folder_level);
        assert!(config.delete_empty_source);
        assert!(!config.delete_copy_pictures);

        let config = parse(
            r#"{
                "source_path": "/in",
                "destination_path": "/out",
                "include_year_in_destination_folder_level": 1,
                "delete_empty_source": "FALSE"
            }"#,
        );
        assert!(!config.include_year_in_destination_folder_level);
        assert!(!config.delete_empty_source);
        assert!(!config.delete_copy_pictures);
        assert_eq!(config.prune_depth, DEFAULT_PRUNE_DEPTH);
        assert_eq!(config.delete_retry_limit, DEFAULT_DELETE_RETRY_LIMIT);
    }

    #[test]
    fn test_missing_required_path_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{ "source_path": "/in" }"#).unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_unreadable_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_discover_config_files_sorted_json_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zeta.json"), "{}").unwrap();
        fs::write(dir.path().join("alpha.JSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = discover_config_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha.JSON", "zeta.json"]);
    }

    #[test]
    fn test_select_config() {
        let none: Vec<PathBuf> = vec![];
        let picked: Result<_, ()> = select_config(&none, |_| panic!("not asked"));
        assert_eq!(picked.unwrap(), None);

        let one = vec![PathBuf::from("only.json")];
        let picked: Result<_, ()> = select_config(&one, |_| panic!("not asked"));
        assert_eq!(picked.unwrap(), Some(Path::new("only.json")));

        let many = vec![PathBuf::from("a.json"), PathBuf::from("b.json")];
        let picked: Result<_, ()> = select_config(&many, |list| {
            assert_eq!(list.len(), 2);
            Ok(Some(1))
        });
        assert_eq!(picked.unwrap(), Some(Path::new("b.json")));

        let picked: Result<_, ()> = select_config(&many, |_| Ok(Some(7)));
        assert_eq!(picked.unwrap(), None);
    }

    #[test]
    fn test_validate_rejects_destination_inside_source() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path(), dir.path().join("sorted"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DestinationInsideSource { .. })
        ));

        let config = Config::new(dir.path().join("missing"), dir.path().join("out"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceMissing { .. })
        ));

        let source = dir.path().join("in");
        fs::create_dir(&source).unwrap();
        let config = Config::new(&source, dir.path().join("out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_resolves_parent_segments() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in");
        fs::create_dir(&source).unwrap();

        // `x` does not exist, the destination still ends up below `in`
        let sneaky = dir.path().join("x").join("..").join("in").join("sorted");
        assert!(matches!(
            Config::new(&source, &sneaky).validate(),
            Err(ConfigError::DestinationInsideSource { .. })
        ));

        let through_existing = source.join("..").join("in").join("sorted");
        assert!(matches!(
            Config::new(&source, &through_existing).validate(),
            Err(ConfigError::DestinationInsideSource { .. })
        ));

        let beside = source.join("..").join("out");
        assert!(Config::new(&source, &beside).validate().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_follows_symlinked_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in");
        fs::create_dir(&source).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&source, &link).unwrap();

        assert!(matches!(
            Config::new(&source, link.join("sorted")).validate(),
            Err(ConfigError::DestinationInsideSource { .. })
        ));
    }

    #[test]
    fn test_bool_like_does_not_trim() {
        let config = parse(
            r#"{
                "source_path": "/in",
                "destination_path": "/out",
                "delete_empty_source": " true "
            }"#,
        );
        assert!(!config.delete_empty_source);
    }
}
