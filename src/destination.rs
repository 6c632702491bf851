//! Destination layout and collision-free path resolution
//!
//! Layout below the destination root:
//! - `YYYY/YYYY_MM/` or `YYYY_MM/` for images with a capture date
//! - `No_exif_data/` for images without one
//! - `Other Files/<ext>_Files/` for everything else
//!
//! A name that is already taken gets `_Kopie(n)` appended to its stem, with
//! `n` counting up from 1. The duplicate reconciler relies on exactly this
//! shape to find the original a copy was made from.

use crate::metadata::CaptureMetadata;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::trace;

/// Marker placed between stem and index of a disambiguated name
pub const COPY_MARKER: &str = "_Kopie";

/// Folder for images whose capture date could not be read
pub const NO_EXIF_DIR: &str = "No_exif_data";

/// Folder collecting all non-image files
pub const OTHER_FILES_DIR: &str = "Other Files";

/// Type folder for files without an extension
pub const NO_EXTENSION_DIR: &str = "No_extension_Files";

/// Highest copy index probed before giving up on a directory
const MAX_COPY_INDEX: u32 = 1_000_000;

static COPY_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn copy_name_pattern() -> &'static Regex {
    COPY_NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<stem>.*)_Kopie\((?P<index>\d+)\)(?P<ext>\..*)?$").unwrap()
    })
}

/// A free destination path and the copy index it needed, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub path: PathBuf,
    pub copy_index: Option<u32>,
}

impl Destination {
    pub fn is_disambiguated(&self) -> bool {
        self.copy_index.is_some()
    }
}

/// Build `stem.ext` or `stem_Kopie(n).ext`; an empty extension adds no dot
pub fn file_name(stem: &str, extension: &str, copy_index: Option<u32>) -> String {
    let mut name = stem.to_string();
    if let Some(index) = copy_index {
        name.push_str(&format!("{COPY_MARKER}({index})"));
    }
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    name
}

/// Split a disambiguated file name into the original name and its index
///
/// `a_Kopie(3).jpg` yields `("a.jpg", 3)`. Names without the marker in
/// that exact position yield `None`.
pub fn strip_copy_marker(name: &str) -> Option<(String, u32)> {
    let captures = copy_name_pattern().captures(name)?;
    let index = captures.name("index")?.as_str().parse().ok()?;
    let stem = captures.name("stem")?.as_str();
    let ext = captures.name("ext").map_or("", |m| m.as_str());
    Some((format!("{stem}{ext}"), index))
}

/// Anything at the path counts as taken, including dangling symlinks
fn is_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Resolve a free path for `stem.extension` inside `base_dir`
///
/// Creates `base_dir` with its parents first. The extension is written in
/// lower case. Probing is strictly `_Kopie(1)`, `_Kopie(2)`, ... so the
/// smallest free index wins.
pub fn resolve(base_dir: &Path, stem: &str, extension: &str) -> io::Result<Destination> {
    fs::create_dir_all(base_dir)?;

    let extension = extension.to_lowercase();
    let path = base_dir.join(file_name(stem, &extension, None));
    if !is_taken(&path) {
        return Ok(Destination {
            path,
            copy_index: None,
        });
    }

    for index in 1..=MAX_COPY_INDEX {
        let path = base_dir.join(file_name(stem, &extension, Some(index)));
        if !is_taken(&path) {
            trace!(?path, index, "Resolved name collision");
            return Ok(Destination {
                path,
                copy_index: Some(index),
            });
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name for '{}' in {}",
            file_name(stem, &extension, None),
            base_dir.display()
        ),
    ))
}

/// Folder for an image, by capture date when there is one
pub fn image_dir(
    destination: &Path,
    metadata: Option<&CaptureMetadata>,
    include_year: bool,
) -> PathBuf {
    match metadata {
        Some(meta) if include_year => destination.join(&meta.year).join(&meta.year_month),
        Some(meta) => destination.join(&meta.year_month),
        None => destination.join(NO_EXIF_DIR),
    }
}

/// Folder for a non-image file, grouped by lower-cased extension
pub fn other_dir(destination: &Path, extension: &str) -> PathBuf {
    let type_dir = if extension.is_empty() {
        NO_EXTENSION_DIR.to_string()
    } else {
        format!("{}_Files", extension.to_lowercase())
    };
    destination.join(OTHER_FILES_DIR).join(type_dir)
}
