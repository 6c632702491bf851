//! Image / other partitioning of scanned files
//!
//! Classification looks at file names only, never at file contents.

use std::path::{Path, PathBuf};

/// Extensions treated as images, compared ignoring case
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp"];

/// Kind of a scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Other,
}

/// Files split by kind, each half in input order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classified {
    pub images: Vec<PathBuf>,
    pub others: Vec<PathBuf>,
}

impl Classified {
    pub fn total(&self) -> usize {
        self.images.len() + self.others.len()
    }
}

/// Decide the kind of a file from the text after the last '.' of its name
pub fn file_kind(path: &Path) -> FileKind {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return FileKind::Other,
    };

    match name.rsplit_once('.') {
        Some((_, ext)) if is_image_extension(ext) => FileKind::Image,
        _ => FileKind::Other,
    }
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Partition files into images and others
pub fn classify<I>(files: I) -> Classified
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut classified = Classified::default();
    for path in files {
        match file_kind(&path) {
            FileKind::Image => classified.images.push(path),
            FileKind::Other => classified.others.push(path),
        }
    }
    classified
}

/// A source file with the name parts used to build its destination
///
/// The stem is everything before the first '.', the extension everything
/// after it, so `archive.tar.gz` keeps `tar.gz` as its extension. A name
/// without any '.' has an empty extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub source: PathBuf,
    pub stem: String,
    pub extension: String,
}

impl FileRecord {
    pub fn new(source: &Path) -> Self {
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (stem, extension) = match name.split_once('.') {
            Some((stem, extension)) => (stem.to_string(), extension.to_string()),
            None => (name, String::new()),
        };

        Self {
            source: source.to_path_buf(),
            stem,
            extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_total_and_ordered() {
        let input: Vec<PathBuf> = [
            "/in/a.JPG",
            "/in/notes.txt",
            "/in/scan.Tiff",
            "/in/README",
            "/in/b.jpeg",
            "/in/c.png.bak",
            "/in/d.bmp",
            "/in/e.tif",
            "/in/movie.mp4",
            "/in/f.PNG",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let classified = classify(input.clone());
        assert_eq!(classified.total(), input.len());
        assert_eq!(
            classified.images,
            vec![
                PathBuf::from("/in/a.JPG"),
                PathBuf::from("/in/scan.Tiff"),
                PathBuf::from("/in/b.jpeg"),
                PathBuf::from("/in/d.bmp"),
                PathBuf::from("/in/e.tif"),
                PathBuf::from("/in/f.PNG"),
            ]
        );
        assert_eq!(
            classified.others,
            vec![
                PathBuf::from("/in/notes.txt"),
                PathBuf::from("/in/README"),
                PathBuf::from("/in/c.png.bak"),
                PathBuf::from("/in/movie.mp4"),
            ]
        );
    }

    #[test]
    fn test_file_kind_uses_last_extension() {
        assert_eq!(file_kind(Path::new("holiday.backup.jpg")), FileKind::Image);
        assert_eq!(file_kind(Path::new("photo.jpg.txt")), FileKind::Other);
        assert_eq!(file_kind(Path::new("jpg")), FileKind::Other);
        assert_eq!(file_kind(Path::new("photo.")), FileKind::Other);
    }

    #[test]
    fn test_file_record_splits_on_first_dot() {
        let record = FileRecord::new(Path::new("/in/document.pdf"));
        assert_eq!(record.stem, "document");
        assert_eq!(record.extension, "pdf");

        let record = FileRecord::new(Path::new("/in/archive.tar.gz"));
        assert_eq!(record.stem, "archive");
        assert_eq!(record.extension, "tar.gz");

        let record = FileRecord::new(Path::new("/in/Makefile"));
        assert_eq!(record.stem, "Makefile");
        assert_eq!(record.extension, "");
    }
}
