//! Capture metadata of images
//!
//! An image is opened once, its format is detected from the leading bytes
//! and its EXIF `DateTime` tag is read. Missing or broken metadata is an
//! ordinary outcome: the caller files such images under `No_exif_data`.

pub mod exif;

use chrono::NaiveDateTime;
use image::ImageFormat;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Date parts of an image used to build its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMetadata {
    /// Capture time as stored in the image
    pub taken: NaiveDateTime,
    /// `YYYY`
    pub year: String,
    /// `YYYY_MM`
    pub year_month: String,
    /// `IMG_YYYYMMDD_HHMMSS`
    pub file_stem: String,
    /// Lower-case extension of the detected image format
    pub extension: String,
}

impl CaptureMetadata {
    pub fn new(taken: NaiveDateTime, extension: impl Into<String>) -> Self {
        Self {
            taken,
            year: taken.format("%Y").to_string(),
            year_month: taken.format("%Y_%m").to_string(),
            file_stem: taken.format("IMG_%Y%m%d_%H%M%S").to_string(),
            extension: extension.into().to_lowercase(),
        }
    }
}

/// Why an image has no usable capture date
#[derive(Debug, Error)]
pub enum MetadataUnavailable {
    #[error("image could not be read: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("file content is not a known image format")]
    UnknownFormat,

    #[error("no EXIF data: {0}")]
    NoExif(#[source] ::exif::Error),

    #[error("EXIF DateTime tag is missing")]
    TagMissing,

    #[error("EXIF DateTime '{value}' does not match YYYY:MM:DD HH:MM:SS")]
    Unparsable { value: String },
}

/// Read the capture metadata of an image
///
/// The file handle lives only inside this call, so no failure path can
/// touch a closed or unopened image.
pub fn extract(path: &Path) -> Result<CaptureMetadata, MetadataUnavailable> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    // fill_buf peeks without consuming, the EXIF reader starts at byte 0
    let format =
        image::guess_format(reader.fill_buf()?).map_err(|_| MetadataUnavailable::UnknownFormat)?;
    let taken = exif::read_capture_time(&mut reader)?;

    let metadata = CaptureMetadata::new(taken, format_extension(format));
    debug!(?path, ?format, taken = %metadata.taken, "Extracted capture metadata");
    Ok(metadata)
}

/// Canonical file extension for a detected image format
pub fn format_extension(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        other => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| format!("{other:?}").to_lowercase()),
    }
}

/// Minimal JPEG carrying an EXIF `DateTime` tag, for tests across the crate
#[cfg(test)]
pub(crate) fn jpeg_with_datetime(datetime: &str) -> Vec<u8> {
    let mut value = datetime.as_bytes().to_vec();
    value.push(0);

    // Little-endian TIFF: header, one IFD entry, no next IFD, then the value
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0132u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&26u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&value);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// JPEG markers without any EXIF segment
#[cfg(test)]
pub(crate) fn jpeg_without_exif() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xD9]
}
