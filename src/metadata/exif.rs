//! EXIF capture time extraction for images

use super::MetadataUnavailable;
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::io::{BufRead, Seek};
use tracing::trace;

/// Layout of EXIF date values: "YYYY:MM:DD HH:MM:SS"
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Read the `DateTime` tag of the primary image from an EXIF container
pub fn read_capture_time<R: BufRead + Seek>(
    reader: &mut R,
) -> Result<NaiveDateTime, MetadataUnavailable> {
    let exif = Reader::new()
        .read_from_container(reader)
        .map_err(MetadataUnavailable::NoExif)?;

    let field = exif
        .get_field(Tag::DateTime, In::PRIMARY)
        .ok_or(MetadataUnavailable::TagMissing)?;

    // The raw ASCII value keeps the EXIF layout; display_value() reformats it
    let raw = match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|part| String::from_utf8_lossy(part).into_owned()),
        _ => None,
    }
    .ok_or(MetadataUnavailable::TagMissing)?;

    let taken = parse_exif_datetime(&raw).ok_or(MetadataUnavailable::Unparsable { value: raw })?;
    trace!(%taken, "Found EXIF DateTime");
    Ok(taken)
}

/// Parse an EXIF datetime string, tolerating padding and a trailing NUL
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok()
}
