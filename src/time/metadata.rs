//! EXIF metadata timestamps for images

use super::{DateObservation, DateSource};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Exact layout of a GPS date stamp joined with a rendered GPS time stamp
const GPS_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S%.3f";

/// Raw date strings of one tag block, keyed by the block they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagGroup {
    /// IFD0: last modification of the image
    Ifd0 { date_time: Option<String> },
    /// EXIF sub-IFD: when the picture was taken
    SubIfd { date_time_original: Option<String> },
    /// GPS IFD: UTC date and `HH:MM:SS.fff` time
    Gps {
        date_stamp: Option<String>,
        time_stamp: Option<String>,
    },
}

/// Reads tag blocks from a media file
pub trait MetadataDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<TagGroup>>;
}

/// Decoder backed by kamadak-exif
///
/// Handles TIFF, JPEG, HEIF, PNG and WebP containers. Anything else is a
/// decode error, which callers treat as "no metadata".
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDecoder;

impl MetadataDecoder for ExifDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<TagGroup>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let exif = Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| Error::MetadataRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let ascii = |tag: Tag| exif.get_field(tag, In::PRIMARY).and_then(ascii_value);

        let groups = vec![
            TagGroup::Ifd0 {
                date_time: ascii(Tag::DateTime),
            },
            TagGroup::SubIfd {
                date_time_original: ascii(Tag::DateTimeOriginal),
            },
            TagGroup::Gps {
                date_stamp: ascii(Tag::GPSDateStamp),
                time_stamp: exif
                    .get_field(Tag::GPSTimeStamp, In::PRIMARY)
                    .and_then(gps_time_value),
            },
        ];

        trace!(?path, ?groups, "Decoded EXIF tag groups");
        Ok(groups)
    }
}

/// First ASCII string of a field, without trailing NULs
fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(values) => {
            let raw = values.first()?;
            let text = std::str::from_utf8(raw).ok()?;
            let text = text.trim_end_matches('\0').trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// Render the GPS time stamp (hour, minute, second rationals) as `HH:MM:SS.fff`
fn gps_time_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => {
            format_gps_time(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64())
        }
        _ => None,
    }
}

fn format_gps_time(hours: f64, minutes: f64, seconds: f64) -> Option<String> {
    if !(hours.is_finite() && minutes.is_finite() && seconds.is_finite()) {
        return None;
    }
    // Truncate so 59.9999 stays 59.999 instead of rounding up to 60.000
    let seconds = (seconds * 1000.0 + 1e-6).floor() / 1000.0;
    Some(format!(
        "{:02}:{:02}:{:06.3}",
        hours as u32, minutes as u32, seconds
    ))
}

/// Turn decoded tag groups into observations
///
/// Order is metadata-secondary, metadata-primary, then GPS. Unparseable
/// strings are dropped.
pub fn observations_from_tags(groups: &[TagGroup]) -> Vec<DateObservation> {
    let mut secondary = Vec::new();
    let mut primary = Vec::new();
    let mut gps = Vec::new();

    for group in groups {
        match group {
            TagGroup::Ifd0 { date_time } => {
                if let Some(dt) = date_time.as_deref().and_then(parse_exif_datetime) {
                    secondary.push(DateObservation::new(DateSource::MetadataSecondary, dt));
                }
            }
            TagGroup::SubIfd { date_time_original } => {
                if let Some(dt) = date_time_original.as_deref().and_then(parse_exif_datetime) {
                    primary.push(DateObservation::new(DateSource::MetadataPrimary, dt));
                }
            }
            TagGroup::Gps {
                date_stamp: Some(date),
                time_stamp: Some(time),
            } => {
                if let Some(dt) = parse_gps_datetime(date, time) {
                    gps.push(DateObservation::new(DateSource::Gps, dt));
                }
            }
            TagGroup::Gps { .. } => {}
        }
    }

    secondary.extend(primary);
    secondary.extend(gps);
    secondary
}

/// Parse a GPS date stamp and time stamp, e.g. `2024:01:15` + `14:30:00.000`
pub fn parse_gps_datetime(date_stamp: &str, time_stamp: &str) -> Option<NaiveDateTime> {
    let joined = format!("{} {}", date_stamp.trim(), time_stamp.trim());
    NaiveDateTime::parse_from_str(&joined, GPS_DATETIME_FORMAT).ok()
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // EXIF format: "2024:01:15 14:30:00" or with quotes
    let s = s.trim().trim_matches('"');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}
