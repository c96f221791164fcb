//! Time extraction module
//!
//! This module collects timestamp observations for a media file from:
//! - EXIF metadata (IFD0 DateTime, sub-IFD DateTimeOriginal, GPS stamp)
//! - Filename patterns
//! - File system creation and modification times
//!
//! and arbitrates them into the single most trustworthy creation time.

pub mod arbitrate;
pub mod filename;
pub mod layout;
pub mod metadata;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use arbitrate::{DateFilter, arbitrate};

/// Source of a timestamp observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    /// File system creation time
    FileCreated,
    /// File system modification time
    FileModified,
    /// GPS date stamp + time stamp
    Gps,
    /// EXIF DateTimeOriginal (sub-IFD)
    MetadataPrimary,
    /// EXIF DateTime (IFD0)
    MetadataSecondary,
    /// Parsed from filename
    Filename,
    /// Anything else
    Unknown,
}

impl DateSource {
    /// Position on the reliability ladder (higher wins)
    ///
    /// File creation ranks below modification time and filename dates.
    /// Copies between volumes often reset the creation time, so this
    /// ordering is kept as documented policy.
    pub fn reliability(self) -> u8 {
        match self {
            DateSource::Gps => 50,
            DateSource::MetadataPrimary => 40,
            DateSource::MetadataSecondary => 30,
            DateSource::Filename => 20,
            DateSource::FileModified => 10,
            DateSource::FileCreated => 1,
            DateSource::Unknown => 0,
        }
    }

    /// Short human-readable label
    pub fn label(self) -> &'static str {
        match self {
            DateSource::FileCreated => "file created",
            DateSource::FileModified => "file modified",
            DateSource::Gps => "GPS",
            DateSource::MetadataPrimary => "EXIF original",
            DateSource::MetadataSecondary => "EXIF modified",
            DateSource::Filename => "filename",
            DateSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single timestamp discovered for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateObservation {
    /// Where the timestamp came from
    pub source: DateSource,
    /// The timestamp itself (local wall-clock time)
    pub timestamp: NaiveDateTime,
}

impl DateObservation {
    pub fn new(source: DateSource, timestamp: NaiveDateTime) -> Self {
        Self { source, timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_source_debug() {
        assert_eq!(format!("{:?}", DateSource::Gps), "Gps");
        assert_eq!(format!("{:?}", DateSource::MetadataPrimary), "MetadataPrimary");
        assert_eq!(format!("{:?}", DateSource::Filename), "Filename");
        assert_eq!(format!("{:?}", DateSource::FileCreated), "FileCreated");
    }

    #[test]
    fn test_reliability_ladder() {
        let ladder = [
            DateSource::Gps,
            DateSource::MetadataPrimary,
            DateSource::MetadataSecondary,
            DateSource::Filename,
            DateSource::FileModified,
            DateSource::FileCreated,
            DateSource::Unknown,
        ];
        for pair in ladder.windows(2) {
            assert!(
                pair[0].reliability() > pair[1].reliability(),
                "{:?} should outrank {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}
