//! Import settings for the photo importer

use crate::error::{Error, Result};
use crate::time::layout::{DateLayout, token_summary};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default naming pattern: `<root>/2024/20240115/143022.jpg`
pub const DEFAULT_NAMING_PATTERN: &str = "yyyy/yyyyMMdd/HHmmss";

/// Files at or above this size are compared by digest instead of byte by byte (100MB)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// How to proceed when the computed target path is already occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    /// Add a " (N)" suffix until a free name is found
    Rename,
    /// Leave both files untouched
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Drop the source if it is identical to the existing file, rename otherwise
    #[default]
    Smart,
}

/// Settings for one import run
///
/// Supplied once per run and never modified while the run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Directory to scan for media files
    pub source_dir: PathBuf,

    /// Root of the organized tree (organizes in place under `source_dir` when absent)
    pub destination_dir: Option<PathBuf>,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Slash-separated layouts: directory levels, then the file name
    pub naming_pattern: String,

    /// Copy instead of move
    pub preserve_originals: bool,

    /// Report intended actions without touching the filesystem
    pub dry_run: bool,

    /// Conflict policy for occupied target paths
    pub duplicate_handling: DuplicateHandling,

    /// Timestamps before this are treated as bogus
    pub minimum_valid_date: NaiveDateTime,

    /// Placeholder dates cameras emit when their clock was never set
    pub ignored_dates: Vec<NaiveDateTime>,

    /// Worker count for target previews (0 = auto)
    pub max_parallelism: usize,

    /// Large file threshold in bytes (files at or above use digest comparison)
    pub large_file_threshold: u64,

    /// Supported file extensions, without the leading dot
    pub extensions: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            destination_dir: None,
            recursive: true,
            naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            preserve_originals: false,
            dry_run: false,
            duplicate_handling: DuplicateHandling::default(),
            minimum_valid_date: midnight(1990, 1, 1),
            ignored_dates: vec![midnight(1970, 1, 1), midnight(1980, 1, 1)],
            max_parallelism: 0, // Auto-detect
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            extensions: default_extensions(),
        }
    }
}

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Extensions the metadata decoder understands, grouped by container family
fn default_extensions() -> Vec<String> {
    const JPEG: &[&str] = &["jpg", "jpeg", "jfif", "jpe"];
    const TIFF: &[&str] = &["tiff", "tif"];
    const OTHER_IMAGES: &[&str] = &[
        "psd", "psb", "png", "bmp", "dib", "gif", "ico", "pgm", "ppm", "pbm", "pnm", "pcx",
        "webp", "heic", "heif", "avif",
    ];
    const QUICKTIME: &[&str] = &["mov", "mp4", "m4v", "3gp", "3g2"];
    const RAW: &[&str] = &[
        "cr2", "cr3", "crw", "nef", "arw", "srf", "sr2", "ari", "sraw", "dng", "raw", "raf",
        "orf", "rw2", "pef", "ptx", "pxn", "srw", "x3f", "mrw", "mdc", "dcr", "kdc", "dcs",
        "dc2", "k25", "erf", "mef", "mos", "r3d", "rwl", "rwz", "iiq", "cap", "3fr", "fff",
        "bay", "ciff", "cs1", "drf",
    ];

    [JPEG, TIFF, OTHER_IMAGES, QUICKTIME, RAW]
        .concat()
        .into_iter()
        .map(String::from)
        .collect()
}

impl ImportSettings {
    /// Settings for `source_dir` with every other value at its default
    pub fn for_source<P: Into<PathBuf>>(source_dir: P) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// Root of the organized tree
    pub fn destination_root(&self) -> &Path {
        self.destination_dir.as_deref().unwrap_or(&self.source_dir)
    }

    /// Check if a file extension is supported
    pub fn is_supported(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.is_supported(e))
    }

    /// Effective worker count for the preview pool
    pub fn parallelism(&self) -> usize {
        if self.max_parallelism > 0 {
            self.max_parallelism
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Validate settings before a run
    ///
    /// The source directory must exist, the naming pattern must have no empty
    /// levels, and its file name level must contain at least one field.
    pub fn validate(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(Error::SourceNotFound {
                path: self.source_dir.clone(),
            });
        }

        if self.naming_pattern.trim().is_empty() {
            return Err(Error::Config("Naming pattern is empty".into()));
        }

        if self.naming_pattern.split('/').any(str::is_empty) {
            return Err(Error::Config(format!(
                "Naming pattern '{}' contains an empty level",
                self.naming_pattern
            )));
        }

        let file_layout = self.naming_pattern.rsplit('/').next().unwrap_or_default();
        if DateLayout::parse(file_layout).is_constant() {
            return Err(Error::Config(format!(
                "File name layout '{}' contains no date or time field (tokens: {})",
                file_layout,
                token_summary()
            )));
        }

        if self.extensions.is_empty() {
            return Err(Error::Config("No supported extensions configured".into()));
        }

        Ok(())
    }

    /// Parse a `YYYY-MM-DD` date as the minimum valid timestamp
    pub fn parse_minimum_date(value: &str) -> Result<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")?;
        Ok(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Load settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: ImportSettings =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(settings)
    }

    /// Save settings to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample settings file content
    pub fn sample_config() -> String {
        r#"# Photo Importer Configuration File
# This file uses TOML format (https://toml.io)

# Directory to scan for photos and videos
source_dir = "D:/Camera Uploads"

# Root of the organized tree. Remove this line to organize in place.
destination_dir = "D:/Photos"

# Descend into subdirectories of source_dir
recursive = true

# Naming pattern: slash-separated levels, the last one names the file.
# Fields: yyyy yy MM M dd d HH H mm m ss s; everything else is copied verbatim.
# The original extension is always kept.
# Example: "yyyy/yyyyMMdd/HHmmss" -> 2024/20240115/143022.jpg
naming_pattern = "yyyy/yyyyMMdd/HHmmss"

# Copy files instead of moving them
preserve_originals = false

# Dry run mode - show what would be done without actually doing it
dry_run = false

# What to do when the target file already exists:
# - smart: remove the source if identical, otherwise rename (default)
# - rename: add " (2)", " (3)", ... before the extension
# - skip: leave both files untouched
# - overwrite: replace the existing file
duplicate_handling = "smart"

# Timestamps before this are ignored
minimum_valid_date = "1990-01-01T00:00:00"

# Placeholder dates written by cameras with an unset clock
ignored_dates = ["1970-01-01T00:00:00", "1980-01-01T00:00:00"]

# Worker count for target previews (0 = auto-detect)
max_parallelism = 0

# Files at or above this size (bytes) are compared by SHA-256 digest
# Default: 100MB = 104857600 bytes
large_file_threshold = 104857600

# Supported file extensions (case-insensitive)
extensions = [
    "jpg", "jpeg", "jfif", "jpe", "tiff", "tif", "png", "gif", "bmp", "webp",
    "heic", "heif", "avif", "mov", "mp4", "m4v", "3gp",
    "cr2", "cr3", "nef", "arw", "dng", "raw", "raf", "orf", "rw2", "pef", "srw",
]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving a settings file
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read settings file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse settings file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write settings file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize settings
    SerializeError { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = ImportSettings::default();
        assert_eq!(settings.naming_pattern, "yyyy/yyyyMMdd/HHmmss");
        assert_eq!(settings.duplicate_handling, DuplicateHandling::Smart);
        assert!(settings.recursive);
        assert!(!settings.preserve_originals);
        assert_eq!(settings.minimum_valid_date, midnight(1990, 1, 1));
        assert_eq!(settings.ignored_dates.len(), 2);
        assert_eq!(settings.large_file_threshold, 100 * 1024 * 1024);
    }

    #[test]
    fn test_is_supported() {
        let settings = ImportSettings::default();
        assert!(settings.is_supported("jpg"));
        assert!(settings.is_supported("JPG"));
        assert!(settings.is_supported(".cr2"));
        assert!(settings.is_supported("mov"));
        assert!(!settings.is_supported("txt"));
        assert!(settings.is_supported_path(Path::new("a/IMG_1.HEIC")));
        assert!(!settings.is_supported_path(Path::new("a/README")));
    }

    #[test]
    fn test_destination_root_defaults_to_source() {
        let mut settings = ImportSettings::for_source("/photos/in");
        assert_eq!(settings.destination_root(), Path::new("/photos/in"));

        settings.destination_dir = Some(PathBuf::from("/photos/out"));
        assert_eq!(settings.destination_root(), Path::new("/photos/out"));
    }

    #[test]
    fn test_validate() {
        let dir = tempdir().unwrap();
        let mut settings = ImportSettings::for_source(dir.path());
        assert!(settings.validate().is_ok());

        settings.naming_pattern = "yyyy//HHmmss".into();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        settings.naming_pattern = "yyyy/photo".into();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        settings.naming_pattern = "Photos/yyyy/HHmmss".into();
        assert!(settings.validate().is_ok());

        settings.naming_pattern = DEFAULT_NAMING_PATTERN.into();
        settings.source_dir = dir.path().join("missing");
        assert!(matches!(
            settings.validate(),
            Err(Error::SourceNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_minimum_date() {
        let date = ImportSettings::parse_minimum_date("2001-02-03").unwrap();
        assert_eq!(date, midnight(2001, 2, 3));
        assert!(ImportSettings::parse_minimum_date("03/02/2001").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Config").join("import.toml");

        let mut settings = ImportSettings::for_source(dir.path());
        settings.duplicate_handling = DuplicateHandling::Skip;
        settings.naming_pattern = "yyyy-MM/dd/HH-mm-ss".into();
        settings.save_to_file(&path).unwrap();

        let loaded = ImportSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.duplicate_handling, DuplicateHandling::Skip);
        assert_eq!(loaded.naming_pattern, "yyyy-MM/dd/HH-mm-ss");
        assert_eq!(loaded.minimum_valid_date, settings.minimum_valid_date);
        assert_eq!(loaded.ignored_dates, settings.ignored_dates);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: ImportSettings =
            toml::from_str("source_dir = \"/in\"\ndry_run = true\n").unwrap();
        assert_eq!(settings.source_dir, PathBuf::from("/in"));
        assert!(settings.dry_run);
        assert_eq!(settings.naming_pattern, DEFAULT_NAMING_PATTERN);
        assert!(settings.recursive);
    }

    #[test]
    fn test_sample_config_parses() {
        let settings: ImportSettings = toml::from_str(&ImportSettings::sample_config()).unwrap();
        assert_eq!(settings.duplicate_handling, DuplicateHandling::Smart);
        assert_eq!(settings.destination_dir, Some(PathBuf::from("D:/Photos")));
        assert!(settings.is_supported("nef"));
    }
}
