//! Error types for the photo importer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo importer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo importer
///
/// Only errors that abort a whole operation surface through this type.
/// Per-file problems during a run are recorded as failed outcomes instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No free file name left for {path}")]
    NoFreeTargetName { path: PathBuf },

    #[error("Failed to read metadata from {path}: {message}")]
    MetadataRead { path: PathBuf, message: String },

    #[error("File hash computation failed for {path}: {message}")]
    HashComputation { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Chrono parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}
