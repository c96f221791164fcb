//! Photo Importer - date-based organization of photos and videos
//!
//! This library moves or copies media files into a tree laid out by a
//! naming pattern, with support for:
//! - EXIF metadata extraction (DateTimeOriginal, DateTime, GPS stamp)
//! - Filename timestamp parsing over a library of 40 layouts
//! - Arbitration of all observed timestamps by reliability
//! - Duplicate-aware conflict handling (rename, skip, overwrite, smart)
//! - Parallel target previews with Rayon
//! - Progress reporting and cancellation

pub mod candidate;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod error;
pub mod hash;
pub mod process;
pub mod target;
pub mod time;

pub use candidate::ImportCandidate;
pub use cli::{Cli, Command};
pub use config::{ConfigError, DuplicateHandling, ImportSettings};
pub use conflict::OutcomeKind;
pub use error::{Error, Result};
pub use process::{CancellationToken, FileOutcome, ImportRunResult, Importer};
pub use time::{DateObservation, DateSource};
