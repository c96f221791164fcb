//! Placing a file at its target, resolving conflicts with existing files

use crate::config::{DuplicateHandling, ImportSettings};
use crate::error::Result;
use crate::hash::files_identical;
use crate::target::{TargetPath, build_target_path, is_same_file};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Copy buffer size (256KB)
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Result class of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    /// File placed (or would be, in a dry run)
    Success,
    /// Nothing done on purpose
    Skipped,
    /// Source deleted because an identical file already sits at the target
    DuplicateRemoved,
    /// Something went wrong; see the message
    Failed,
}

/// What happened when placing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    pub kind: OutcomeKind,
    pub target: Option<PathBuf>,
    pub message: Option<String>,
}

impl PlacementOutcome {
    fn new(kind: OutcomeKind, target: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            message: Some(message.into()),
        }
    }

    fn failed(target: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Failed, target, message)
    }
}

/// Put `source` where `date` and the settings say it belongs
///
/// Never overwrites an existing file unless the policy is overwrite. Errors
/// are reported in the outcome, not retried.
pub fn place_file(source: &Path, date: &NaiveDateTime, settings: &ImportSettings) -> PlacementOutcome {
    match build_target_path(source, date, settings) {
        Ok(target) => resolve_and_place(source, &target, settings),
        Err(e) => PlacementOutcome::failed(None, e.to_string()),
    }
}

fn resolve_and_place(source: &Path, target: &TargetPath, settings: &ImportSettings) -> PlacementOutcome {
    let target_path = target.path();

    if is_same_file(source, &target_path) {
        return PlacementOutcome::new(OutcomeKind::Skipped, Some(target_path), "File is already in place");
    }

    if settings.dry_run {
        return dry_run_outcome(source, target_path, settings);
    }

    if !target_path.exists() {
        return place(source, target_path, settings, false);
    }

    debug!(?source, target = ?target_path, policy = ?settings.duplicate_handling, "Target exists");
    match settings.duplicate_handling {
        DuplicateHandling::Skip => PlacementOutcome::new(
            OutcomeKind::Skipped,
            Some(target_path),
            "File already exists, skipped",
        ),
        DuplicateHandling::Overwrite => place(source, target_path, settings, true),
        DuplicateHandling::Rename => rename_target(source, target, settings),
        DuplicateHandling::Smart => place_smart(source, target, target_path, settings),
    }
}

/// Identical content: keep or delete the source. Different content: rename.
fn place_smart(
    source: &Path,
    target: &TargetPath,
    existing: PathBuf,
    settings: &ImportSettings,
) -> PlacementOutcome {
    match files_identical(source, &existing, settings.large_file_threshold) {
        Ok(true) if settings.preserve_originals => PlacementOutcome::new(
            OutcomeKind::Skipped,
            Some(existing),
            "Identical file exists, source preserved",
        ),
        Ok(true) => match fs::remove_file(source) {
            Ok(()) => PlacementOutcome::new(
                OutcomeKind::DuplicateRemoved,
                Some(existing),
                "Identical file exists, source removed",
            ),
            Err(e) => PlacementOutcome::failed(Some(existing), e.to_string()),
        },
        Ok(false) => rename_target(source, target, settings),
        Err(e) => PlacementOutcome::failed(Some(existing), e.to_string()),
    }
}

fn rename_target(source: &Path, target: &TargetPath, settings: &ImportSettings) -> PlacementOutcome {
    match target.next_free(source) {
        Ok(free) if is_same_file(source, &free.path()) => {
            PlacementOutcome::new(OutcomeKind::Skipped, Some(free.path()), "File is already in place")
        }
        Ok(free) => place(source, free.path(), settings, false),
        Err(e) => PlacementOutcome::failed(None, e.to_string()),
    }
}

fn dry_run_outcome(source: &Path, target_path: PathBuf, settings: &ImportSettings) -> PlacementOutcome {
    if !target_path.exists() {
        return PlacementOutcome::new(OutcomeKind::Success, Some(target_path), "Would process normally");
    }
    match files_identical(source, &target_path, settings.large_file_threshold) {
        Ok(true) => PlacementOutcome::new(
            OutcomeKind::Success,
            Some(target_path),
            "Would skip (identical file exists)",
        ),
        Ok(false) => PlacementOutcome::new(
            OutcomeKind::Success,
            Some(target_path),
            "Would process with conflict handling",
        ),
        Err(e) => PlacementOutcome::failed(Some(target_path), e.to_string()),
    }
}

fn place(source: &Path, dest: PathBuf, settings: &ImportSettings, overwrite: bool) -> PlacementOutcome {
    match perform_file_operation(source, &dest, settings.preserve_originals, overwrite) {
        Ok(()) => {
            let action = if settings.preserve_originals { "Copied" } else { "Moved" };
            PlacementOutcome::new(OutcomeKind::Success, Some(dest), action)
        }
        Err(e) => {
            warn!(?source, ?dest, error = %e, "Failed to place file");
            PlacementOutcome::failed(Some(dest), e.to_string())
        }
    }
}

fn perform_file_operation(source: &Path, dest: &Path, copy: bool, overwrite: bool) -> Result<()> {
    let source_mtime = fs::metadata(source)?.modified().ok();

    // Create parent directory
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if copy {
        copy_file(source, dest, overwrite)?;
    } else {
        if !overwrite && dest.exists() {
            return Err(already_exists(dest).into());
        }
        // Try rename first (faster for same filesystem)
        if fs::rename(source, dest).is_err() {
            // Fall back to copy + delete for cross-filesystem moves
            copy_file(source, dest, overwrite)?;
            fs::remove_file(source)?;
        }
    }

    // Preserve modification time
    if let Some(mtime) = source_mtime {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    Ok(())
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("Target already exists: {}", path.display()),
    )
}

/// Copy file with buffered I/O, refusing to clobber unless `overwrite`
fn copy_file(source: &Path, dest: &Path, overwrite: bool) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = if overwrite {
        File::create(dest)?
    } else {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => already_exists(dest),
                _ => e,
            })?
    };

    let result = write_contents(src_file, dest_file);
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result
}

fn write_contents(src_file: File, dest_file: File) -> Result<()> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}
