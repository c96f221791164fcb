//! Import orchestration
//!
//! Handles the core logic of:
//! - Enumerating candidate files in the source directory
//! - Resolving each file's creation time
//! - Placing files into the organized tree
//! - Reporting progress and honoring cancellation
//! - Previewing target locations in parallel without touching anything

use crate::candidate::ImportCandidate;
use crate::config::ImportSettings;
use crate::conflict::{OutcomeKind, place_file};
use crate::error::{Error, Result};
use crate::target::build_target_path;
use crate::time::DateSource;
use crate::time::metadata::{ExifDecoder, MetadataDecoder};
use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Progress of a run or preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    /// 1-based index of the item being reported
    pub current: usize,
    pub total: usize,
    pub file_name: String,
}

impl ImportProgress {
    /// Completion in percent (0 when there is nothing to do)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 * 100.0 / self.total as f64
        }
    }
}

/// Receives progress reports; must not block
pub type ProgressCallback<'a> = dyn Fn(&ImportProgress) + Send + Sync + 'a;

/// Shared flag to stop a run between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of processing a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Source file path
    pub source: PathBuf,
    pub kind: OutcomeKind,
    /// Where the file went, or where it conflicted
    pub destination: Option<PathBuf>,
    pub message: Option<String>,
    /// Resolved creation time
    pub date: Option<NaiveDateTime>,
    pub date_source: Option<DateSource>,
}

impl FileOutcome {
    fn failed(source: PathBuf, message: impl Into<String>) -> Self {
        Self {
            source,
            kind: OutcomeKind::Failed,
            destination: None,
            message: Some(message.into()),
            date: None,
            date_source: None,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Totals and per-file outcomes of one run
#[derive(Debug, Clone, Serialize)]
pub struct ImportRunResult {
    pub status: RunStatus,
    /// Files found by the counting pass
    pub total_files: usize,
    /// Successful placements and removed duplicates
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duplicates_removed: usize,
    pub outcomes: Vec<FileOutcome>,
    pub elapsed: Duration,
}

impl ImportRunResult {
    fn new(total_files: usize) -> Self {
        Self {
            status: RunStatus::Completed,
            total_files,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            duplicates_removed: 0,
            outcomes: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome.kind {
            OutcomeKind::Success => self.succeeded += 1,
            OutcomeKind::DuplicateRemoved => {
                self.succeeded += 1;
                self.duplicates_removed += 1;
            }
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Files that were actually looked at
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Succeeded: {}, Skipped: {}, Duplicates removed: {}, Failed: {}",
            self.total_files, self.succeeded, self.skipped, self.duplicates_removed, self.failed
        )
    }

    /// Pretty-printed JSON report
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`
    pub fn save_report(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Planned location of one file, computed without touching anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTarget {
    pub date: NaiveDateTime,
    pub date_source: DateSource,
    pub target: PathBuf,
}

/// Preview entry for one selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPreview {
    pub source: PathBuf,
    pub planned: std::result::Result<PlannedTarget, String>,
}

/// Lazily enumerated supported files, sorted by name within each directory
pub struct CandidateFiles<'a> {
    walker: walkdir::IntoIter,
    settings: &'a ImportSettings,
}

impl Iterator for CandidateFiles<'_> {
    type Item = Result<ImportCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Some(Err(e.into())),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if entry.file_type().is_file() && self.settings.is_supported_path(entry.path()) {
                return Some(Ok(ImportCandidate::new(entry.into_path())));
            }
        }
    }
}

/// Runs imports for one set of settings
pub struct Importer {
    settings: ImportSettings,
    decoder: Arc<dyn MetadataDecoder>,
}

impl Importer {
    /// Create an importer reading metadata with the EXIF decoder
    pub fn new(settings: ImportSettings) -> Result<Self> {
        Self::with_decoder(settings, Arc::new(ExifDecoder))
    }

    /// Create an importer with a custom metadata decoder
    pub fn with_decoder(settings: ImportSettings, decoder: Arc<dyn MetadataDecoder>) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, decoder })
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Enumerate supported files under the source directory
    ///
    /// Errors below the root are logged and skipped; an unreadable root is
    /// yielded as an error.
    pub fn candidates(&self) -> Result<CandidateFiles<'_>> {
        if !self.settings.source_dir.is_dir() {
            return Err(Error::SourceNotFound {
                path: self.settings.source_dir.clone(),
            });
        }

        let max_depth = if self.settings.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.settings.source_dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();

        Ok(CandidateFiles {
            walker,
            settings: &self.settings,
        })
    }

    /// Count the files a run would visit
    pub fn count_candidates(&self) -> Result<usize> {
        let mut count = 0;
        for candidate in self.candidates()? {
            candidate?;
            count += 1;
        }
        Ok(count)
    }

    /// Import every candidate file
    ///
    /// The candidate list is taken in full before the first file moves, so
    /// files placed inside the source tree are not visited again. Files are
    /// then processed one at a time in enumeration order. Cancellation is
    /// checked before each file; files already handled stay handled.
    pub fn run(
        &self,
        progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ImportRunResult> {
        let _span = span!(Level::INFO, "import_run", source = ?self.settings.source_dir).entered();
        let started = Instant::now();

        info!("Scanning source directory...");
        let candidates = self.candidates()?.collect::<Result<Vec<_>>>()?;
        let total = candidates.len();
        info!(count = total, dry_run = self.settings.dry_run, "Found media files");

        let mut result = ImportRunResult::new(total);

        for (index, candidate) in candidates.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(processed = result.processed(), "Import cancelled");
                result.status = RunStatus::Cancelled;
                break;
            }

            if let Some(report) = progress {
                report(&ImportProgress {
                    current: index + 1,
                    total,
                    file_name: candidate.file_name().to_string(),
                });
            }

            let outcome = self.process_candidate(candidate);
            result.record(outcome);
        }

        result.elapsed = started.elapsed();
        info!(elapsed = ?result.elapsed, "{}", result.summary());
        Ok(result)
    }

    /// Resolve the date of one file and place it
    pub fn process_candidate(&self, mut candidate: ImportCandidate) -> FileOutcome {
        let source = candidate.path().to_path_buf();
        let _file_span = span!(Level::DEBUG, "process_file", ?source).entered();

        let now = Local::now().naive_local();
        let resolved = match candidate.resolve_date(self.decoder.as_ref(), &self.settings, now) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(?source, error = %e, "Failed to read file");
                return FileOutcome::failed(source, e.to_string());
            }
        };

        let Some(observation) = resolved else {
            warn!(?source, "Could not determine date");
            return FileOutcome::failed(source, "Could not determine date");
        };

        let placement = place_file(&source, &observation.timestamp, &self.settings);
        match placement.kind {
            OutcomeKind::Failed => warn!(?source, message = ?placement.message, "Import failed"),
            OutcomeKind::Skipped => {
                debug!(?source, target = ?placement.target, message = ?placement.message, "Skipped file")
            }
            kind => info!(?source, target = ?placement.target, ?kind, "Imported file"),
        }

        FileOutcome {
            source,
            kind: placement.kind,
            destination: placement.target,
            message: placement.message,
            date: Some(observation.timestamp),
            date_source: Some(observation.source),
        }
    }

    /// Compute target locations for a selection of files in parallel
    ///
    /// Nothing is created, moved or deleted. Files still queued when the
    /// token is cancelled are reported as cancelled.
    pub fn preview(
        &self,
        files: &[PathBuf],
        progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TargetPreview>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.parallelism())
            .build()
            .map_err(|e| Error::Config(format!("Failed to start preview workers: {}", e)))?;

        let total = files.len();
        let interval = if total > 1000 { 50 } else { 10 };
        let completed = Mutex::new(0usize);
        let now = Local::now().naive_local();

        info!(total, threads = self.settings.parallelism(), "Previewing targets");

        let previews: Vec<TargetPreview> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let planned = if cancel.is_cancelled() {
                        Err("Cancelled".to_string())
                    } else {
                        self.plan(path, now)
                    };

                    if let Ok(mut done) = completed.lock() {
                        *done += 1;
                        if let Some(report) = progress
                            && (*done % interval == 0 || *done == total)
                        {
                            report(&ImportProgress {
                                current: *done,
                                total,
                                file_name: file_name_of(path),
                            });
                        }
                    }

                    TargetPreview {
                        source: path.clone(),
                        planned,
                    }
                })
                .collect()
        });

        Ok(previews)
    }

    fn plan(&self, path: &Path, now: NaiveDateTime) -> std::result::Result<PlannedTarget, String> {
        if !path.is_file() {
            return Err("File not found".to_string());
        }

        let mut candidate = ImportCandidate::new(path);
        let observation = candidate
            .resolve_date(self.decoder.as_ref(), &self.settings, now)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "Could not determine date".to_string())?;

        let target = build_target_path(path, &observation.timestamp, &self.settings)
            .map_err(|e| e.to_string())?;

        Ok(PlannedTarget {
            date: observation.timestamp,
            date_source: observation.source,
            target: target.path(),
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
