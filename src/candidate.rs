//! A media file considered for import, with its cached date observations

use crate::config::ImportSettings;
use crate::time::arbitrate::{DateFilter, arbitrate};
use crate::time::filename::{default_fields, parse_filename_dates};
use crate::time::metadata::{MetadataDecoder, observations_from_tags};
use crate::time::{DateObservation, DateSource};
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A value remembered together with the file modification time it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    pub cached_at_mtime: SystemTime,
}

impl<T> Cached<T> {
    pub fn new(value: T, cached_at_mtime: SystemTime) -> Self {
        Self {
            value,
            cached_at_mtime,
        }
    }

    /// True when the file has been modified after the value was cached
    pub fn needs_refresh(&self, current_mtime: SystemTime) -> bool {
        current_mtime > self.cached_at_mtime
    }
}

/// File system timestamps in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    /// Not every platform or file system reports a creation time
    pub created: Option<NaiveDateTime>,
    pub modified: NaiveDateTime,
}

/// Convert a file system time to local wall-clock time
pub fn local_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[derive(Debug, Clone)]
pub struct ImportCandidate {
    path: PathBuf,
    file_name: String,
    times: Option<Cached<FileTimes>>,
    metadata: Option<Cached<Vec<DateObservation>>>,
}

impl ImportCandidate {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            times: None,
            metadata: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn current_mtime(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    /// File system creation and modification times
    pub fn file_times(&mut self) -> io::Result<FileTimes> {
        let meta = fs::metadata(&self.path)?;
        let mtime = meta.modified()?;

        if let Some(cached) = &self.times
            && !cached.needs_refresh(mtime)
        {
            return Ok(cached.value);
        }

        let times = FileTimes {
            created: meta.created().ok().map(local_time),
            modified: local_time(mtime),
        };
        self.times = Some(Cached::new(times, mtime));
        Ok(times)
    }

    /// Timestamps from embedded metadata
    ///
    /// The decoder runs at most once until the file changes. Decode errors
    /// mean "no metadata" and are only logged.
    pub fn metadata_observations(
        &mut self,
        decoder: &dyn MetadataDecoder,
    ) -> io::Result<&[DateObservation]> {
        let mtime = self.current_mtime()?;
        let stale = self
            .metadata
            .as_ref()
            .is_none_or(|cached| cached.needs_refresh(mtime));

        if stale {
            let observations = match decoder.decode(&self.path) {
                Ok(groups) => observations_from_tags(&groups),
                Err(e) => {
                    debug!(path = ?self.path, error = %e, "No usable metadata");
                    Vec::new()
                }
            };
            self.metadata = Some(Cached::new(observations, mtime));
        }

        Ok(self
            .metadata
            .as_ref()
            .map(|cached| cached.value.as_slice())
            .unwrap_or_default())
    }

    /// Every timestamp observed for this file
    ///
    /// Order: file created, file modified, EXIF DateTime, EXIF
    /// DateTimeOriginal, GPS, then filename matches.
    pub fn observations(
        &mut self,
        decoder: &dyn MetadataDecoder,
        settings: &ImportSettings,
    ) -> io::Result<Vec<DateObservation>> {
        let times = self.file_times()?;
        let mut observations = Vec::new();

        if let Some(created) = times.created {
            observations.push(DateObservation::new(DateSource::FileCreated, created));
        }
        observations.push(DateObservation::new(DateSource::FileModified, times.modified));
        observations.extend_from_slice(self.metadata_observations(decoder)?);

        let defaults = default_fields(times.created, times.modified, settings.minimum_valid_date);
        observations.extend(
            parse_filename_dates(&self.file_name, defaults)
                .map(|ts| DateObservation::new(DateSource::Filename, ts)),
        );

        Ok(observations)
    }

    /// The most trustworthy creation time for this file, if any qualifies
    pub fn resolve_date(
        &mut self,
        decoder: &dyn MetadataDecoder,
        settings: &ImportSettings,
        now: NaiveDateTime,
    ) -> io::Result<Option<DateObservation>> {
        let observations = self.observations(decoder, settings)?;
        Ok(arbitrate(observations, now, &DateFilter::from_settings(settings)))
    }
}
