//! Target path computation from a naming pattern

use crate::config::{DuplicateHandling, ImportSettings};
use crate::error::{Error, Result};
use crate::time::layout::DateLayout;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Highest numeric suffix tried before giving up
pub const MAX_NAME_SUFFIX: u32 = 9999;

/// Where a file should land: directory, dated base name, original extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    pub directory: PathBuf,
    pub base_name: String,
    /// Original extension including the dot, or empty
    pub extension: String,
    /// Collision suffix (`name (2).jpg`), if any
    pub suffix: Option<u32>,
}

impl TargetPath {
    /// Lay out `date` according to the settings' naming pattern
    ///
    /// Every pattern level except the last becomes a directory under the
    /// destination root; the last becomes the file's base name.
    pub fn from_pattern(source: &Path, date: &NaiveDateTime, settings: &ImportSettings) -> Self {
        let mut levels: Vec<&str> = settings.naming_pattern.split('/').collect();
        let file_layout = levels.pop().unwrap_or_default();

        let mut directory = settings.destination_root().to_path_buf();
        for level in levels {
            directory.push(DateLayout::parse(level).format(date));
        }

        let extension = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            directory,
            base_name: DateLayout::parse(file_layout).format(date),
            extension,
            suffix: None,
        }
    }

    /// Full path of this target
    pub fn path(&self) -> PathBuf {
        let file_name = match self.suffix {
            Some(n) => format!("{} ({}){}", self.base_name, n, self.extension),
            None => format!("{}{}", self.base_name, self.extension),
        };
        self.directory.join(file_name)
    }

    /// Same target with a collision suffix
    pub fn with_suffix(&self, n: u32) -> Self {
        Self {
            suffix: Some(n),
            ..self.clone()
        }
    }

    /// First variant not occupied by another file: the plain name, then
    /// ` (2)`, ` (3)`, ...
    ///
    /// A variant that already is `source` counts as free.
    pub fn next_free(&self, source: &Path) -> Result<Self> {
        let plain = self.with_unsuffixed();
        if is_free_for(&plain.path(), source) {
            return Ok(plain);
        }

        for n in 2..=MAX_NAME_SUFFIX {
            let candidate = self.with_suffix(n);
            if is_free_for(&candidate.path(), source) {
                trace!(path = ?candidate.path(), "Found free target name");
                return Ok(candidate);
            }
        }

        Err(Error::NoFreeTargetName { path: plain.path() })
    }

    fn with_unsuffixed(&self) -> Self {
        Self {
            suffix: None,
            ..self.clone()
        }
    }
}

fn is_free_for(path: &Path, source: &Path) -> bool {
    !path.exists() || is_same_file(path, source)
}

/// True when both paths name the same existing file
pub(crate) fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compute where `source` goes for `date`
///
/// Under the rename policy the result already skips occupied names. The file
/// system is only read, never modified.
pub fn build_target_path(
    source: &Path,
    date: &NaiveDateTime,
    settings: &ImportSettings,
) -> Result<TargetPath> {
    let target = TargetPath::from_pattern(source, date, settings);
    match settings.duplicate_handling {
        DuplicateHandling::Rename => target.next_free(source),
        _ => Ok(target),
    }
}
