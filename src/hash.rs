//! Content comparison for duplicate detection
//!
//! Small files are compared byte for byte. Files at or above the large-file
//! threshold are streamed once through SHA-256 and their digests compared.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;

/// Read buffer used when streaming large files
const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// Check whether two files have identical content
///
/// A missing file is never identical to anything, and files of different
/// sizes are never read.
pub fn files_identical(a: &Path, b: &Path, large_file_threshold: u64) -> Result<bool> {
    let (Some(meta_a), Some(meta_b)) = (file_metadata(a)?, file_metadata(b)?) else {
        return Ok(false);
    };

    if meta_a.len() != meta_b.len() {
        trace!(?a, ?b, "Sizes differ");
        return Ok(false);
    }

    let identical = if meta_a.len() < large_file_threshold {
        fs::read(a)? == fs::read(b)?
    } else {
        compute_file_digest(a)? == compute_file_digest(b)?
    };

    trace!(?a, ?b, identical, "Compared file contents");
    Ok(identical)
}

/// Metadata of a regular file, `None` when it does not exist
fn file_metadata(path: &Path) -> Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(Some(meta)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compute the SHA-256 digest of a file, reading it in one pass
pub fn compute_file_digest(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; STREAM_BUFFER_SIZE];

    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| Error::HashComputation {
                path: path.to_path_buf(),
                message: format!("Failed to read file: {}", e),
            })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let digest: [u8; 32] = hasher.finalize().into();
    trace!(?path, digest = %hex::encode(digest), "Computed file digest");
    Ok(digest)
}
