//! Disk-backed store for resume records.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CacheError;
use crate::paths;
use crate::record::{self, ResumeRecord};

/// A resume-token cache rooted at one directory.
///
/// Holds no open handles and no in-memory state: every operation opens,
/// uses and closes its own files, so instances are cheap to clone and
/// safe to keep around for the life of the process.
#[derive(Debug, Clone)]
pub struct ResumeCache {
    root: PathBuf,
}

impl ResumeCache {
    /// Creates a cache rooted at `root`. The directory is created lazily
    /// on the first write, never here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of the record for one (destination name,
    /// destination root, remote path) key.
    pub fn record_path(&self, backend_name: &str, backend_root: &str, remote: &str) -> PathBuf {
        paths::record_path(&self.root, backend_name, backend_root, remote)
    }

    /// Reads the record at `path` and validates it against the source's
    /// current fingerprint.
    ///
    /// Every miss reason — no file, unreadable file, malformed payload,
    /// empty stored fingerprint, fingerprint mismatch — comes back as
    /// `None`. A miss is the expected outcome for a first-time upload or
    /// a source that changed since the record was written; it just means
    /// "start from byte zero".
    pub fn lookup(&self, path: &Path, current_fingerprint: &str) -> Option<ResumeRecord> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %err, "failed to read resume cache file");
                }
                return None;
            }
        };
        let record = match record::decode(&data) {
            Ok(record) => record,
            Err(err) => {
                debug!(
                    path = %path.display(),
                    error = %err,
                    "failed to decode resume record, resume will not be attempted"
                );
                return None;
            }
        };
        if record.fingerprint.is_empty() || record.fingerprint != current_fingerprint {
            debug!(
                path = %path.display(),
                "source changed since the record was written, resume will not be attempted"
            );
            return None;
        }
        Some(record)
    }

    /// Writes `record` at `path`, fully replacing any previous record for
    /// that key.
    ///
    /// Missing parent directories are created first, even when the write
    /// itself ends up skipped. If the encoded record is larger than
    /// `max_record_bytes` nothing is written and `Ok(false)` is returned:
    /// an oversized state is not worth the disk, and truncating it would
    /// hand a future attempt a corrupt token.
    pub fn put(
        &self,
        path: &Path,
        record: &ResumeRecord,
        max_record_bytes: u64,
    ) -> Result<bool, CacheError> {
        let data = record::encode(record)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if data.len() as u64 > max_record_bytes {
            debug!(
                path = %path.display(),
                size = data.len(),
                "resume record exceeds the per-record cap, not cached"
            );
            return Ok(false);
        }
        fs::write(path, &data).map_err(|source| CacheError::WriteRecord {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}
