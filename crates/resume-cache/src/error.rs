//! Cache error types.

use std::path::PathBuf;

/// Errors produced by the resume cache.
///
/// A lookup miss is never an error — it comes back as `None` and means
/// "start from byte zero". These variants cover the persistence and
/// eviction paths, where the caller wants to know which step failed on
/// which path before logging and moving on: a lost record only degrades
/// a future retry, it never corrupts the transfer in flight.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("malformed resume record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write resume record {}: {source}", .path.display())]
    WriteRecord {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan resume cache {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove cache file {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}
