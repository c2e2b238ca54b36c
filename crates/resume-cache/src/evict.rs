//! Cache-wide size budget enforcement.
//!
//! The cache bounds its own disk usage without a maintenance process:
//! after each attempt's first progress report, one pass scans the whole
//! tree and deletes the oldest records until total occupancy is back
//! under budget. A full scan is fine here — the tree is small by
//! construction and the pass runs once per upload attempt, not per chunk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::CacheError;

struct CacheEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Deletes the least-recently-written records under `root` until the
/// total occupied bytes drop below `max_total_bytes`.
///
/// Two phases: first collect every file, then sort and trim, so the
/// outcome does not depend on directory iteration order. Ties in
/// modification time break on path, keeping the order deterministic
/// within a pass. Empty subdirectories found while scanning are pruned
/// opportunistically; a missing root is a no-op.
///
/// A failed deletion stops the pass and is surfaced with its path;
/// deletions already made stand, and the next pass picks up the rest.
pub fn enforce_budget(root: &Path, max_total_bytes: u64) -> Result<(), CacheError> {
    if !root.exists() {
        return Ok(());
    }
    let mut entries = Vec::new();
    collect(root, root, &mut entries)?;

    let mut total: u64 = entries.iter().map(|e| e.size).sum();
    if total <= max_total_bytes {
        return Ok(());
    }

    entries.sort_by(|a, b| (a.modified, &a.path).cmp(&(b.modified, &b.path)));
    for entry in &entries {
        if total < max_total_bytes {
            break;
        }
        fs::remove_file(&entry.path).map_err(|source| CacheError::Remove {
            path: entry.path.clone(),
            source,
        })?;
        total -= entry.size;
        debug!(
            path = %entry.path.display(),
            size = entry.size,
            remaining = total,
            "evicted oldest resume cache file"
        );
    }
    Ok(())
}

/// Recursively collects `(path, size, mtime)` for every file under `dir`.
///
/// Directories that turn out to have no children are removed on the way,
/// except the cache root itself. A directory emptied by this very pass
/// is picked up by the next one.
fn collect(root: &Path, dir: &Path, entries: &mut Vec<CacheEntry>) -> Result<(), CacheError> {
    let scan_err = |source| CacheError::Scan {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = 0usize;
    for item in fs::read_dir(dir).map_err(scan_err)? {
        let item = item.map_err(scan_err)?;
        children += 1;
        let path = item.path();
        let meta = item.metadata().map_err(|source| CacheError::Scan {
            path: path.clone(),
            source,
        })?;
        if meta.is_dir() {
            collect(root, &path, entries)?;
        } else {
            let modified = meta.modified().map_err(|source| CacheError::Scan {
                path: path.clone(),
                source,
            })?;
            entries.push(CacheEntry {
                path,
                size: meta.len(),
                modified,
            });
        }
    }
    if children == 0 && dir != root {
        let _ = fs::remove_dir(dir);
    }
    Ok(())
}
