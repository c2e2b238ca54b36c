//! Per-attempt resume orchestration.
//!
//! [`ResumeCoordinator::prepare`] runs once before an upload starts: it
//! looks for a cached record, validates it against the source's current
//! fingerprint, and asks the destination to resume. Whatever it finds,
//! the transfer engine gets back a [`ResumeOption`] — the
//! `{id, pos, set_id}` contract the backend drives during the upload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;
use crate::evict;
use crate::record::ResumeRecord;
use crate::store::ResumeCache;

/// Source-object identity, implemented by the transfer engine's source
/// type.
pub trait SourceIdentity {
    /// Stable content/state identity string for the object. Must stay
    /// the same across process runs while the object is unchanged, and
    /// change when its content or relevant metadata changes.
    fn fingerprint(&self, strict: bool) -> String;
}

/// Destination-side resume capability, implemented per destination kind.
pub trait ResumeBackend {
    /// Asks the destination to pick up the partial upload identified by
    /// `resume_id`. Returns the byte position the destination already
    /// holds. An error, or a position of zero or less, means the upload
    /// cannot be resumed.
    fn resume(
        &self,
        remote: &str,
        resume_id: &str,
        hash_name: &str,
        hash_state: &str,
    ) -> Result<i64, String>;
}

/// Knobs consumed by the coordinator. Owned by the caller's config layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeConfig {
    /// Minimum recovered byte position worth resuming from; a recovered
    /// position must be strictly greater to be used. Negative disables
    /// resume lookups entirely (persistence stays active either way, so
    /// turning the flag on later can still use earlier attempts).
    pub resume_larger: i64,
    /// Records whose encoded form is larger than this are not cached.
    pub max_record_bytes: u64,
    /// Total occupancy the eviction pass trims the cache back under.
    pub max_total_bytes: u64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            resume_larger: -1,
            max_record_bytes: 1024 * 1024,
            max_total_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Orchestrates resume lookup and persistence across upload attempts.
#[derive(Debug, Clone)]
pub struct ResumeCoordinator {
    cache: ResumeCache,
    config: ResumeConfig,
}

impl ResumeCoordinator {
    pub fn new(cache: ResumeCache, config: ResumeConfig) -> Self {
        Self { cache, config }
    }

    /// The cache this coordinator persists into.
    pub fn cache(&self) -> &ResumeCache {
        &self.cache
    }

    /// Prepares one upload attempt of `source` to `remote`.
    ///
    /// Everything that can go wrong on this path — no record, malformed
    /// record, fingerprint mismatch, backend refusal or error, position
    /// under the threshold — falls back to `{id: "", pos: 0}`. A full
    /// restart is always correct, so lookup failures are absorbed here
    /// rather than surfaced to the engine.
    pub fn prepare<'a>(
        &'a self,
        backend: &dyn ResumeBackend,
        backend_name: &str,
        backend_root: &str,
        remote: &str,
        source: &'a dyn SourceIdentity,
    ) -> ResumeOption<'a> {
        let record_path = self.cache.record_path(backend_name, backend_root, remote);
        let mut opt = ResumeOption {
            id: String::new(),
            pos: 0,
            session: ResumeSession {
                cache: &self.cache,
                config: &self.config,
                source,
                record_path,
            },
            swept: false,
        };
        if self.config.resume_larger < 0 {
            return opt;
        }
        let fingerprint = source.fingerprint(true);
        let Some(record) = self.cache.lookup(&opt.session.record_path, &fingerprint) else {
            return opt;
        };
        debug!(
            path = %opt.session.record_path.display(),
            "existing resume cache file found, a resume will now be attempted"
        );
        match backend.resume(remote, &record.id, &record.hash_name, &record.hash_state) {
            Ok(pos) if pos > self.config.resume_larger => {
                debug!(remote, pos, "resuming at byte position");
                opt.id = record.id;
                opt.pos = pos;
            }
            Ok(pos) => {
                debug!(remote, pos, "recovered position too small, restarting from zero");
            }
            Err(err) => {
                debug!(remote, error = %err, "backend resume failed, restarting from zero");
            }
        }
        opt
    }
}

/// Seed and persistence contract for one upload attempt.
///
/// `id`/`pos` seed the backend's resume attempt; [`ResumeOption::set_id`]
/// is the callback the backend invokes whenever it reports new resumable
/// state. The one-shot eviction flag lives here, so its lifetime is
/// exactly one attempt.
pub struct ResumeOption<'a> {
    /// Resume token recovered from the cache (empty when starting fresh).
    pub id: String,
    /// Byte position to continue from (0 when starting fresh).
    pub pos: i64,
    session: ResumeSession<'a>,
    swept: bool,
}

struct ResumeSession<'a> {
    cache: &'a ResumeCache,
    config: &'a ResumeConfig,
    source: &'a dyn SourceIdentity,
    record_path: PathBuf,
}

impl ResumeOption<'_> {
    /// Records `(id, hash_name, hash_state)` so a future attempt can
    /// resume this upload. Invocable zero or more times per attempt.
    ///
    /// The source fingerprint is recomputed on every call — the record
    /// must describe the source as it is now, not as it was when the
    /// attempt was prepared. The first call also runs one eviction pass
    /// over the whole cache; repeats on the same attempt do not.
    ///
    /// Errors carry the failing step and path so the engine can log
    /// them; they should not abort the transfer, since a lost record
    /// only forfeits resumability for a future retry.
    pub fn set_id(
        &mut self,
        id: &str,
        hash_name: &str,
        hash_state: &str,
    ) -> Result<(), CacheError> {
        let s = &self.session;
        let record = ResumeRecord {
            fingerprint: s.source.fingerprint(true),
            id: id.to_string(),
            hash_name: hash_name.to_string(),
            hash_state: hash_state.to_string(),
        };
        s.cache.put(&s.record_path, &record, s.config.max_record_bytes)?;
        if !self.swept {
            self.swept = true;
            evict::enforce_budget(s.cache.root(), s.config.max_total_bytes)?;
        }
        Ok(())
    }

    /// Where this attempt's record lives on disk.
    pub fn record_path(&self) -> &std::path::Path {
        &self.session.record_path
    }
}
