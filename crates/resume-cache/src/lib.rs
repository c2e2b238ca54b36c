//! Disk-backed resume-token cache for interrupted uploads.
//!
//! When an upload dies partway through, the destination may hand back an
//! opaque resume token describing the bytes it already holds. This crate
//! stores those tokens on disk, keyed by (destination name, destination
//! root, remote path), so a later attempt at the same upload can continue
//! appending instead of re-sending everything.
//!
//! The cache is small and self-bounding: records over a per-record cap
//! are never written, the whole tree is trimmed back under a byte budget
//! after each attempt's first progress report, and a record is only used
//! while the source's fingerprint still matches the one stored with it.
//! A miss anywhere — including malformed records and backend failures —
//! just means "start from byte zero": resuming is an optimization, never
//! a requirement.
//!
//! The transfer engine plugs in through two traits ([`SourceIdentity`],
//! [`ResumeBackend`]) and drives one [`ResumeOption`] per attempt.

mod error;
mod evict;
mod paths;
mod record;
mod session;
mod store;

pub use error::CacheError;
pub use evict::enforce_budget;
pub use record::{ResumeRecord, decode, encode};
pub use session::{
    ResumeBackend, ResumeConfig, ResumeCoordinator, ResumeOption, SourceIdentity,
};
pub use store::ResumeCache;
