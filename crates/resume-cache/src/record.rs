//! Resume record wire format.
//!
//! A record is a small JSON document with four string fields. The short
//! key names are part of the on-disk format: changing them orphans every
//! record already cached on users' machines.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// The persisted state of one interrupted upload.
///
/// `id` and `hash_state` are opaque: they are issued by the destination
/// and the transfer engine's hasher respectively, and pass through this
/// crate unexamined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    /// Identity of the source object at the time the record was written.
    #[serde(rename = "fprint")]
    pub fingerprint: String,
    /// Resume token issued by the destination.
    #[serde(rename = "id")]
    pub id: String,
    /// Name of the hash whose partial state is carried (may be empty).
    #[serde(rename = "hname")]
    pub hash_name: String,
    /// Serialized partial-hash state (may be empty).
    #[serde(rename = "hstate")]
    pub hash_state: String,
}

/// Serializes a record to its on-disk byte payload.
pub fn encode(record: &ResumeRecord) -> Result<Vec<u8>, CacheError> {
    Ok(serde_json::to_vec(record)?)
}

/// Deserializes a record from its on-disk byte payload.
///
/// Truncated or structurally invalid payloads return
/// [`CacheError::MalformedRecord`]; callers treat that the same as a
/// missing record.
pub fn decode(data: &[u8]) -> Result<ResumeRecord, CacheError> {
    Ok(serde_json::from_slice(data)?)
}
