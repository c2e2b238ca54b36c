//! Maps a cache key to one on-disk location.
//!
//! A record is addressed by the triple (destination name, destination
//! root, remote path). Each part becomes exactly one path component under
//! the cache root, so the tree is one directory per destination, one per
//! destination root, one file per remote.

use std::path::{Path, PathBuf};

/// Returns the on-disk path of the record for one cache key.
///
/// Pure and deterministic: the same triple always maps to the same path,
/// and distinct triples never map to the same path.
pub fn record_path(root: &Path, backend_name: &str, backend_root: &str, remote: &str) -> PathBuf {
    root.join(escape_component(backend_name))
        .join(escape_component(backend_root))
        .join(escape_component(remote))
}

/// Escapes an arbitrary string into exactly one safe path component.
///
/// Bytes in `[A-Za-z0-9._-]` pass through; everything else (separators,
/// `%`, control bytes) becomes `%XX`. Because `%` itself is always
/// escaped the mapping is injective, so remotes like `a/b` and `a%2Fb`
/// cannot collide. The inputs `""`, `"."` and `".."` get no pass-through
/// bytes at all, so no component can vanish or traverse upward.
fn escape_component(s: &str) -> String {
    if s.is_empty() {
        // A lone "%" is never produced for any non-empty input.
        return "%".to_string();
    }
    let escape_all = s == "." || s == "..";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        let plain = b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-');
        if plain && !escape_all {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
