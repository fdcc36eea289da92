//! Weak entity tags for static files.

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

use axum::http::{header, HeaderMap};

/// Weak tag over file length and mtime, `W/"<len hex>-<mtime-ms hex>"`.
/// Cheap to compute from a stat and stable across identical deploys.
pub fn weak_etag(meta: &Metadata) -> String {
    let len = meta.len();
    let mtime_ms = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("W/\"{len:x}-{mtime_ms:x}\"")
}

/// Weak `If-None-Match` comparison: a `*` or any listed tag equal to `etag`
/// modulo the weakness prefix is a match.
pub fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    let current = strip_weak(etag);
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|candidate| candidate == "*" || strip_weak(candidate) == current)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
