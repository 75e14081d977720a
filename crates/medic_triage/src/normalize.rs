//! Error-message normalization and fingerprinting.
//!
//! Two reports of the same underlying fault must land on the same
//! fingerprint even when timestamps, PIDs, ports, paths, or addresses
//! differ. Normalization strips all of those before hashing.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static VOLATILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Timestamps like "2026-08-30 12:34:56.789"
        r"\d{4}-\d{2}-\d{2}[\s\d:.-]*",
        r"pid\s*\d+",
        r"port\s*\d+",
        // Script paths leak working directories into messages
        r"/[a-zA-Z0-9_./-]*\.(py|rs|log|db)",
        r"line\s*\d+",
        // IP addresses
        r"\d+\.\d+\.\d+\.\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Lowercase, strip volatile substrings, collapse whitespace.
pub fn normalize_message(raw: &str) -> String {
    let mut normalized = raw.to_lowercase();
    for pattern in VOLATILE_PATTERNS.iter() {
        normalized = pattern.replace_all(&normalized, "").into_owned();
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Signature string: upper-cased kind, normalized message, component and
/// operation, pipe-joined with empty parts skipped.
pub fn signature(kind: &str, raw_message: &str, component: &str, operation: &str) -> String {
    let normalized = normalize_message(raw_message);
    [kind.to_uppercase(), normalized, component.to_string(), operation.to_string()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

/// Hex SHA-256 of the signature.
pub fn fingerprint(sig: &str) -> String {
    let digest = Sha256::digest(sig.as_bytes());
    format!("{digest:x}")
}
