//! File permission probe for secret and data files.
//!
//! Reports how far beyond its owner a file is visible; deciding whether
//! that is a security problem is the monitor's job.

use serde::Serialize;
use std::path::Path;

/// Any group/other access counts as exposure. For secrets.
pub const DENY_ANY_ACCESS: u32 = 0o077;

/// Group/other writes count as exposure. For data files.
pub const DENY_WRITE: u32 = 0o022;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileExposure {
    /// No permission bit in the deny mask is set.
    Private,
    /// At least one denied bit is set; `mode` is the full 0o777 mode.
    Exposed { mode: u32 },
    Missing,
}

/// Check `path` against `deny_mask` (one of the `DENY_*` constants).
///
/// On platforms without Unix permission bits every existing file reads
/// as `Private`.
pub fn file_exposure(path: &Path, deny_mask: u32) -> FileExposure {
    let Ok(meta) = std::fs::metadata(path) else {
        return FileExposure::Missing;
    };
    let mode = unix_mode(&meta);
    if mode & deny_mask == 0 {
        FileExposure::Private
    } else {
        FileExposure::Exposed { mode }
    }
}

#[cfg(unix)]
fn unix_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o777
}

#[cfg(not(unix))]
fn unix_mode(_meta: &std::fs::Metadata) -> u32 {
    0
}
