//! Filesystem housekeeping shared by remedy steps and the daily tasks.

use crate::RemedyError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Delete regular files under `dir` older than `retention_days`.
/// Returns how many were removed. A missing directory removes nothing.
pub fn cleanup_old_files(dir: &Path, retention_days: u32) -> Result<usize, RemedyError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 86_400);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file without mtime");
                continue;
            }
        };
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed stale file");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove"),
            }
        }
    }
    Ok(removed)
}

/// Copy each existing source file into `backup_dir` with a timestamp
/// suffix. Missing sources are skipped, not errors. Returns the number
/// of files backed up.
pub fn backup_files(sources: &[PathBuf], backup_dir: &Path) -> Result<usize, RemedyError> {
    std::fs::create_dir_all(backup_dir)?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let mut copied = 0;

    for source in sources {
        if !source.is_file() {
            debug!(path = %source.display(), "Backup source missing, skipping");
            continue;
        }
        let name = source
            .file_name()
            .map_or_else(|| "backup".into(), |n| n.to_string_lossy().into_owned());
        let dest = backup_dir.join(format!("{name}.{stamp}"));
        std::fs::copy(source, &dest)?;
        debug!(from = %source.display(), to = %dest.display(), "Backed up file");
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let removed = cleanup_old_files(&dir.path().join("absent"), 7).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.log"), "x").unwrap();
        let removed = cleanup_old_files(dir.path(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("fresh.log").exists());
    }

    #[test]
    fn test_backup_copies_existing_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.db");
        std::fs::write(&src, "payload").unwrap();
        let backup_dir = dir.path().join("backups");

        let sources = vec![src.clone(), dir.path().join("absent.db")];
        let copied = backup_files(&sources, &backup_dir).unwrap();
        assert_eq!(copied, 1);
        assert_eq!(std::fs::read_dir(&backup_dir).unwrap().count(), 1);
    }
}
