use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

#[derive(Debug, Default)]
pub struct SweepResult {
    pub removed: Vec<PathBuf>,
    pub failures: usize,
}

/// Delete archives in `dir` last modified more than `retention` before `now`.
///
/// `keep` is never removed. Files that cannot be inspected or removed are
/// logged and counted; only failing to read the directory itself is an error.
pub fn sweep(dir: &Path, retention: Duration, now: SystemTime, keep: &Path) -> Result<SweepResult> {
    let mut result = SweepResult::default();
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                result.failures += 1;
                continue;
            }
        };
        let path = entry.path();

        let is_archive = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(ARCHIVE_SUFFIX))
            .unwrap_or(false);
        if !is_archive || path == keep {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(t)) => t,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat archive");
                result.failures += 1;
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed expired archive");
                result.removed.push(path);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired archive");
                result.failures += 1;
            }
        }
    }

    Ok(result)
}
