//! Size-based rotation of the append-only sync log.
//!
//! `sync.log` → `sync.log.1` → … → `sync.log.5`; the oldest copy is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use calconduit_core::paths;

/// Rotate once the live log reaches 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate `log_path` if it is at least `max_bytes` long.
///
/// Returns `Ok(false)` when the file is missing or under the threshold.
/// After a rotation the live path exists and is empty, so appenders that
/// reopen per record keep working.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || max_files == 0 {
        return Ok(false);
    }

    let oldest = numbered_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let from = numbered_path(log_path, n);
        if from.exists() {
            fs::rename(&from, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    fs::File::create(log_path)?;
    Ok(true)
}

/// Rotate `<home>/.calconduit/logs/sync.log`. Failures are logged, never returned.
pub fn rotate_sync_log(home: &Path) {
    let log_path = paths::sync_log_path(home);
    match rotate_if_needed(&log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!(path = %log_path.display(), "sync log rotated"),
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(path = %log_path.display(), error = %err, "sync log rotation failed")
        }
    }
}

fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(paths::SYNC_LOG);
    base.with_file_name(format!("{name}.{n}"))
}
