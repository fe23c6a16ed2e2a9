//! Garbage collection of abandoned body files.
//!
//! Body files are never deleted during a build: a reader may still hold a
//! reference to a body from the previous generation. Once no generation in the
//! index references a file, it can be removed.
//!
//! Temporary files left by interrupted writes are only removed once they are
//! older than a grace period, so a write still in flight is left alone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::index::{self, INDEX_TEMP_PREFIX};
use crate::store::{BODY_EXT, TEMP_PREFIX};

/// Age after which a temporary file is considered abandoned.
pub const TEMP_GRACE: Duration = Duration::from_secs(15 * 60);

/// Outcome of a garbage collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Body files still referenced by `current` or `previous`.
    pub kept: usize,
    /// Unreferenced body files that were deleted.
    pub removed: usize,
    /// Leftover temporary files that were deleted.
    pub temp_removed: usize,
}

/// Removes body files referenced by neither persisted generation.
///
/// Uses [`TEMP_GRACE`] for temporary files.
pub fn collect_garbage(config: &CacheConfig) -> Result<GcReport, CacheError> {
    collect_garbage_with_grace(config, TEMP_GRACE)
}

/// Like [`collect_garbage`], removing temporary files older than `grace`.
///
/// Unreferenced body files are removed regardless of age, including bodies of
/// a build that has not saved yet. Must not run concurrently with a build.
pub fn collect_garbage_with_grace(
    config: &CacheConfig,
    grace: Duration,
) -> Result<GcReport, CacheError> {
    let generations = index::load(config)?;
    let live: HashSet<String> = generations
        .current
        .values()
        .chain(generations.previous.values())
        .filter_map(|entry| entry.file.as_deref())
        .filter_map(|file| file.rsplit('/').next())
        .map(str::to_string)
        .collect();

    let mut report = GcReport::default();

    for (name, path) in list_dir(&config.dir)? {
        if name.starts_with(INDEX_TEMP_PREFIX) && remove_if_stale(&path, grace)? {
            report.temp_removed += 1;
        }
    }

    for (name, path) in list_dir(&config.bodies_dir())? {
        if name.starts_with(TEMP_PREFIX) {
            if remove_if_stale(&path, grace)? {
                report.temp_removed += 1;
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some(BODY_EXT) {
            if live.contains(&name) {
                report.kept += 1;
            } else {
                std::fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
                tracing::debug!(file = %name, "removed unreferenced body");
                report.removed += 1;
            }
        }
    }

    tracing::info!(
        kept = report.kept,
        removed = report.removed,
        temp_removed = report.temp_removed,
        "collected cache garbage"
    );
    Ok(report)
}

/// Lists the `(name, path)` pairs of a directory; a missing directory is empty.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>, CacheError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CacheError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io(dir, e))?;
        if let Ok(name) = entry.file_name().into_string() {
            files.push((name, entry.path()));
        }
    }
    Ok(files)
}

/// Removes a temporary file if it was last modified at least `grace` ago.
fn remove_if_stale(path: &Path, grace: Duration) -> Result<bool, CacheError> {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        // Renamed into place between listing and now.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age < grace {
        tracing::debug!(path = %path.display(), ?age, "keeping recent temp file");
        return Ok(false);
    }

    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
