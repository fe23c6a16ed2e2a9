//! The persisted `{current, previous}` index.
//!
//! Stored as `index.json` in the cache directory. Saving writes a temporary
//! file next to the index and renames it into place, so a concurrent reader
//! sees either the old or the new index, never a torn one.

use std::io::Write;

use crate::config::CacheConfig;
use crate::entry::Generations;
use crate::error::CacheError;

/// Prefix of temporary files created while the index is being saved.
pub(crate) const INDEX_TEMP_PREFIX: &str = ".index-";

/// Loads the persisted generations from the cache directory.
///
/// A missing index (or missing cache directory) means the cache has never
/// been saved and yields empty generations. An index that exists but cannot
/// be read or parsed is an error, so real corruption is never mistaken for a
/// cold cache.
pub fn load(config: &CacheConfig) -> Result<Generations, CacheError> {
    let path = config.index_path();
    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no cache index, starting empty");
            return Ok(Generations::default());
        }
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let parse_error = |reason: String| CacheError::IndexParse {
        path: path.clone(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_slice(&content).map_err(|e| parse_error(e.to_string()))?;
    if !value.is_object() {
        return Err(parse_error("expected a {current, previous} object".to_string()));
    }
    let generations: Generations =
        serde_json::from_value(value).map_err(|e| parse_error(e.to_string()))?;

    for (name, generation) in [
        ("current", &generations.current),
        ("previous", &generations.previous),
    ] {
        if let Some((key, entry)) = generation.iter().find(|(key, entry)| **key != entry.path) {
            return Err(parse_error(format!(
                "{name} entry keyed '{key}' has path '{}'",
                entry.path
            )));
        }
    }
    Ok(generations)
}

/// Like [`load`], but a missing index is an error.
///
/// Used by readers that expect a build to have run already.
pub fn load_existing(config: &CacheConfig) -> Result<Generations, CacheError> {
    let path = config.index_path();
    match path.try_exists() {
        Ok(true) => load(config),
        Ok(false) => Err(CacheError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "cache index not found"),
        )),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Atomically replaces the index with `generations`.
///
/// Creates the cache directory if it doesn't exist.
pub fn save(config: &CacheConfig, generations: &Generations) -> Result<(), CacheError> {
    std::fs::create_dir_all(&config.dir).map_err(|e| CacheError::io(&config.dir, e))?;

    let json =
        serde_json::to_vec_pretty(generations).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(INDEX_TEMP_PREFIX)
        .tempfile_in(&config.dir)
        .map_err(|e| CacheError::io(&config.dir, e))?;
    tmp.write_all(&json)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CacheError::io(tmp.path(), e))?;

    let path = config.index_path();
    tmp.persist(&path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}
