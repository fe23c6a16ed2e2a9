//! Content-addressed storage for response bodies.
//!
//! Bodies are stored under `<cache_dir>/bodies/` in files named after the
//! entry hash, prefixed with a short slug of the body to make the directory
//! readable. Files are published with a no-clobber rename from a temporary
//! file, so a reader never observes a partially written body and an existing
//! body is never modified in place.

use std::io::Write;
use std::path::PathBuf;

use kiln_common::ContentHash;

use crate::config::{CacheConfig, BODIES_SUBDIR};
use crate::error::CacheError;

/// File extension for body files.
pub(crate) const BODY_EXT: &str = "body";

/// Prefix of temporary files created while a body is being written.
pub(crate) const TEMP_PREFIX: &str = ".tmp-";

/// Maximum number of body bytes considered for the file-name slug.
const SLUG_EXCERPT: usize = 24;

/// Storage backend for body files.
///
/// `file` is always a reference relative to the cache directory, as recorded
/// in [`CacheEntry::file`](crate::CacheEntry::file).
pub trait BodyStore: Send + Sync {
    /// Stores `body` under `file`, returning `false` if it was already there.
    ///
    /// If `file` already exists the call succeeds without touching it: the
    /// name is derived from the entry hash, and equal hashes imply equal bytes.
    fn write_body(&self, file: &str, body: &[u8]) -> Result<bool, CacheError>;

    /// Reads the body stored under `file`.
    ///
    /// Returns [`CacheError::MissingBody`] if the file does not exist.
    fn read_body(&self, file: &str) -> Result<Vec<u8>, CacheError>;

    /// Returns `true` if a body is stored under `file`.
    fn contains(&self, file: &str) -> Result<bool, CacheError>;
}

/// Returns the body-file reference for an entry with the given hash and body.
///
/// The name has the form `bodies/<slug>-<digest>.body`, where `digest` is
/// the content hash of `hash`.
pub fn body_file_name(hash: &str, body: &[u8]) -> String {
    let digest = ContentHash::from_bytes(hash.as_bytes());
    format!("{BODIES_SUBDIR}/{}-{digest}.{BODY_EXT}", slug(body))
}

/// Derives a short, file-name-safe label from the start of a body.
fn slug(body: &[u8]) -> String {
    let excerpt = &body[..body.len().min(SLUG_EXCERPT)];
    let text = String::from_utf8_lossy(excerpt);

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        "body".to_string()
    } else {
        out
    }
}

/// Filesystem-backed [`BodyStore`] rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct FsBodyStore {
    config: CacheConfig,
}

impl FsBodyStore {
    /// Creates a store for the cache described by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.config.resolve(file)
    }
}

impl BodyStore for FsBodyStore {
    fn write_body(&self, file: &str, body: &[u8]) -> Result<bool, CacheError> {
        let target = self.path(file);
        let dir = match target.parent() {
            Some(parent) => parent.to_path_buf(),
            None => self.config.bodies_dir(),
        };
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)
            .map_err(|e| CacheError::io(&dir, e))?;
        tmp.write_all(body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CacheError::io(tmp.path(), e))?;

        match tmp.persist_noclobber(&target) {
            Ok(_) => {
                tracing::debug!(file, bytes = body.len(), "wrote body");
                Ok(true)
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                // Same name means same hash; the dropped temp file is removed.
                tracing::debug!(file, "body already present");
                Ok(false)
            }
            Err(e) => Err(CacheError::io(target, e.error)),
        }
    }

    fn read_body(&self, file: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.path(file);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::MissingBody { path })
            }
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    fn contains(&self, file: &str) -> Result<bool, CacheError> {
        let path = self.path(file);
        path.try_exists().map_err(|e| CacheError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, FsBodyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBodyStore::new(&CacheConfig::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn name_has_slug_and_fixed_length_digest() {
        let name = body_file_name("hash", b"Hello world");
        let digest = ContentHash::from_bytes(b"hash").to_string();
        assert_eq!(name, format!("bodies/hello-world-{digest}.body"));
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug(b"<!DOCTYPE html><html>"), "doctype-html-html");
        assert_eq!(slug(b"  --Hi!!  "), "hi");
    }

    #[test]
    fn slug_limits_excerpt_length() {
        let body = "a".repeat(100);
        assert_eq!(slug(body.as_bytes()).len(), SLUG_EXCERPT);
    }

    #[test]
    fn slug_of_binary_or_empty_body_falls_back() {
        assert_eq!(slug(b""), "body");
        assert_eq!(slug(&[0xff, 0xfe, 0x00]), "body");
    }

    #[test]
    fn same_hash_same_name() {
        assert_eq!(
            body_file_name("h", b"same bytes"),
            body_file_name("h", b"same bytes")
        );
        assert_ne!(
            body_file_name("h1", b"same bytes"),
            body_file_name("h2", b"same bytes")
        );
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store) = make_store();
        let file = body_file_name("h", b"<p>hi</p>");
        store.write_body(&file, b"<p>hi</p>").unwrap();
        assert!(store.contains(&file).unwrap());
        assert_eq!(store.read_body(&file).unwrap(), b"<p>hi</p>");
    }

    #[test]
    fn existing_body_is_not_overwritten() {
        let (_dir, store) = make_store();
        let file = body_file_name("h", b"first");
        assert!(store.write_body(&file, b"first").unwrap());
        assert!(!store.write_body(&file, b"second").unwrap());
        assert_eq!(store.read_body(&file).unwrap(), b"first");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (dir, store) = make_store();
        let file = body_file_name("h", b"x");
        store.write_body(&file, b"x").unwrap();
        store.write_body(&file, b"x").unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path().join("bodies"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with(TEMP_PREFIX));
    }

    #[test]
    fn read_missing_body_is_an_error() {
        let (_dir, store) = make_store();
        let err = store.read_body("bodies/gone-00.body").unwrap_err();
        assert!(matches!(err, CacheError::MissingBody { .. }));
        assert!(!store.contains("bodies/gone-00.body").unwrap());
    }
}
