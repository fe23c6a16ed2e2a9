//! Location of a cache on disk.

use std::path::{Path, PathBuf};

/// Name of the persisted index within the cache directory.
pub(crate) const INDEX_FILE: &str = "index.json";

/// Subdirectory holding response body files.
pub(crate) const BODIES_SUBDIR: &str = "bodies";

/// Configuration shared by [`BuildCache`](crate::BuildCache) and
/// [`Snapshot`](crate::Snapshot): the directory that holds the index and
/// the body files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache.
    pub dir: PathBuf,
}

impl CacheConfig {
    /// Creates a configuration rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the persisted `{current, previous}` index.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Directory that holds body files.
    pub fn bodies_dir(&self) -> PathBuf {
        self.dir.join(BODIES_SUBDIR)
    }

    /// Resolves a body-file reference stored in an entry.
    pub fn resolve(&self, file: &str) -> PathBuf {
        self.dir.join(Path::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_relative_to_dir() {
        let config = CacheConfig::new("/tmp/site/.kiln");
        assert_eq!(
            config.index_path(),
            PathBuf::from("/tmp/site/.kiln/index.json")
        );
        assert_eq!(config.bodies_dir(), PathBuf::from("/tmp/site/.kiln/bodies"));
        assert_eq!(
            config.resolve("bodies/hello-00.body"),
            PathBuf::from("/tmp/site/.kiln/bodies/hello-00.body")
        );
    }
}
