//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// A missing index is not an error (it means the cache never ran). Everything
/// here aborts the current build run before `save`, leaving the previously
/// persisted generation intact.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The index file exists but is not a valid `{current, previous}` document.
    #[error("failed to parse cache index {path}: {reason}")]
    IndexParse {
        /// The index file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// An entry references a body file that no longer exists on disk.
    #[error("body file {path} referenced by the cache index is missing")]
    MissingBody {
        /// The missing body file.
        path: PathBuf,
    },

    /// A response body or the index could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The build manifest could not be parsed.
    #[error("failed to parse build manifest {path}: {reason}")]
    ManifestParse {
        /// The manifest file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A route referenced a page entrypoint the build manifest does not know.
    #[error("no module hash for entrypoint '{entrypoint}'")]
    UnknownModule {
        /// The entrypoint that was looked up.
        entrypoint: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
