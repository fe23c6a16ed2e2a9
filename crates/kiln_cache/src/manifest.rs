//! Build manifest linking bundler output to per-route cache keys.
//!
//! The bundler supplies a config hash for the whole build and a module hash
//! per page entrypoint (the page's code plus everything it imports). A route's
//! cache key combines them, in this order, with a canonical digest of the
//! route's own inputs:
//!
//! ```text
//! module hash -> config hash -> digest(params)
//! ```
//!
//! Changing a page's code regenerates every route of that page, changing a
//! shared dependency regenerates every page importing it, changing the config
//! regenerates the whole site, and changing one record only regenerates the
//! routes whose params hash differently.

use std::collections::BTreeMap;
use std::path::Path;

use kiln_common::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Suffix appended to the config hash in watch mode.
const WATCH_SUFFIX: &str = "-watch";

/// Returns the config hash to use for a build.
///
/// Watch-mode builds get a distinct suffix so their entries never collide
/// with production entries built from the same configuration.
pub fn config_hash(digest: &str, watch: bool) -> String {
    if watch {
        format!("{digest}{WATCH_SUFFIX}")
    } else {
        digest.to_string()
    }
}

/// Hashes supplied by the bundler for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Digest of the runtime configuration module.
    pub config_hash: String,

    /// Module hash per page entrypoint.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl BuildManifest {
    /// Creates a manifest with the given config hash and no modules.
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            config_hash: config_hash.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Reads a manifest written by the bundler as JSON.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| CacheError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Records the module hash of a page entrypoint.
    pub fn insert_module(&mut self, entrypoint: impl Into<String>, hash: impl Into<String>) {
        self.modules.insert(entrypoint.into(), hash.into());
    }

    /// Returns the module hash of a page entrypoint.
    pub fn module_hash(&self, entrypoint: &str) -> Result<&str, CacheError> {
        self.modules
            .get(entrypoint)
            .map(String::as_str)
            .ok_or_else(|| CacheError::UnknownModule {
                entrypoint: entrypoint.to_string(),
            })
    }

    /// Computes the cache key of one route produced by `entrypoint`.
    ///
    /// `params` is any serializable value that varies per route (route
    /// parameters, fetched data). It is canonicalized first, so key order in
    /// maps does not affect the result.
    pub fn route_hash<T: Serialize + ?Sized>(
        &self,
        entrypoint: &str,
        params: &T,
    ) -> Result<String, CacheError> {
        let module = self.module_hash(entrypoint)?;
        let params = ContentHash::from_value(params).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        Ok(ContentHasher::new()
            .update(module)
            .update(&self.config_hash)
            .update(params.to_string())
            .digest())
    }
}
