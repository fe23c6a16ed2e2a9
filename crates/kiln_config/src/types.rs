//! Configuration types deserialized from `kiln.toml`.

use std::path::PathBuf;

use serde::Deserialize;

/// The top-level project configuration parsed from `kiln.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Build cache settings.
    #[serde(default)]
    pub cache: CacheSection,
    /// Export settings.
    #[serde(default)]
    pub export: ExportSection,
}

/// The `[cache]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Cache directory, relative to the project root.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

/// The `[export]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    /// Output directory, relative to the project root.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Which entries an export writes.
    #[serde(default)]
    pub strategy: ExportStrategy,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            strategy: ExportStrategy::default(),
        }
    }
}

/// Which entries an export writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStrategy {
    /// Write only entries added by the latest build.
    #[default]
    Delta,
    /// Rewrite every current entry.
    Full,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".kiln/cache")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}
