//! Resolution of project settings shared by all commands.

use std::path::PathBuf;

use kiln_cache::CacheConfig;
use kiln_config::ProjectConfig;

use crate::GlobalArgs;

/// A loaded project: its root directory and parsed `kiln.toml`.
pub struct Project {
    /// Project root directory.
    pub root: PathBuf,
    /// Parsed configuration (defaults if no `kiln.toml` exists).
    pub config: ProjectConfig,
}

impl Project {
    /// Loads the project named by the global flags.
    pub fn load(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = kiln_config::load_config(&global.project)?;
        Ok(Self {
            root: global.project.clone(),
            config,
        })
    }

    /// Returns the cache location, honoring `--cache-dir`.
    pub fn cache_config(&self, global: &GlobalArgs) -> CacheConfig {
        match &global.cache_dir {
            Some(dir) => CacheConfig::new(dir.clone()),
            None => CacheConfig::new(self.root.join(&self.config.cache.dir)),
        }
    }

    /// Returns the export output directory, honoring `--out`.
    pub fn out_dir(&self, out: Option<&PathBuf>) -> PathBuf {
        match out {
            Some(dir) => dir.clone(),
            None => self.root.join(&self.config.export.out_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(project: &std::path::Path, cache_dir: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            project: project.to_path_buf(),
            cache_dir,
        }
    }

    #[test]
    fn defaults_are_relative_to_project() {
        let dir = tempfile::tempdir().unwrap();
        let g = global(dir.path(), None);
        let project = Project::load(&g).unwrap();
        assert_eq!(project.cache_config(&g).dir, dir.path().join(".kiln/cache"));
        assert_eq!(project.out_dir(None), dir.path().join("dist"));
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kiln.toml"), "[cache]\ndir = \"c\"\n").unwrap();
        let g = global(dir.path(), Some(PathBuf::from("/elsewhere")));
        let project = Project::load(&g).unwrap();
        assert_eq!(project.cache_config(&g).dir, PathBuf::from("/elsewhere"));
        let out = PathBuf::from("/out");
        assert_eq!(project.out_dir(Some(&out)), out);
    }
}
