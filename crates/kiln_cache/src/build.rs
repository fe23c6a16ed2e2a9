//! The write side of the cache, used while a build runs.
//!
//! [`BuildCache`] is loaded once per build run. For every generated route it
//! either reuses the previous run's body file (same path, same hash) or writes
//! a new one, and records the entry in the current generation. [`BuildCache::save`]
//! is the single commit point: until it runs, the previously saved generation
//! stays authoritative.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::entry::{Age, CacheEntry, Generation, Generations, Response};
use crate::error::CacheError;
use crate::index;
use crate::store::{body_file_name, BodyStore, FsBodyStore};

/// Counters describing what a build run did with its responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Responses whose body file was created in this run.
    pub written: usize,
    /// Responses that reused the previous run's entry.
    pub reused: usize,
    /// Responses without a body that were recorded as new.
    pub bodyless: usize,
}

/// Build-time cache bound to one cache directory.
///
/// `add` takes `&self` and may be called from many threads at once; only the
/// insertion into the current generation is serialized. `save` consumes the
/// cache, so no response can be added after the generation is committed.
pub struct BuildCache<S: BodyStore = FsBodyStore> {
    config: CacheConfig,
    store: S,

    /// The generation saved by the last run, used for reuse decisions.
    previous: Generation,

    /// Entries produced so far in this run.
    current: Mutex<Generation>,

    written: AtomicUsize,
    reused: AtomicUsize,
    bodyless: AtomicUsize,
}

impl BuildCache<FsBodyStore> {
    /// Loads the cache in `config.dir`, storing bodies on the filesystem.
    ///
    /// A directory that has never been built is not an error: every route is
    /// treated as new. A corrupt index is.
    pub fn load(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::with_store(config, FsBodyStore::new(config))
    }
}

impl<S: BodyStore> BuildCache<S> {
    /// Loads the cache in `config.dir` using a custom body store.
    pub fn with_store(config: &CacheConfig, store: S) -> Result<Self, CacheError> {
        let loaded = index::load(config)?;
        tracing::debug!(
            dir = %config.dir.display(),
            previous = loaded.current.len(),
            "loaded build cache"
        );

        Ok(Self {
            config: config.clone(),
            store,
            previous: loaded.current,
            current: Mutex::new(Generation::new()),
            written: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            bodyless: AtomicUsize::new(0),
        })
    }

    /// Records a generated response in the current generation.
    ///
    /// If the previous generation has an entry for the same path with the same
    /// hash, and its body file is still on disk, that entry is reused with
    /// [`Age::Old`] and nothing is written. Otherwise the body (if any) is
    /// written to a content-addressed file and the entry is recorded as
    /// [`Age::New`].
    pub fn add(&self, response: Response) -> Result<CacheEntry, CacheError> {
        if let Some(prev) = self.previous.get(&response.path) {
            if prev.hash == response.hash {
                if self.body_present(prev)? {
                    let entry = CacheEntry {
                        age: Age::Old,
                        ..prev.clone()
                    };
                    self.reused.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(path = %entry.path, "reusing cached response");
                    self.insert(entry.clone());
                    return Ok(entry);
                }
                tracing::warn!(
                    path = %prev.path,
                    file = prev.file.as_deref().unwrap_or_default(),
                    "cached body missing, regenerating"
                );
            }
        }

        let file = match &response.body {
            Some(body) => {
                let file = body_file_name(&response.hash, body);
                if self.store.write_body(&file, body)? {
                    self.written.fetch_add(1, Ordering::Relaxed);
                }
                Some(file)
            }
            None => {
                self.bodyless.fetch_add(1, Ordering::Relaxed);
                None
            }
        };

        let entry = CacheEntry {
            path: response.path,
            hash: response.hash,
            headers: response.headers,
            status: response.status,
            file,
            age: Age::New,
        };
        tracing::debug!(path = %entry.path, "cached new response");
        self.insert(entry.clone());
        Ok(entry)
    }

    /// Persists `{current, previous}` and returns what was written.
    ///
    /// Must be called once, after every `add` for the run has finished. The
    /// returned generations can be passed to
    /// [`Snapshot::create`](crate::Snapshot::create) without re-reading the index.
    pub fn save(self) -> Result<Generations, CacheError> {
        let stats = self.stats();
        let generations = Generations {
            current: self.current.into_inner(),
            previous: self.previous,
        };
        index::save(&self.config, &generations)?;

        tracing::info!(
            dir = %self.config.dir.display(),
            routes = generations.current.len(),
            written = stats.written,
            reused = stats.reused,
            "saved build cache"
        );
        Ok(generations)
    }

    /// Returns the generation loaded from the last saved run.
    pub fn previous(&self) -> &Generation {
        &self.previous
    }

    /// Returns the number of routes recorded so far in this run.
    pub fn len(&self) -> usize {
        self.current.lock().len()
    }

    /// Returns `true` if no route has been recorded in this run.
    pub fn is_empty(&self) -> bool {
        self.current.lock().is_empty()
    }

    /// Returns the counters for this run so far.
    pub fn stats(&self) -> BuildStats {
        BuildStats {
            written: self.written.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            bodyless: self.bodyless.load(Ordering::Relaxed),
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn body_present(&self, entry: &CacheEntry) -> Result<bool, CacheError> {
        match &entry.file {
            Some(file) => self.store.contains(file),
            None => Ok(true),
        }
    }

    fn insert(&self, entry: CacheEntry) {
        let replaced = self.current.lock().insert(entry.path.clone(), entry);
        if let Some(old) = replaced {
            tracing::warn!(path = %old.path, "route added twice in one build, keeping the last");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> (tempfile::TempDir, CacheConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::new(dir.path().join(".kiln"));
        (dir, config)
    }

    #[test]
    fn fresh_cache_has_no_previous() {
        let (_dir, config) = make_config();
        let cache = BuildCache::load(&config).unwrap();
        assert!(cache.previous().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn new_response_writes_body() {
        let (_dir, config) = make_config();
        let cache = BuildCache::load(&config).unwrap();
        let entry = cache
            .add(Response::new("/", "h1").with_body("Hello world"))
            .unwrap();

        assert_eq!(entry.age, Age::New);
        let file = entry.file.as_deref().unwrap();
        assert_eq!(std::fs::read(config.resolve(file)).unwrap(), b"Hello world");
        assert_eq!(cache.stats().written, 1);
    }

    #[test]
    fn bodyless_response_has_no_file() {
        let (_dir, config) = make_config();
        let cache = BuildCache::load(&config).unwrap();
        let entry = cache
            .add(
                Response::new("/old", "h")
                    .with_status(301)
                    .with_header("location", "/new"),
            )
            .unwrap();
        assert!(entry.file.is_none());
        assert_eq!(entry.status, Some(301));
        assert_eq!(cache.stats().bodyless, 1);
        assert!(!config.bodies_dir().exists());
    }

    #[test]
    fn save_promotes_current_to_previous() {
        let (_dir, config) = make_config();

        let cache = BuildCache::load(&config).unwrap();
        cache.add(Response::new("/a", "1").with_body("a")).unwrap();
        let first = cache.save().unwrap();
        assert!(first.previous.is_empty());

        let cache = BuildCache::load(&config).unwrap();
        assert_eq!(cache.previous().len(), 1);
        cache.add(Response::new("/b", "2").with_body("b")).unwrap();
        let second = cache.save().unwrap();

        assert_eq!(second.previous, first.current);
        assert!(second.current.contains_key("/b"));
        assert!(!second.current.contains_key("/a"));
        assert_eq!(index::load(&config).unwrap(), second);
    }

    #[test]
    fn reuse_copies_previous_metadata() {
        let (_dir, config) = make_config();

        let cache = BuildCache::load(&config).unwrap();
        let first = cache
            .add(
                Response::new("/p", "same")
                    .with_body("page")
                    .with_header("cache-control", "max-age=60"),
            )
            .unwrap();
        cache.save().unwrap();

        let cache = BuildCache::load(&config).unwrap();
        let second = cache.add(Response::new("/p", "same").with_body("page")).unwrap();
        assert_eq!(second.age, Age::Old);
        assert_eq!(second.file, first.file);
        assert_eq!(second.headers, first.headers);
        assert_eq!(cache.stats().reused, 1);
        assert_eq!(cache.stats().written, 0);
    }

    #[test]
    fn reuse_of_bodyless_entry() {
        let (_dir, config) = make_config();

        let cache = BuildCache::load(&config).unwrap();
        cache.add(Response::new("/r", "h").with_status(204)).unwrap();
        cache.save().unwrap();

        let cache = BuildCache::load(&config).unwrap();
        let entry = cache.add(Response::new("/r", "h").with_status(204)).unwrap();
        assert_eq!(entry.age, Age::Old);
        assert!(entry.file.is_none());
    }

    #[test]
    fn missing_previous_body_forces_regeneration() {
        let (_dir, config) = make_config();

        let cache = BuildCache::load(&config).unwrap();
        let first = cache.add(Response::new("/x", "h").with_body("x")).unwrap();
        cache.save().unwrap();
        std::fs::remove_file(config.resolve(first.file.as_deref().unwrap())).unwrap();

        let cache = BuildCache::load(&config).unwrap();
        let entry = cache.add(Response::new("/x", "h").with_body("x")).unwrap();
        assert_eq!(entry.age, Age::New);
        assert!(config.resolve(entry.file.as_deref().unwrap()).exists());
    }

    #[test]
    fn identical_hashes_share_a_body_file() {
        let (_dir, config) = make_config();
        let cache = BuildCache::load(&config).unwrap();
        let a = cache.add(Response::new("/a", "h").with_body("same")).unwrap();
        let b = cache.add(Response::new("/b", "h").with_body("same")).unwrap();
        assert_eq!(a.file, b.file);
        assert_eq!(std::fs::read_dir(config.bodies_dir()).unwrap().count(), 1);
        assert_eq!(cache.stats().written, 1);
    }

    #[test]
    fn duplicate_path_keeps_last() {
        let (_dir, config) = make_config();
        let cache = BuildCache::load(&config).unwrap();
        cache.add(Response::new("/d", "1").with_body("one")).unwrap();
        cache.add(Response::new("/d", "2").with_body("two")).unwrap();
        let saved = cache.save().unwrap();
        assert_eq!(saved.current.len(), 1);
        assert_eq!(saved.current["/d"].hash, "2");
    }

    #[test]
    fn dropping_without_save_keeps_previous_generation() {
        let (_dir, config) = make_config();

        let cache = BuildCache::load(&config).unwrap();
        cache.add(Response::new("/kept", "1").with_body("k")).unwrap();
        let committed = cache.save().unwrap();

        {
            let cache = BuildCache::load(&config).unwrap();
            cache.add(Response::new("/aborted", "2").with_body("a")).unwrap();
        }

        assert_eq!(index::load(&config).unwrap(), committed);
    }

    #[test]
    fn corrupt_index_fails_load() {
        let (_dir, config) = make_config();
        std::fs::create_dir_all(&config.dir).unwrap();
        std::fs::write(config.index_path(), b"{ truncated").unwrap();
        assert!(matches!(
            BuildCache::load(&config),
            Err(CacheError::IndexParse { .. })
        ));
    }
}
