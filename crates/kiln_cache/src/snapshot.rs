//! The read side of the cache: diffing consecutive generations.
//!
//! A [`Snapshot`] is derived once from a `{current, previous}` pair and tells
//! an exporter what to publish and what to remove:
//!
//! - `added`: entries of `current` whose body was written in the latest run.
//! - `evicted`: entries of `previous` whose path is absent from `current`.
//! - `current`: every entry of the latest run, new and reused alike.

use crate::config::CacheConfig;
use crate::entry::{Age, CacheEntry, Generations};
use crate::error::CacheError;
use crate::index;
use crate::store::{BodyStore, FsBodyStore};

/// Read-only view of the difference between two cache generations.
pub struct Snapshot<S: BodyStore = FsBodyStore> {
    added: Vec<CacheEntry>,
    evicted: Vec<CacheEntry>,
    current: Vec<CacheEntry>,
    store: S,
}

impl Snapshot<FsBodyStore> {
    /// Loads the persisted generations from `config.dir` and diffs them.
    ///
    /// Fails if the index is missing or cannot be parsed; a snapshot is only
    /// meaningful after at least one build has been saved.
    pub fn load(config: &CacheConfig) -> Result<Self, CacheError> {
        let data = index::load_existing(config)?;
        Ok(Self::create(config, data))
    }

    /// Diffs generations that are already in memory, typically the value
    /// returned by [`BuildCache::save`](crate::BuildCache::save).
    pub fn create(config: &CacheConfig, data: Generations) -> Self {
        Self::with_store(FsBodyStore::new(config), data)
    }
}

impl<S: BodyStore> Snapshot<S> {
    /// Diffs `data`, reading bodies through `store`.
    pub fn with_store(store: S, data: Generations) -> Self {
        let Generations { current, previous } = data;

        let evicted: Vec<CacheEntry> = previous
            .into_iter()
            .filter(|(path, _)| !current.contains_key(path))
            .map(|(_, entry)| entry)
            .collect();

        let current: Vec<CacheEntry> = current.into_values().collect();
        let added: Vec<CacheEntry> = current
            .iter()
            .filter(|entry| entry.age == Age::New)
            .cloned()
            .collect();

        tracing::debug!(
            added = added.len(),
            evicted = evicted.len(),
            current = current.len(),
            "created snapshot"
        );

        Self {
            added,
            evicted,
            current,
            store,
        }
    }

    /// Entries whose body was written in the latest run, sorted by path.
    pub fn added(&self) -> &[CacheEntry] {
        &self.added
    }

    /// Entries of the previous run whose path no longer exists, sorted by path.
    pub fn evicted(&self) -> &[CacheEntry] {
        &self.evicted
    }

    /// Every entry of the latest run, sorted by path.
    pub fn current(&self) -> &[CacheEntry] {
        &self.current
    }

    /// Entries of the latest run that reused the previous run's body.
    pub fn unchanged(&self) -> impl Iterator<Item = &CacheEntry> {
        self.current.iter().filter(|entry| entry.age == Age::Old)
    }

    /// Looks up the current entry for a route path.
    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.current
            .binary_search_by(|entry| entry.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.current[i])
    }

    /// Returns `true` if the latest run added or evicted anything.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.evicted.is_empty()
    }

    /// Reads the body of `entry`.
    ///
    /// Returns `Ok(None)` for a bodyless response. An entry that references a
    /// body file which is gone yields [`CacheError::MissingBody`].
    pub fn body(&self, entry: &CacheEntry) -> Result<Option<Vec<u8>>, CacheError> {
        match &entry.file {
            Some(file) => self.store.read_body(file).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Generation;

    fn entry(path: &str, hash: &str, age: Age) -> CacheEntry {
        CacheEntry {
            path: path.to_string(),
            hash: hash.to_string(),
            headers: Vec::new(),
            status: None,
            file: None,
            age,
        }
    }

    fn generation(entries: &[CacheEntry]) -> Generation {
        entries
            .iter()
            .map(|e| (e.path.clone(), e.clone()))
            .collect()
    }

    fn paths(entries: &[CacheEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    fn snapshot(data: Generations) -> (tempfile::TempDir, Snapshot) {
        let dir = tempfile::tempdir().unwrap();
        let snap = Snapshot::create(&CacheConfig::new(dir.path()), data);
        (dir, snap)
    }

    #[test]
    fn diff_partitions_entries() {
        let data = Generations {
            previous: generation(&[
                entry("/a", "1", Age::New),
                entry("/b", "1", Age::New),
                entry("/c", "1", Age::New),
            ]),
            current: generation(&[
                entry("/a", "1", Age::Old),
                entry("/c", "2", Age::New),
                entry("/d", "1", Age::New),
            ]),
        };
        let (_dir, snap) = snapshot(data);

        assert_eq!(paths(snap.added()), vec!["/c", "/d"]);
        assert_eq!(paths(snap.evicted()), vec!["/b"]);
        assert_eq!(paths(snap.current()), vec!["/a", "/c", "/d"]);
        let unchanged: Vec<&str> = snap.unchanged().map(|e| e.path.as_str()).collect();
        assert_eq!(unchanged, vec!["/a"]);
        assert!(snap.has_changes());
    }

    #[test]
    fn evicted_entries_come_from_previous() {
        let data = Generations {
            previous: generation(&[entry("/gone", "old", Age::Old)]),
            current: Generation::new(),
        };
        let (_dir, snap) = snapshot(data);
        assert_eq!(snap.evicted()[0].hash, "old");
        assert!(snap.current().is_empty());
    }

    #[test]
    fn reused_only_in_current_is_not_added() {
        let data = Generations {
            previous: Generation::new(),
            current: generation(&[entry("/kept", "1", Age::Old)]),
        };
        let (_dir, snap) = snapshot(data);
        assert!(snap.added().is_empty());
        assert!(!snap.has_changes());
    }

    #[test]
    fn get_finds_current_entries() {
        let data = Generations {
            previous: generation(&[entry("/old", "1", Age::New)]),
            current: generation(&[entry("/", "1", Age::New), entry("/z", "1", Age::Old)]),
        };
        let (_dir, snap) = snapshot(data);
        assert_eq!(snap.get("/z").map(|e| e.age), Some(Age::Old));
        assert!(snap.get("/old").is_none());
    }

    #[test]
    fn bodyless_entry_has_no_body() {
        let (_dir, snap) = snapshot(Generations::default());
        let e = entry("/204", "h", Age::New);
        assert_eq!(snap.body(&e).unwrap(), None);
    }

    #[test]
    fn missing_body_file_is_surfaced() {
        let (_dir, snap) = snapshot(Generations::default());
        let e = CacheEntry {
            file: Some("bodies/deleted-00.body".to_string()),
            ..entry("/", "h", Age::New)
        };
        assert!(matches!(
            snap.body(&e),
            Err(CacheError::MissingBody { .. })
        ));
    }

    #[test]
    fn load_without_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Snapshot::load(&CacheConfig::new(dir.path())).is_err());
    }
}
