//! Incremental build cache and snapshot diffing.
//!
//! A build run loads a [`BuildCache`] bound to a cache directory, feeds it one
//! [`Response`] per generated route, and saves the resulting generation. A
//! [`Snapshot`] taken afterwards reports which routes were added, which were
//! evicted, and which make up the current output, so an exporter can publish
//! only what changed.

#![warn(missing_docs)]

pub mod build;
pub mod config;
pub mod entry;
pub mod error;
pub mod gc;
pub mod index;
pub mod manifest;
pub mod snapshot;
pub mod store;

pub use build::{BuildCache, BuildStats};
pub use config::CacheConfig;
pub use entry::{Age, CacheEntry, Generation, Generations, Header, Response};
pub use error::CacheError;
pub use gc::{collect_garbage, collect_garbage_with_grace, GcReport, TEMP_GRACE};
pub use manifest::{config_hash, BuildManifest};
pub use snapshot::Snapshot;
pub use store::{BodyStore, FsBodyStore};
