//! Shared foundational types used across the kiln build tool.
//!
//! This crate provides content hashing for cache keys and content-addressed
//! file names, including canonical hashing of structured values.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{canonical_json, ContentHash, ContentHasher};
