//! Cache entries, generations, and the responses they are built from.
//!
//! One [`CacheEntry`] is recorded per route path. A [`Generation`] is the full
//! set of entries produced by one build run, and [`Generations`] pairs the
//! latest run with the one before it. That pair is the unit persisted in the
//! cache index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A single HTTP header as a `(name, value)` pair.
///
/// Headers are kept as an ordered list so repeated names and insertion order
/// survive a round trip through the index.
pub type Header = (String, String);

/// Whether an entry's body was written during the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Age {
    /// The body was (re)written in this run, or the response has no body.
    New,
    /// The previous run's body file was reused because the hash matched.
    Old,
}

/// The cached record for one route path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical route path, unique within a generation.
    pub path: String,

    /// Digest of the inputs that produced this entry.
    pub hash: String,

    /// Response headers in insertion order.
    #[serde(default)]
    pub headers: Vec<Header>,

    /// HTTP status code; `None` means 200.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Body file path relative to the cache directory, if the response had a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Whether the body was written in the run that produced this entry.
    pub age: Age,
}

impl CacheEntry {
    /// Returns the status code, defaulting to 200 when none was recorded.
    pub fn status_or_default(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    /// Returns `true` if the body was written in the latest run.
    pub fn is_new(&self) -> bool {
        self.age == Age::New
    }
}

/// All entries of one build run, keyed by route path.
pub type Generation = BTreeMap<String, CacheEntry>;

/// The persisted pair of the latest generation and the one before it.
///
/// Both keys are required and no others are accepted, so a document of some
/// other shape is rejected rather than read as an empty cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Generations {
    /// Entries produced by the most recent saved run.
    pub current: Generation,

    /// Entries produced by the run before that.
    pub previous: Generation,
}

impl Generations {
    /// Returns `true` if neither generation holds any entries.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }
}

/// A generated response handed to [`BuildCache::add`](crate::BuildCache::add).
///
/// `hash` is computed by the caller, typically with
/// [`BuildManifest::route_hash`](crate::BuildManifest::route_hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Route path the response was generated for.
    pub path: String,
    /// Digest of the inputs that produced the response.
    pub hash: String,
    /// Serialized body, if any.
    pub body: Option<Vec<u8>>,
    /// Response headers in insertion order.
    pub headers: Vec<Header>,
    /// HTTP status code, if not 200.
    pub status: Option<u16>,
}

impl Response {
    /// Creates a bodyless response with no headers.
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            body: None,
            headers: Vec::new(),
            status: None,
        }
    }

    /// Creates a response whose body is the JSON serialization of `value`.
    ///
    /// A `content-type: application/json` header is appended.
    pub fn json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        hash: impl Into<String>,
        value: &T,
    ) -> Result<Self, CacheError> {
        let body = serde_json::to_vec(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        Ok(Self::new(path, hash)
            .with_body(body)
            .with_header("content-type", "application/json"))
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Appends a header, keeping any existing header with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
