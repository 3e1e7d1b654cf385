//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};

/// Values that can be stored in the dataset cache.
///
/// Cached values are serialized once on write and decoded into the
/// requested shape on every read, so any serde round-trippable type qualifies.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync {}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where loaded data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the remote store
  Network,
  /// Unexpired cached data
  Cache,
}
