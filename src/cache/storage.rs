//! Cache storage trait and in-memory TTL implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

/// Serialized dataset as stored by the loader.
pub type Payload = Arc<[u8]>;

/// A cached value and the instant it stops being visible.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
  pub value: V,
  /// `None` when `now + ttl` is not representable.
  pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
  fn new(value: V, ttl: Duration) -> Self {
    Self {
      value,
      expires_at: Instant::now().checked_add(ttl),
    }
  }

  pub fn is_expired_at(&self, now: Instant) -> bool {
    self.expires_at.is_some_and(|at| now >= at)
  }
}

/// Key/value store with per-entry expiry.
///
/// Expiry is lazy: an expired entry is invisible to [`get`](Self::get) but
/// stays in the map until it is overwritten, invalidated, or purged. One
/// reader-writer lock guards the whole keyspace and is never held across I/O.
#[derive(Debug)]
pub struct TtlCache<V> {
  entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for TtlCache<V> {
  fn default() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }
}

impl<V: Clone> TtlCache<V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `value` under `key` until `now + ttl`, replacing any previous entry.
  pub fn set(&self, key: &str, value: V, ttl: Duration) {
    self.entries.write().insert(key.to_string(), CacheEntry::new(value, ttl));
    debug!(key, ttl_secs = ttl.as_secs(), "cache set");
  }

  /// Unexpired value for `key`, if any.
  pub fn get(&self, key: &str) -> Option<V> {
    let entries = self.entries.read();
    match entries.get(key) {
      Some(entry) if entry.is_expired_at(Instant::now()) => {
        debug!(key, "cache expired");
        None
      }
      Some(entry) => {
        debug!(key, "cache hit");
        Some(entry.value.clone())
      }
      None => None,
    }
  }

  /// Remove `key`. Removing a missing key is not an error.
  pub fn invalidate(&self, key: &str) {
    if self.entries.write().remove(key).is_some() {
      debug!(key, "cache invalidated");
    }
  }

  pub fn clear(&self) {
    self.entries.write().clear();
    debug!("cache cleared");
  }

  /// Number of unexpired entries.
  pub fn len(&self) -> usize {
    let now = Instant::now();
    self.entries.read().values().filter(|e| !e.is_expired_at(now)).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Physically drop expired entries. Returns how many were removed.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.entries.write();
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired_at(now));
    before - entries.len()
  }
}

/// Trait for dataset cache backends.
pub trait CacheStorage: Send + Sync {
  fn get(&self, key: &str) -> Option<Payload>;

  fn set(&self, key: &str, payload: Payload, ttl: Duration);

  fn invalidate(&self, key: &str);

  fn clear(&self);
}

impl CacheStorage for TtlCache<Payload> {
  fn get(&self, key: &str) -> Option<Payload> {
    TtlCache::get(self, key)
  }

  fn set(&self, key: &str, payload: Payload, ttl: Duration) {
    TtlCache::set(self, key, payload, ttl)
  }

  fn invalidate(&self, key: &str) {
    TtlCache::invalidate(self, key)
  }

  fn clear(&self) {
    TtlCache::clear(self)
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Option<Payload> {
    None // Always miss
  }

  fn set(&self, _key: &str, _payload: Payload, _ttl: Duration) {}

  fn invalidate(&self, _key: &str) {}

  fn clear(&self) {}
}
