//! Dataset loader: cache-first reads with fetch-through to the remote store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::sheets::{RemoteStore, SheetRecord, StoreError};

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable};

/// Prefix prepended to a dataset name to form its cache key.
pub const CACHE_KEY_PREFIX: &str = "sheet_";

pub fn cache_key(dataset: &str) -> String {
  format!("{}{}", CACHE_KEY_PREFIX, dataset)
}

/// How long each dataset stays cached.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
  default: Duration,
  overrides: HashMap<String, Duration>,
}

impl TtlPolicy {
  /// Policy with a single TTL for every dataset.
  pub fn uniform(default: Duration) -> Self {
    Self {
      default,
      overrides: HashMap::new(),
    }
  }

  /// Replace the TTL used for datasets without an override.
  pub fn with_default(mut self, default: Duration) -> Self {
    self.default = default;
    self
  }

  pub fn with_ttl(mut self, dataset: impl Into<String>, ttl: Duration) -> Self {
    self.overrides.insert(dataset.into(), ttl);
    self
  }

  pub fn ttl_for(&self, dataset: &str) -> Duration {
    self.overrides.get(dataset).copied().unwrap_or(self.default)
  }
}

impl Default for TtlPolicy {
  /// Lookup data changes rarely and is cached longer than order data.
  fn default() -> Self {
    Self::uniform(Duration::from_secs(5 * 60))
      .with_ttl(crate::sheets::USERS_SHEET, Duration::from_secs(15 * 60))
      .with_ttl(crate::sheets::TELEGRAM_TEMPLATES_SHEET, Duration::from_secs(60 * 60))
  }
}

/// Loads datasets through the cache.
///
/// This sits between callers and the remote store. Within one call the order
/// is strict: cache check, then (on miss) remote read, then cache write.
#[derive(Clone)]
pub struct DatasetLoader {
  remote: Arc<dyn RemoteStore>,
  storage: Arc<dyn CacheStorage>,
  policy: TtlPolicy,
}

impl DatasetLoader {
  pub fn new(remote: Arc<dyn RemoteStore>, storage: Arc<dyn CacheStorage>, policy: TtlPolicy) -> Self {
    Self {
      remote,
      storage,
      policy,
    }
  }

  pub fn remote(&self) -> &Arc<dyn RemoteStore> {
    &self.remote
  }

  /// Load `dataset` as `Vec<T>`, caching a fresh read for `ttl`.
  ///
  /// 1. Check cache - if present and decodable as `Vec<T>`, return it
  /// 2. Otherwise read from the remote store (errors propagate, no retry)
  /// 3. Decode the remote payload (a mismatch is fatal)
  /// 4. Re-encode and cache the typed value
  ///
  /// A cached value that no longer decodes into the requested shape is
  /// treated as a miss, never as an error.
  pub async fn load<T: Cacheable>(&self, dataset: &str, ttl: Duration) -> Result<CacheResult<Vec<T>>, StoreError> {
    let key = cache_key(dataset);

    if let Some(payload) = self.storage.get(&key) {
      match serde_json::from_slice::<Vec<T>>(&payload) {
        Ok(data) => return Ok(CacheResult::from_cache(data)),
        Err(e) => warn!(dataset, error = %e, "Discarding cached value that does not match requested shape"),
      }
    }

    info!(dataset, "Fetching fresh data");
    let raw = self.remote.read_dataset(dataset).await?;

    let data: Vec<T> = serde_json::from_value(raw).map_err(|e| {
      error!(dataset, error = %e, "Remote data does not match expected structure");
      StoreError::InvalidResponse(format!("mismatched data structure for {}: {}", dataset, e))
    })?;

    match serde_json::to_vec(&data) {
      Ok(bytes) => self.storage.set(&key, Arc::from(bytes), ttl),
      // Still serve the fresh data; the next call refetches.
      Err(e) => warn!(dataset, error = %e, "Failed to encode dataset for cache"),
    }

    Ok(CacheResult::from_network(data))
  }

  /// Load with the TTL the policy assigns to `dataset`.
  pub async fn load_default<T: Cacheable>(&self, dataset: &str) -> Result<Vec<T>, StoreError> {
    let ttl = self.policy.ttl_for(dataset);
    Ok(self.load(dataset, ttl).await?.data)
  }

  /// Load the sheet bound to record type `R`.
  pub async fn load_records<R: SheetRecord>(&self) -> Result<Vec<R>, StoreError> {
    self.load_default(R::sheet()).await
  }

  /// Cached rows of `dataset` without touching the remote store.
  pub fn peek<T: Cacheable>(&self, dataset: &str) -> Option<Vec<T>> {
    let payload = self.storage.get(&cache_key(dataset))?;
    serde_json::from_slice(&payload).ok()
  }

  pub fn invalidate(&self, dataset: &str) {
    self.storage.invalidate(&cache_key(dataset));
    debug!(dataset, "Dataset cache invalidated");
  }

  pub fn invalidate_all(&self) {
    self.storage.clear();
    info!("Dataset cache cleared");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{NoopStorage, Payload, TtlCache};
  use crate::sheets::testing::MemoryStore;
  use crate::sheets::{Product, SheetRow, USERS_SHEET};
  use serde_json::json;

  fn products() -> serde_json::Value {
    json!([
      {"ProductName": "Serum", "Barcode": "111", "Price": 12.5, "ImageURL": ""},
      {"ProductName": "Toner", "Barcode": 222, "Price": "8", "ImageURL": ""},
    ])
  }

  fn loader(store: Arc<MemoryStore>) -> (DatasetLoader, Arc<TtlCache<Payload>>) {
    let cache = Arc::new(TtlCache::new());
    let loader = DatasetLoader::new(store, cache.clone(), TtlPolicy::default());
    (loader, cache)
  }

  #[tokio::test]
  async fn test_second_load_within_ttl_hits_cache() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, _) = loader(store.clone());

    let first = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap();
    let second = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap();

    assert!(!first.is_cached());
    assert!(second.is_cached());
    assert_eq!(first.data, second.data);
    assert_eq!(second.data[1].barcode, "222");
    assert_eq!(store.read_count("Products"), 1);
  }

  #[tokio::test]
  async fn test_expired_entry_is_refetched() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, _) = loader(store.clone());

    loader.load::<Product>("Products", Duration::ZERO).await.unwrap();
    loader.load::<Product>("Products", Duration::ZERO).await.unwrap();

    assert_eq!(store.read_count("Products"), 2);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, _) = loader(store.clone());

    loader.load_default::<Product>("Products").await.unwrap();
    loader.invalidate("Products");
    loader.load_default::<Product>("Products").await.unwrap();

    assert_eq!(store.read_count("Products"), 2);
  }

  #[tokio::test]
  async fn test_corrupt_cache_value_self_heals() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, cache) = loader(store.clone());
    cache.set(&cache_key("Products"), Arc::from(b"{not json".to_vec()), Duration::from_secs(60));

    let result = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap();

    assert!(!result.is_cached());
    assert_eq!(result.data.len(), 2);
    assert_eq!(store.read_count("Products"), 1);
    // Repopulated with a decodable value
    assert!(loader.peek::<Product>("Products").is_some());
  }

  #[tokio::test]
  async fn test_cached_value_of_other_shape_falls_through() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, cache) = loader(store.clone());
    let wrong_shape = serde_json::to_vec(&json!([{"ColorName": "Red"}])).unwrap();
    cache.set(&cache_key("Products"), Arc::from(wrong_shape), Duration::from_secs(60));

    let result = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap();

    assert_eq!(result.data[0].product_name, "Serum");
    assert_eq!(store.read_count("Products"), 1);
  }

  #[tokio::test]
  async fn test_live_decode_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", json!([{"Price": "free"}])));
    let (loader, cache) = loader(store);

    let err = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidResponse(m) if m.contains("Products")));
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_remote_failure_propagates_and_caches_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.fail_reads("Products", StoreError::Transport("connection refused".into()));
    let (loader, cache) = loader(store);

    let err = loader.load::<Product>("Products", Duration::from_secs(60)).await.unwrap_err();

    assert_eq!(err, StoreError::Transport("connection refused".into()));
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_typed_and_untyped_reads_share_cache_entry() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let (loader, _) = loader(store.clone());

    loader.load_default::<Product>("Products").await.unwrap();
    let rows: Vec<SheetRow> = loader.load_default("Products").await.unwrap();

    assert_eq!(rows[0]["ProductName"], "Serum");
    assert_eq!(store.read_count("Products"), 1);
  }

  #[tokio::test]
  async fn test_disabled_cache_always_reads_remote() {
    let store = Arc::new(MemoryStore::new().with_sheet("Products", products()));
    let loader = DatasetLoader::new(store.clone(), Arc::new(NoopStorage), TtlPolicy::default());

    loader.load_default::<Product>("Products").await.unwrap();
    loader.load_default::<Product>("Products").await.unwrap();

    assert_eq!(store.read_count("Products"), 2);
  }

  #[test]
  fn test_default_policy_caches_lookup_data_longer() {
    let policy = TtlPolicy::default();
    assert_eq!(policy.ttl_for(USERS_SHEET), Duration::from_secs(900));
    assert_eq!(policy.ttl_for("TelegramTemplates"), Duration::from_secs(3600));
    assert_eq!(policy.ttl_for("AllOrders"), Duration::from_secs(300));
  }
}
