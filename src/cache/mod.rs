//! Dataset caching.
//!
//! This module provides:
//! - A generic in-memory TTL cache with lazy expiry
//! - A dataset loader that serves reads from the cache and fetches through
//!   to the remote store on a miss
//! - Per-dataset TTLs through an injected policy

mod layer;
mod storage;
mod traits;

pub use layer::{cache_key, DatasetLoader, TtlPolicy, CACHE_KEY_PREFIX};
pub use storage::{CacheEntry, CacheStorage, NoopStorage, Payload, TtlCache};
pub use traits::{CacheResult, CacheSource, Cacheable};
