//! Client-side query cache.
//!
//! This module provides the resource cache sitting between callers and the
//! REST backend:
//! - one cache slot per query key (resource kind + filter parameters)
//! - concurrent reads of one key share a single in-flight fetch
//! - staleness window for silent background revalidation, GC window for
//!   eviction of unobserved slots
//! - mutation reconciliation via targeted patch or invalidation
//! - SQLite write-through snapshot so the cache survives restarts

mod layer;
mod storage;
mod traits;

pub use layer::{ObserverHandle, QueryCache};
pub use storage::{CacheStore, NoopStore, PersistedSlot, SqliteStore};
pub use traits::{hash_key, CacheResult, CacheSource, QueryKey};
