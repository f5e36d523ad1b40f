//! Query cache that deduplicates reads, tracks staleness, and reconciles
//! mutations.
//!
//! Slots hold materialized JSON values keyed by query-key hash. Concurrent
//! reads of the same key share one in-flight fetch; stale hits are served
//! immediately while one background revalidation runs; mutations patch a
//! slot directly or invalidate it so the next read refetches.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::storage::{CacheStore, PersistedSlot};
use super::traits::{CacheResult, QueryKey};
use crate::error::{Error, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

/// One cached query result plus its metadata.
struct Slot {
  value: Value,
  fetched_at: DateTime<Utc>,
  /// Generation of the fetch that produced `value`. A completion with an
  /// older generation must not overwrite a newer value.
  generation: u64,
  /// Set by mutations; the next read treats the slot as a miss.
  invalidated: bool,
  kind: String,
  description: String,
  /// When the observer count last dropped to zero (the GC window counts
  /// from here).
  released_at: DateTime<Utc>,
}

struct Inner {
  slots: HashMap<String, Slot>,
  in_flight: HashMap<String, SharedFetch>,
  /// Per-key fetch issue counter; generations are monotonic per key.
  issued: HashMap<String, u64>,
  /// Active observer counts per key.
  observers: HashMap<String, usize>,
}

/// The query cache. Cheap to clone; all clones share one slot map.
pub struct QueryCache<S: CacheStore> {
  inner: Arc<Mutex<Inner>>,
  store: Arc<S>,
  stale_after: Duration,
  gc_after: Duration,
}

impl<S: CacheStore> QueryCache<S> {
  /// Create a cache over the given snapshot store and rehydrate it from
  /// the previous run's snapshot. A failed rehydrate starts empty.
  pub fn new(store: S, stale_after: Duration, gc_after: Duration) -> Self {
    let mut slots = HashMap::new();
    match store.load_all() {
      Ok(persisted) => {
        for p in persisted {
          slots.insert(
            p.hash.clone(),
            Slot {
              value: p.value,
              fetched_at: p.fetched_at,
              generation: 0,
              invalidated: false,
              kind: p.kind,
              description: p.description,
              released_at: p.fetched_at,
            },
          );
        }
      }
      Err(e) => warn!("failed to rehydrate cache snapshot: {}", e),
    }

    Self {
      inner: Arc::new(Mutex::new(Inner {
        slots,
        in_flight: HashMap::new(),
        issued: HashMap::new(),
        observers: HashMap::new(),
      })),
      store: Arc::new(store),
      stale_after,
      gc_after,
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
    self
      .inner
      .lock()
      .map_err(|_| Error::Storage("cache lock poisoned".to_string()))
  }

  /// Read through the cache.
  ///
  /// 1. Fresh hit: cached value, no network call.
  /// 2. Stale hit: cached value immediately, one deduplicated background
  ///    revalidation.
  /// 3. Miss or invalidated: join the in-flight fetch for this key, or
  ///    start one, and await it.
  ///
  /// The fetcher performs exactly one network call when invoked; it must
  /// not touch the cache itself.
  pub async fn fetch<K, T, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>>
  where
    K: QueryKey + ?Sized,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    self.sweep();

    let hash = key.cache_hash();
    let now = Utc::now();

    let shared = {
      let mut inner = self.lock()?;

      let cached = inner.slots.get(&hash).filter(|s| !s.invalidated).map(|s| {
        (s.value.clone(), s.fetched_at)
      });

      if let Some((value, fetched_at)) = cached {
        if now - fetched_at <= self.stale_after {
          debug!(key = %key.description(), "cache hit (fresh)");
          return decode(&value).map(|data| CacheResult::fresh(data, fetched_at));
        }

        // Stale: serve the cached value now, revalidate in the background.
        if !inner.in_flight.contains_key(&hash) {
          let revalidation = self.begin_fetch(&mut inner, &hash, key, fetcher());
          tokio::spawn(revalidation);
        }
        debug!(key = %key.description(), "cache hit (stale), revalidating");
        return decode(&value).map(|data| CacheResult::stale(data, fetched_at));
      }

      // Miss or invalidated: share the in-flight fetch if one exists.
      match inner.in_flight.get(&hash) {
        Some(existing) => existing.clone(),
        None => {
          debug!(key = %key.description(), "cache miss, fetching");
          self.begin_fetch(&mut inner, &hash, key, fetcher())
        }
      }
    };

    let value = shared.await?;
    decode(&value).map(CacheResult::network)
  }

  /// Register an in-flight fetch for `hash` and return the shared handle.
  ///
  /// The driver applies the result on completion: it removes the in-flight
  /// entry, installs the slot if its generation is still the newest, and
  /// writes the snapshot through. A failed fetch leaves the slot untouched.
  fn begin_fetch<K, T, Fut>(&self, inner: &mut Inner, hash: &str, key: &K, fut: Fut) -> SharedFetch
  where
    K: QueryKey + ?Sized,
    T: Serialize + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let generation = {
      let counter = inner.issued.entry(hash.to_string()).or_insert(0);
      *counter += 1;
      *counter
    };

    let shared_inner = Arc::clone(&self.inner);
    let store = Arc::clone(&self.store);
    let flight_key = hash.to_string();
    let hash = flight_key.clone();
    let kind = key.resource_kind().to_string();
    let description = key.description();

    let driver = async move {
      let result = fut
        .await
        .and_then(|data| serde_json::to_value(data).map_err(|e| Error::Decode(e.to_string())));

      let mut inner = shared_inner
        .lock()
        .map_err(|_| Error::Storage("cache lock poisoned".to_string()))?;
      inner.in_flight.remove(&hash);

      let value = match result {
        Ok(value) => value,
        Err(e) => {
          debug!(key = %description, "fetch failed: {}", e);
          return Err(e);
        }
      };

      let applied = inner.slots.get(&hash).map(|s| s.generation).unwrap_or(0);
      if generation <= applied {
        // A newer fetch already landed; do not overwrite it.
        debug!(key = %description, "discarding superseded response");
        return Ok(value);
      }

      let now = Utc::now();
      let released_at = inner.slots.get(&hash).map(|s| s.released_at).unwrap_or(now);
      inner.slots.insert(
        hash.clone(),
        Slot {
          value: value.clone(),
          fetched_at: now,
          generation,
          invalidated: false,
          kind: kind.clone(),
          description: description.clone(),
          released_at,
        },
      );
      drop(inner);

      // Write-through is best effort; a storage failure never fails a read.
      let persisted = PersistedSlot {
        hash,
        kind,
        description,
        value: value.clone(),
        fetched_at: now,
      };
      if let Err(e) = store.persist(&persisted) {
        warn!("cache write-through failed: {}", e);
      }

      Ok(value)
    };

    let shared: SharedFetch = driver.boxed().shared();
    inner.in_flight.insert(flight_key, shared.clone());
    shared
  }

  /// Overwrite one slot with a server-returned value (the targeted-patch
  /// reconciliation after a mutation).
  pub fn put<K, T>(&self, key: &K, value: &T) -> Result<()>
  where
    K: QueryKey + ?Sized,
    T: Serialize,
  {
    let hash = key.cache_hash();
    let json = serde_json::to_value(value).map_err(|e| Error::Decode(e.to_string()))?;
    let now = Utc::now();

    let persisted = {
      let mut inner = self.lock()?;

      let generation = {
        let counter = inner.issued.entry(hash.clone()).or_insert(0);
        *counter += 1;
        *counter
      };

      let released_at = inner.slots.get(&hash).map(|s| s.released_at).unwrap_or(now);
      inner.slots.insert(
        hash.clone(),
        Slot {
          value: json.clone(),
          fetched_at: now,
          generation,
          invalidated: false,
          kind: key.resource_kind().to_string(),
          description: key.description(),
          released_at,
        },
      );

      PersistedSlot {
        hash,
        kind: key.resource_kind().to_string(),
        description: key.description(),
        value: json,
        fetched_at: now,
      }
    };

    if let Err(e) = self.store.persist(&persisted) {
      warn!("cache write-through failed: {}", e);
    }

    Ok(())
  }

  /// Mark one key's slot so the next read refetches.
  pub fn invalidate<K: QueryKey + ?Sized>(&self, key: &K) -> Result<()> {
    let hash = key.cache_hash();
    self.invalidate_hashes(std::iter::once(hash))
  }

  /// Mark every slot of a resource kind so the next reads refetch. Used by
  /// list-affecting mutations (create/delete/partial update).
  pub fn invalidate_kind(&self, kind: &str) -> Result<()> {
    let hashes: Vec<String> = {
      let inner = self.lock()?;
      inner
        .slots
        .iter()
        .filter(|(_, s)| s.kind == kind)
        .map(|(h, _)| h.clone())
        .collect()
    };
    debug!(kind, count = hashes.len(), "invalidating resource kind");
    self.invalidate_hashes(hashes.into_iter())
  }

  fn invalidate_hashes(&self, hashes: impl Iterator<Item = String>) -> Result<()> {
    let mut marked = Vec::new();
    {
      let mut inner = self.lock()?;
      for hash in hashes {
        if let Some(slot) = inner.slots.get_mut(&hash) {
          slot.invalidated = true;
          marked.push(hash);
        }
      }
    }

    // An invalidated slot must not be rehydrated as fresh on restart.
    for hash in &marked {
      if let Err(e) = self.store.remove(hash) {
        warn!("failed to drop invalidated slot from snapshot: {}", e);
      }
    }

    Ok(())
  }

  /// Register an observer for a key. The returned handle keeps the slot
  /// alive; the GC window starts when the last handle drops.
  pub fn observe<K: QueryKey + ?Sized>(&self, key: &K) -> ObserverHandle {
    let hash = key.cache_hash();
    if let Ok(mut inner) = self.inner.lock() {
      *inner.observers.entry(hash.clone()).or_insert(0) += 1;
    }
    ObserverHandle {
      inner: Arc::clone(&self.inner),
      hash,
    }
  }

  /// Evict slots with zero observers whose last release is older than the
  /// GC window. Runs lazily on every read; public for explicit maintenance.
  /// Returns the number of evicted slots.
  pub fn sweep(&self) -> usize {
    let now = Utc::now();
    let evicted: Vec<String> = {
      let mut inner = match self.inner.lock() {
        Ok(guard) => guard,
        Err(_) => return 0,
      };

      let gc_after = self.gc_after;
      let expired: Vec<String> = inner
        .slots
        .iter()
        .filter(|(hash, slot)| {
          let observed = inner.observers.get(*hash).copied().unwrap_or(0) > 0;
          let idle_since = slot.released_at.max(slot.fetched_at);
          !observed && now - idle_since > gc_after
        })
        .map(|(hash, _)| hash.clone())
        .collect();

      for hash in &expired {
        inner.slots.remove(hash);
        inner.issued.remove(hash);
      }
      expired
    };

    for hash in &evicted {
      debug!(%hash, "evicted cache slot");
      if let Err(e) = self.store.remove(hash) {
        warn!("failed to drop evicted slot from snapshot: {}", e);
      }
    }

    evicted.len()
  }

  /// Drop every slot and the persisted snapshot.
  pub fn clear(&self) -> Result<()> {
    {
      let mut inner = self.lock()?;
      inner.slots.clear();
      inner.issued.clear();
    }
    self.store.clear()
  }

  /// Number of live slots.
  pub fn len(&self) -> usize {
    self.inner.lock().map(|inner| inner.slots.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<S: CacheStore> Clone for QueryCache<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      store: Arc::clone(&self.store),
      stale_after: self.stale_after,
      gc_after: self.gc_after,
    }
  }
}

/// RAII observer registration. Dropping the handle decrements the slot's
/// observer count and restarts its GC window when the count reaches zero.
pub struct ObserverHandle {
  inner: Arc<Mutex<Inner>>,
  hash: String,
}

impl Drop for ObserverHandle {
  fn drop(&mut self) {
    if let Ok(mut inner) = self.inner.lock() {
      let remaining = match inner.observers.get_mut(&self.hash) {
        Some(count) => {
          *count = count.saturating_sub(1);
          *count
        }
        None => return,
      };
      if remaining == 0 {
        inner.observers.remove(&self.hash);
        if let Some(slot) = inner.slots.get_mut(&self.hash) {
          slot.released_at = Utc::now();
        }
      }
    }
  }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
  serde_json::from_value(value.clone()).map_err(|e| Error::Decode(e.to_string()))
}
