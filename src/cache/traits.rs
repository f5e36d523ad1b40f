//! Core traits and types for the query cache.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Trait for keys that address one cache slot.
///
/// Implementors describe a read endpoint plus its filter parameters.
/// Two keys that are structurally equal must produce the same hash,
/// independent of how their parameters were assembled.
pub trait QueryKey {
  /// Stable resource kind for kind-wide invalidation (e.g. "customers").
  fn resource_kind(&self) -> &'static str;

  /// Stable, fixed-length cache slot identifier.
  fn cache_hash(&self) -> String;

  /// Human-readable form for logs and the persisted snapshot.
  fn description(&self) -> String;
}

/// Hash a resource kind plus filter parameters into a slot identifier.
///
/// Parameters are folded in sorted order (BTreeMap iteration), so two
/// parameter sets that are deeply equal hash identically regardless of
/// insertion order. Each component is length-prefixed, so a value
/// containing separator characters cannot collide with a differently
/// split parameter set.
pub fn hash_key(kind: &str, params: &BTreeMap<&str, String>) -> String {
  let mut hasher = Sha256::new();
  hash_component(&mut hasher, kind);
  for (name, value) in params {
    hash_component(&mut hasher, name);
    hash_component(&mut hasher, value);
  }
  hex::encode(hasher.finalize())
}

fn hash_component(hasher: &mut Sha256, component: &str) {
  hasher.update((component.len() as u64).to_be_bytes());
  hasher.update(component.as_bytes());
}

/// Result from a cached read, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh data straight from the network.
  pub fn network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: None,
    }
  }

  /// Cached data within the staleness window.
  pub fn fresh(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Fresh,
      fetched_at: Some(fetched_at),
    }
  }

  /// Cached data past the staleness window; a background revalidation
  /// has been started.
  pub fn stale(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Stale,
      fetched_at: Some(fetched_at),
    }
  }
}

/// Indicates where a read result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the network for this read
  Network,
  /// Served from cache, within the staleness window
  Fresh,
  /// Served from cache past the staleness window, revalidating in background
  Stale,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hash_ignores_insertion_order() {
    let mut a = BTreeMap::new();
    a.insert("search", "alpha".to_string());
    a.insert("page", "1".to_string());
    a.insert("limit", "10".to_string());

    let mut b = BTreeMap::new();
    b.insert("limit", "10".to_string());
    b.insert("page", "1".to_string());
    b.insert("search", "alpha".to_string());

    assert_eq!(hash_key("customers", &a), hash_key("customers", &b));
  }

  #[test]
  fn test_hash_distinguishes_values_and_kinds() {
    let mut a = BTreeMap::new();
    a.insert("page", "1".to_string());
    let mut b = BTreeMap::new();
    b.insert("page", "2".to_string());

    assert_ne!(hash_key("customers", &a), hash_key("customers", &b));
    assert_ne!(hash_key("customers", &a), hash_key("services", &a));
  }

  #[test]
  fn test_hash_is_unambiguous_across_parameter_splits() {
    // One value containing separator characters must not collide with
    // the same bytes split across two parameters.
    let mut joined = BTreeMap::new();
    joined.insert("a", "1:b=2".to_string());

    let mut split = BTreeMap::new();
    split.insert("a", "1".to_string());
    split.insert("b", "2".to_string());

    assert_ne!(hash_key("customers", &joined), hash_key("customers", &split));
  }
}
