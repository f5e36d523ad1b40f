//! Cached API client that wraps HttpClient with the query cache.
//!
//! Reads go through the cache keyed by [`ApiQueryKey`]. Mutations execute
//! exactly one write and then reconcile the cache: content updates patch
//! the affected slot with the server-returned value, list-affecting
//! operations invalidate their resource kind so the next read refetches.
//! A failed mutation touches nothing.

use chrono::Duration;

use super::client::HttpClient;
use super::keys::ApiQueryKey;
use super::types::{
  Attachment, BrandPartner, BrandPartnerDraft, Customer, Faq, FaqDraft, HeroContent, HeroUpdate,
  InventoryItem, Page, Service, ServiceDraft, ServiceUpdate,
};
use crate::cache::{CacheStore, NoopStore, QueryCache, SqliteStore};
use crate::config::Config;
use crate::error::Result;

/// API client with transparent caching.
///
/// Provides the same read surface as [`HttpClient`] but serves repeated
/// reads from the cache and keeps the cache consistent across writes.
#[derive(Clone)]
pub struct CachedApiClient {
  inner: HttpClient,
  cache: QueryCache<Box<dyn CacheStore>>,
}

impl CachedApiClient {
  /// Build a client from config: SQLite-persisted cache by default, a
  /// no-op store when `cache.disabled` is set.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = HttpClient::new(config)?;
    let store: Box<dyn CacheStore> = if config.cache.disabled {
      Box::new(NoopStore)
    } else {
      Box::new(SqliteStore::open()?)
    };
    let cache = QueryCache::new(
      store,
      Duration::seconds(config.cache.stale_secs as i64),
      Duration::seconds(config.cache.effective_gc_secs() as i64),
    );

    Ok(Self { inner, cache })
  }

  /// Access the underlying cache (maintenance commands, tests).
  pub fn cache(&self) -> &QueryCache<Box<dyn CacheStore>> {
    &self.cache
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn list_customers(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<Customer>> {
    let key = ApiQueryKey::Customers {
      search: search.map(String::from),
      page,
      limit,
    };
    let inner = self.inner.clone();
    let search = search.map(String::from);

    let result = self
      .cache
      .fetch(&key, move || async move {
        inner.list_customers(search.as_deref(), page, limit).await
      })
      .await?;
    Ok(result.data)
  }

  pub async fn get_customer(&self, id: &str) -> Result<Customer> {
    let key = ApiQueryKey::CustomerDetail { id: id.to_string() };
    let inner = self.inner.clone();
    let id = id.to_string();

    let result = self
      .cache
      .fetch(&key, move || async move { inner.get_customer(&id).await })
      .await?;
    Ok(result.data)
  }

  pub async fn list_services(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<Service>> {
    let key = ApiQueryKey::Services {
      search: search.map(String::from),
      page,
      limit,
    };
    let inner = self.inner.clone();
    let search = search.map(String::from);

    let result = self
      .cache
      .fetch(&key, move || async move {
        inner.list_services(search.as_deref(), page, limit).await
      })
      .await?;
    Ok(result.data)
  }

  pub async fn hero(&self) -> Result<HeroContent> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch(&ApiQueryKey::Hero, move || async move { inner.hero().await })
      .await?;
    Ok(result.data)
  }

  pub async fn brand_partners(&self) -> Result<Vec<BrandPartner>> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch(&ApiQueryKey::BrandPartners, move || async move {
        inner.brand_partners().await
      })
      .await?;
    Ok(result.data)
  }

  pub async fn faqs(&self) -> Result<Vec<Faq>> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch(&ApiQueryKey::Faqs, move || async move { inner.faqs().await })
      .await?;
    Ok(result.data)
  }

  pub async fn list_inventory(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<InventoryItem>> {
    let key = ApiQueryKey::Inventory {
      search: search.map(String::from),
      page,
      limit,
    };
    let inner = self.inner.clone();
    let search = search.map(String::from);

    let result = self
      .cache
      .fetch(&key, move || async move {
        inner.list_inventory(search.as_deref(), page, limit).await
      })
      .await?;
    Ok(result.data)
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Delete a customer, then invalidate every cached customer read.
  pub async fn delete_customer(&self, id: &str) -> Result<()> {
    self.inner.delete_customer(id).await?;
    self.cache.invalidate_kind("customers")?;
    Ok(())
  }

  pub async fn create_service(
    &self,
    draft: &ServiceDraft,
    image: Option<&Attachment>,
  ) -> Result<Service> {
    let service = self.inner.create_service(draft, image).await?;
    self.cache.invalidate_kind("services")?;
    Ok(service)
  }

  pub async fn update_service(&self, id: &str, update: &ServiceUpdate) -> Result<Service> {
    let service = self.inner.update_service(id, update).await?;
    self.cache.invalidate_kind("services")?;
    Ok(service)
  }

  pub async fn delete_service(&self, id: &str) -> Result<()> {
    self.inner.delete_service(id).await?;
    self.cache.invalidate_kind("services")?;
    Ok(())
  }

  /// Update the hero section. The server returns the stored content, so
  /// the cached slot is patched directly instead of invalidated.
  pub async fn update_hero(
    &self,
    update: &HeroUpdate,
    image: Option<&Attachment>,
  ) -> Result<HeroContent> {
    let hero = self.inner.update_hero(update, image).await?;
    self.cache.put(&ApiQueryKey::Hero, &hero)?;
    Ok(hero)
  }

  /// Replace the brand partner list; patches the cached slot with the
  /// server-returned list.
  pub async fn update_brand_partners(
    &self,
    partners: &[BrandPartnerDraft],
  ) -> Result<Vec<BrandPartner>> {
    let stored = self.inner.update_brand_partners(partners).await?;
    self.cache.put(&ApiQueryKey::BrandPartners, &stored)?;
    Ok(stored)
  }

  pub async fn create_faq(&self, draft: &FaqDraft) -> Result<Faq> {
    let faq = self.inner.create_faq(draft).await?;
    self.cache.invalidate(&ApiQueryKey::Faqs)?;
    Ok(faq)
  }

  pub async fn delete_faq(&self, id: &str) -> Result<()> {
    self.inner.delete_faq(id).await?;
    self.cache.invalidate(&ApiQueryKey::Faqs)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  //! Scenario tests for read/mutation cache reconciliation, using fake
  //! backends at the cache boundary.

  use super::*;
  use crate::cache::CacheSource;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  fn test_cache() -> QueryCache<Box<dyn CacheStore>> {
    QueryCache::new(
      Box::new(NoopStore) as Box<dyn CacheStore>,
      Duration::minutes(5),
      Duration::minutes(10),
    )
  }

  fn customer(id: &str, name: &str) -> Customer {
    Customer {
      id: id.to_string(),
      name: name.to_string(),
      email: format!("{}@example.com", id),
      phone: None,
      company: None,
    }
  }

  #[tokio::test]
  async fn test_list_with_search_pages_are_separate_slots() {
    let cache = test_cache();
    let requests = Arc::new(AtomicU32::new(0));

    let backend = |page: u32| {
      let requests = requests.clone();
      move || {
        let requests = requests.clone();
        async move {
          requests.fetch_add(1, Ordering::SeqCst);
          let items = match page {
            1 => vec![customer("u1", "Alpha One"), customer("u2", "Alpha Two"), customer("u3", "Alpha Three")],
            _ => vec![customer("u4", "Alpha Four")],
          };
          Ok(Page { items, page, total_pages: 2 })
        }
      }
    };

    let key_p1 = ApiQueryKey::Customers {
      search: Some("alpha".to_string()),
      page: 1,
      limit: 10,
    };
    let page1 = cache.fetch(&key_p1, backend(1)).await.unwrap();
    assert_eq!(page1.data.items.len(), 3);
    assert_eq!(page1.data.page, 1);
    assert_eq!(page1.data.total_pages, 2);
    assert_eq!(requests.load(Ordering::SeqCst), 1);

    // Same search, next page: a new request replaces the visible rows.
    let key_p2 = ApiQueryKey::Customers {
      search: Some("alpha".to_string()),
      page: 2,
      limit: 10,
    };
    let page2 = cache.fetch(&key_p2, backend(2)).await.unwrap();
    assert_eq!(page2.data.items.len(), 1);
    assert_eq!(page2.data.page, 2);
    assert_eq!(requests.load(Ordering::SeqCst), 2);

    // Going back to page 1 inside the staleness window is a cache hit.
    let again = cache.fetch(&key_p1, backend(1)).await.unwrap();
    assert_eq!(again.source, CacheSource::Fresh);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_delete_then_list_refetches_without_deleted_row() {
    let cache = test_cache();
    let key = ApiQueryKey::Customers {
      search: None,
      page: 1,
      limit: 10,
    };

    // Initial list contains u2.
    let before = cache
      .fetch(&key, || async {
        Ok(Page {
          items: vec![customer("u1", "One"), customer("u2", "Two")],
          page: 1,
          total_pages: 1,
        })
      })
      .await
      .unwrap();
    assert!(before.data.items.iter().any(|c| c.id == "u2"));

    // The delete mutation invalidates the customers kind.
    cache.invalidate_kind("customers").unwrap();

    // Next read must hit the backend, which no longer returns u2.
    let after = cache
      .fetch(&key, || async {
        Ok(Page {
          items: vec![customer("u1", "One")],
          page: 1,
          total_pages: 1,
        })
      })
      .await
      .unwrap();
    assert_eq!(after.source, CacheSource::Network);
    assert!(!after.data.items.iter().any(|c| c.id == "u2"));
  }

  #[tokio::test]
  async fn test_hero_update_patches_cached_content() {
    let cache = test_cache();

    cache
      .fetch(&ApiQueryKey::Hero, || async {
        Ok(HeroContent {
          heading: "Old heading".to_string(),
          subheading: "Old subheading".to_string(),
          image_url: None,
        })
      })
      .await
      .unwrap();

    // The mutation returns the stored content; patch the slot directly.
    let stored = HeroContent {
      heading: "New heading".to_string(),
      subheading: "New subheading".to_string(),
      image_url: Some("https://cdn.example.com/hero.png".to_string()),
    };
    cache.put(&ApiQueryKey::Hero, &stored).unwrap();

    let result = cache
      .fetch(&ApiQueryKey::Hero, || async {
        Err::<HeroContent, _>(crate::error::Error::Network(
          "patched slot must not refetch".to_string(),
        ))
      })
      .await
      .unwrap();
    assert_eq!(result.data, stored);
    assert_eq!(result.source, CacheSource::Fresh);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_list_cached() {
    let cache = test_cache();
    let key = ApiQueryKey::Faqs;

    let faqs = vec![Faq {
      id: "f1".to_string(),
      question: "How do I get a quote?".to_string(),
      answer: "Use the quotation form.".to_string(),
    }];
    let seeded = faqs.clone();
    cache
      .fetch(&key, move || async move { Ok(seeded) })
      .await
      .unwrap();

    // A failed write performs no reconciliation, so the next read is
    // still a fresh hit with the pre-mutation value.
    let result = cache
      .fetch(&key, || async {
        Err::<Vec<Faq>, _>(crate::error::Error::Network(
          "cached slot must not refetch".to_string(),
        ))
      })
      .await
      .unwrap();
    assert_eq!(result.data, faqs);
    assert_eq!(result.source, CacheSource::Fresh);
  }
}
