//! Query keys for OpsDesk API reads.

use std::collections::BTreeMap;

use crate::cache::{hash_key, QueryKey};

/// Query key types for OpsDesk API reads, one variant per read endpoint.
#[derive(Clone, Debug)]
pub enum ApiQueryKey {
  /// Paginated customer list
  Customers {
    search: Option<String>,
    page: u32,
    limit: u32,
  },
  /// A single customer by id
  CustomerDetail { id: String },
  /// Paginated service catalog
  Services {
    search: Option<String>,
    page: u32,
    limit: u32,
  },
  /// Website hero section
  Hero,
  /// Website brand partner list
  BrandPartners,
  /// Website FAQ list
  Faqs,
  /// Paginated inventory list
  Inventory {
    search: Option<String>,
    page: u32,
    limit: u32,
  },
}

impl ApiQueryKey {
  fn params(&self) -> BTreeMap<&'static str, String> {
    let mut params = BTreeMap::new();
    match self {
      Self::Customers { search, page, limit }
      | Self::Services { search, page, limit }
      | Self::Inventory { search, page, limit } => {
        // The search value is hashed verbatim: the backend decides
        // case and whitespace sensitivity, so distinct values must
        // address distinct slots.
        if let Some(s) = search {
          params.insert("search", s.clone());
        }
        params.insert("page", page.to_string());
        params.insert("limit", limit.to_string());
      }
      Self::CustomerDetail { id } => {
        params.insert("id", id.clone());
      }
      Self::Hero => {
        params.insert("section", "hero".to_string());
      }
      Self::BrandPartners => {
        params.insert("section", "brand-partners".to_string());
      }
      Self::Faqs => {
        params.insert("section", "faqs".to_string());
      }
    }
    params
  }
}

impl QueryKey for ApiQueryKey {
  fn resource_kind(&self) -> &'static str {
    match self {
      Self::Customers { .. } | Self::CustomerDetail { .. } => "customers",
      Self::Services { .. } => "services",
      Self::Hero | Self::BrandPartners | Self::Faqs => "content",
      Self::Inventory { .. } => "inventory",
    }
  }

  fn cache_hash(&self) -> String {
    hash_key(self.resource_kind(), &self.params())
  }

  fn description(&self) -> String {
    match self {
      Self::Customers { search, page, .. } => match search {
        Some(s) => format!("customers p{} \"{}\"", page, s),
        None => format!("customers p{}", page),
      },
      Self::CustomerDetail { id } => format!("customer {}", id),
      Self::Services { search, page, .. } => match search {
        Some(s) => format!("services p{} \"{}\"", page, s),
        None => format!("services p{}", page),
      },
      Self::Hero => "content: hero".to_string(),
      Self::BrandPartners => "content: brand partners".to_string(),
      Self::Faqs => "content: faqs".to_string(),
      Self::Inventory { search, page, .. } => match search {
        Some(s) => format!("inventory p{} \"{}\"", page, s),
        None => format!("inventory p{}", page),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_equal_keys_share_a_slot() {
    let a = ApiQueryKey::Customers {
      search: Some("alpha".to_string()),
      page: 1,
      limit: 10,
    };
    let b = ApiQueryKey::Customers {
      search: Some("alpha".to_string()),
      page: 1,
      limit: 10,
    };
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_search_value_is_hashed_verbatim() {
    let key = |search: &str| ApiQueryKey::Customers {
      search: Some(search.to_string()),
      page: 1,
      limit: 10,
    };

    // Case and whitespace are part of the value the backend sees, so
    // they are part of the slot identity too.
    assert_ne!(key("Alpha").cache_hash(), key("alpha").cache_hash());
    assert_ne!(key("alpha ").cache_hash(), key("alpha").cache_hash());
  }

  #[test]
  fn test_different_pages_get_different_slots() {
    let p1 = ApiQueryKey::Customers {
      search: None,
      page: 1,
      limit: 10,
    };
    let p2 = ApiQueryKey::Customers {
      search: None,
      page: 2,
      limit: 10,
    };
    assert_ne!(p1.cache_hash(), p2.cache_hash());
  }

  #[test]
  fn test_content_sections_are_distinct() {
    assert_ne!(ApiQueryKey::Hero.cache_hash(), ApiQueryKey::Faqs.cache_hash());
    assert_ne!(
      ApiQueryKey::Hero.cache_hash(),
      ApiQueryKey::BrandPartners.cache_hash()
    );
  }

  #[test]
  fn test_detail_key_shares_kind_with_list() {
    let list = ApiQueryKey::Customers {
      search: None,
      page: 1,
      limit: 10,
    };
    let detail = ApiQueryKey::CustomerDetail { id: "u1".to_string() };

    // A customer mutation invalidates both via the shared kind.
    assert_eq!(list.resource_kind(), detail.resource_kind());
    assert_ne!(list.cache_hash(), detail.cache_hash());
  }
}
