//! Serde-deserializable types matching OpsDesk API responses.
//!
//! These types mirror the backend's wire contract and are separate from
//! the domain types so contract drift is caught at the parse boundary
//! instead of deep inside the application.

use serde::Deserialize;

use super::types::{BrandPartner, Customer, Faq, HeroContent, InventoryItem, Service};

/// The outer wrapper the backend puts around every response payload.
/// Exactly one level is unwrapped.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

/// Optional JSON body sent with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
}

// ============================================================================
// Customers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCustomer {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub phone: Option<String>,
  pub company: Option<String>,
}

impl From<ApiCustomer> for Customer {
  fn from(api: ApiCustomer) -> Self {
    Customer {
      id: api.id,
      name: api.name,
      email: api.email,
      phone: api.phone,
      company: api.company,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiCustomerList {
  #[serde(default)]
  pub users: Vec<ApiCustomer>,
  #[serde(rename = "totalPages", default)]
  pub total_pages: u32,
}

// ============================================================================
// Services
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiService {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub price: f64,
  #[serde(rename = "imageUrl")]
  pub image_url: Option<String>,
}

impl From<ApiService> for Service {
  fn from(api: ApiService) -> Self {
    Service {
      id: api.id,
      title: api.title,
      category: api.category,
      description: api.description,
      price: api.price,
      image_url: api.image_url,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiServiceList {
  #[serde(default)]
  pub services: Vec<ApiService>,
  #[serde(rename = "totalPages", default)]
  pub total_pages: u32,
}

// ============================================================================
// Website content
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiHeroContent {
  #[serde(default)]
  pub heading: String,
  #[serde(default)]
  pub subheading: String,
  #[serde(rename = "imageUrl")]
  pub image_url: Option<String>,
}

impl From<ApiHeroContent> for HeroContent {
  fn from(api: ApiHeroContent) -> Self {
    HeroContent {
      heading: api.heading,
      subheading: api.subheading,
      image_url: api.image_url,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiBrandPartner {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "logoUrl")]
  pub logo_url: Option<String>,
}

impl From<ApiBrandPartner> for BrandPartner {
  fn from(api: ApiBrandPartner) -> Self {
    BrandPartner {
      id: api.id,
      name: api.name,
      logo_url: api.logo_url,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiFaq {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub answer: String,
}

impl From<ApiFaq> for Faq {
  fn from(api: ApiFaq) -> Self {
    Faq {
      id: api.id,
      question: api.question,
      answer: api.answer,
    }
  }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiInventoryItem {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default)]
  pub sku: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub quantity: u32,
  #[serde(rename = "unitPrice", default)]
  pub unit_price: f64,
  pub location: Option<String>,
}

impl From<ApiInventoryItem> for InventoryItem {
  fn from(api: ApiInventoryItem) -> Self {
    InventoryItem {
      id: api.id,
      sku: api.sku,
      name: api.name,
      quantity: api.quantity,
      unit_price: api.unit_price,
      location: api.location,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiInventoryList {
  #[serde(default)]
  pub items: Vec<ApiInventoryItem>,
  #[serde(rename = "totalPages", default)]
  pub total_pages: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_envelope_unwraps_one_level() {
    let json = r#"{"data": {"users": [{"_id": "u1", "name": "Alpha", "email": "a@x.com"}], "totalPages": 2}}"#;
    let envelope: Envelope<ApiCustomerList> = serde_json::from_str(json).unwrap();

    assert_eq!(envelope.data.users.len(), 1);
    assert_eq!(envelope.data.users[0].id, "u1");
    assert_eq!(envelope.data.total_pages, 2);
  }

  #[test]
  fn test_customer_accepts_both_id_spellings() {
    let mongo: ApiCustomer =
      serde_json::from_str(r#"{"_id": "u1", "name": "A", "email": "a@x.com"}"#).unwrap();
    let plain: ApiCustomer =
      serde_json::from_str(r#"{"id": "u1", "name": "A", "email": "a@x.com"}"#).unwrap();

    assert_eq!(mongo.id, "u1");
    assert_eq!(plain.id, "u1");
  }

  #[test]
  fn test_error_body_message_is_optional() {
    let with: ApiErrorBody = serde_json::from_str(r#"{"message": "no such user"}"#).unwrap();
    let without: ApiErrorBody = serde_json::from_str(r#"{}"#).unwrap();

    assert_eq!(with.message.as_deref(), Some("no such user"));
    assert!(without.message.is_none());
  }
}
