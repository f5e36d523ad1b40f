//! Domain types for the OpsDesk back office.
//!
//! These are the shapes the rest of the crate works with; the wire shapes
//! the backend actually sends live in `api_types`. Everything here is
//! serde-serializable because cached values are stored as JSON.

use serde::{Deserialize, Serialize};

/// One page of a paginated list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// 1-based page number this page was requested with
  pub page: u32,
  pub total_pages: u32,
}

/// A customer record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
  pub id: String,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub company: Option<String>,
}

/// A catalog service/product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
  pub id: String,
  pub title: String,
  pub category: String,
  pub description: String,
  pub price: f64,
  pub image_url: Option<String>,
}

/// Payload for creating a service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDraft {
  pub title: String,
  pub category: String,
  pub description: String,
  pub price: f64,
}

/// Partial update for a service; None fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
}

/// Website hero section content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroContent {
  pub heading: String,
  pub subheading: String,
  pub image_url: Option<String>,
}

/// Payload for updating the hero section
#[derive(Debug, Clone, Serialize)]
pub struct HeroUpdate {
  pub heading: String,
  pub subheading: String,
}

/// A brand partner shown on the website
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandPartner {
  pub id: String,
  pub name: String,
  pub logo_url: Option<String>,
}

/// Payload for replacing the brand partner list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandPartnerDraft {
  pub name: String,
  pub logo_url: Option<String>,
}

/// A website FAQ entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faq {
  pub id: String,
  pub question: String,
  pub answer: String,
}

/// Payload for creating a FAQ entry
#[derive(Debug, Clone, Serialize)]
pub struct FaqDraft {
  pub question: String,
  pub answer: String,
}

/// A stock item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
  pub id: String,
  pub sku: String,
  pub name: String,
  pub quantity: u32,
  pub unit_price: f64,
  pub location: Option<String>,
}

/// A file attachment for a multipart mutation
#[derive(Debug, Clone)]
pub struct Attachment {
  pub file_name: String,
  pub bytes: Vec<u8>,
}

impl Attachment {
  /// Read an attachment from disk.
  pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
    let bytes = std::fs::read(path)?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "attachment".to_string());
    Ok(Self { file_name, bytes })
  }
}
