//! Command handlers: each subcommand maps to one cached-client call and
//! prints a plain-text result.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::Path;

use crate::api::types::{
  Attachment, BrandPartnerDraft, FaqDraft, HeroUpdate, Page, ServiceDraft, ServiceUpdate,
};
use crate::api::CachedApiClient;
use crate::error::Error;

pub struct App {
  client: CachedApiClient,
}

impl App {
  pub fn new(client: CachedApiClient) -> Self {
    Self { client }
  }

  // ==========================================================================
  // Customers
  // ==========================================================================

  pub async fn customers_list(&self, search: Option<&str>, page: u32, limit: u32) -> Result<()> {
    let result = self
      .client
      .list_customers(search, page, limit)
      .await
      .map_err(report)?;

    if result.items.is_empty() {
      println!("No customers found.");
    }
    for customer in &result.items {
      let company = customer.company.as_deref().unwrap_or("-");
      println!("{:<26} {:<24} {:<28} {}", customer.id, customer.name, customer.email, company);
    }
    println!("{}", page_indicator(&result));
    Ok(())
  }

  pub async fn customers_show(&self, id: &str) -> Result<()> {
    let customer = self.client.get_customer(id).await.map_err(report)?;
    println!("id:      {}", customer.id);
    println!("name:    {}", customer.name);
    println!("email:   {}", customer.email);
    println!("phone:   {}", customer.phone.as_deref().unwrap_or("-"));
    println!("company: {}", customer.company.as_deref().unwrap_or("-"));
    Ok(())
  }

  pub async fn customers_delete(&self, id: &str) -> Result<()> {
    self.client.delete_customer(id).await.map_err(report)?;
    println!("Deleted customer {}.", id);
    Ok(())
  }

  // ==========================================================================
  // Services
  // ==========================================================================

  pub async fn services_list(&self, search: Option<&str>, page: u32, limit: u32) -> Result<()> {
    let result = self
      .client
      .list_services(search, page, limit)
      .await
      .map_err(report)?;

    if result.items.is_empty() {
      println!("No services found.");
    }
    for service in &result.items {
      println!(
        "{:<26} {:<30} {:<16} {:.2}",
        service.id, service.title, service.category, service.price
      );
    }
    println!("{}", page_indicator(&result));
    Ok(())
  }

  pub async fn services_create(
    &self,
    title: String,
    category: String,
    description: String,
    price: f64,
    image: Option<&Path>,
  ) -> Result<()> {
    let attachment = load_attachment(image)?;
    let draft = ServiceDraft {
      title,
      category,
      description,
      price,
    };
    let service = self
      .client
      .create_service(&draft, attachment.as_ref())
      .await
      .map_err(report)?;
    println!("Created service {} ({}).", service.title, service.id);
    Ok(())
  }

  pub async fn services_update(&self, id: &str, update: ServiceUpdate) -> Result<()> {
    let service = self.client.update_service(id, &update).await.map_err(report)?;
    println!("Updated service {} ({}).", service.title, service.id);
    Ok(())
  }

  pub async fn services_delete(&self, id: &str) -> Result<()> {
    self.client.delete_service(id).await.map_err(report)?;
    println!("Deleted service {}.", id);
    Ok(())
  }

  // ==========================================================================
  // Website content
  // ==========================================================================

  pub async fn content_hero(&self) -> Result<()> {
    let hero = self.client.hero().await.map_err(report)?;
    println!("heading:    {}", hero.heading);
    println!("subheading: {}", hero.subheading);
    println!("image:      {}", hero.image_url.as_deref().unwrap_or("-"));
    Ok(())
  }

  pub async fn content_set_hero(
    &self,
    heading: String,
    subheading: String,
    image: Option<&Path>,
  ) -> Result<()> {
    let attachment = load_attachment(image)?;
    let update = HeroUpdate { heading, subheading };
    let hero = self
      .client
      .update_hero(&update, attachment.as_ref())
      .await
      .map_err(report)?;
    println!("Hero updated: {}", hero.heading);
    Ok(())
  }

  pub async fn content_partners(&self) -> Result<()> {
    let partners = self.client.brand_partners().await.map_err(report)?;
    if partners.is_empty() {
      println!("No brand partners.");
    }
    for partner in &partners {
      println!("{:<26} {}", partner.id, partner.name);
    }
    Ok(())
  }

  /// Replace the brand partner list from a JSON file containing
  /// `[{"name": "...", "logo_url": "..."}]` entries.
  pub async fn content_set_partners(&self, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("failed to read {}: {}", path.display(), e))?;
    let drafts: Vec<BrandPartnerDraft> = serde_json::from_str(&contents)
      .map_err(|e| eyre!("invalid partner list in {}: {}", path.display(), e))?;

    let stored = self
      .client
      .update_brand_partners(&drafts)
      .await
      .map_err(report)?;
    println!("Stored {} brand partners.", stored.len());
    Ok(())
  }

  pub async fn content_faqs(&self) -> Result<()> {
    let faqs = self.client.faqs().await.map_err(report)?;
    if faqs.is_empty() {
      println!("No FAQ entries.");
    }
    for faq in &faqs {
      println!("[{}] {}", faq.id, faq.question);
      println!("    {}", faq.answer);
    }
    Ok(())
  }

  pub async fn content_add_faq(&self, question: String, answer: String) -> Result<()> {
    let faq = self
      .client
      .create_faq(&FaqDraft { question, answer })
      .await
      .map_err(report)?;
    println!("Created FAQ {}.", faq.id);
    Ok(())
  }

  pub async fn content_remove_faq(&self, id: &str) -> Result<()> {
    self.client.delete_faq(id).await.map_err(report)?;
    println!("Deleted FAQ {}.", id);
    Ok(())
  }

  // ==========================================================================
  // Inventory
  // ==========================================================================

  pub async fn inventory_list(&self, search: Option<&str>, page: u32, limit: u32) -> Result<()> {
    let result = self
      .client
      .list_inventory(search, page, limit)
      .await
      .map_err(report)?;

    if result.items.is_empty() {
      println!("No inventory items found.");
    }
    for item in &result.items {
      let location = item.location.as_deref().unwrap_or("-");
      println!(
        "{:<14} {:<30} {:>6} {:>10.2}  {}",
        item.sku, item.name, item.quantity, item.unit_price, location
      );
    }
    println!("{}", page_indicator(&result));
    Ok(())
  }

  // ==========================================================================
  // Cache maintenance
  // ==========================================================================

  pub fn cache_clear(&self) -> Result<()> {
    self.client.cache().clear().map_err(report)?;
    println!("Cache cleared.");
    Ok(())
  }
}

fn page_indicator<T>(page: &Page<T>) -> String {
  format!("Page {} of {}", page.page, page.total_pages)
}

fn load_attachment(path: Option<&Path>) -> Result<Option<Attachment>> {
  match path {
    Some(p) => Attachment::from_path(p)
      .map(Some)
      .map_err(|e| eyre!("failed to read attachment {}: {}", p.display(), e)),
    None => Ok(None),
  }
}

/// Convert a client error into a user-facing report. The server's message
/// is shown verbatim; a 401 gets a re-authentication hint.
fn report(err: Error) -> color_eyre::Report {
  match err {
    Error::Unauthorized => eyre!("{} - set OPSDESK_API_TOKEN and retry", Error::Unauthorized),
    other => eyre!(other),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_indicator_format() {
    let page = Page {
      items: vec![1, 2, 3],
      page: 1,
      total_pages: 2,
    };
    assert_eq!(page_indicator(&page), "Page 1 of 2");
  }

  #[test]
  fn test_report_adds_auth_hint() {
    let unauthorized = report(Error::Unauthorized);
    assert!(unauthorized.to_string().contains("OPSDESK_API_TOKEN"));

    let not_found = report(Error::Http {
      status: 404,
      message: "no such user".to_string(),
    });
    assert!(not_found.to_string().contains("no such user"));
  }
}
