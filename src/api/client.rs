//! HTTP client and resource fetchers for the OpsDesk API.
//!
//! One method per endpoint; each performs exactly one request, unwraps the
//! `{data: ...}` envelope, and converts wire types to domain types. No
//! retries, no caching at this level.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::api_types::{
  ApiBrandPartner, ApiCustomer, ApiCustomerList, ApiErrorBody, ApiFaq, ApiHeroContent,
  ApiInventoryList, ApiService, ApiServiceList, Envelope,
};
use super::types::{
  Attachment, BrandPartner, BrandPartnerDraft, Customer, Faq, FaqDraft, HeroContent, HeroUpdate,
  InventoryItem, Page, Service, ServiceDraft, ServiceUpdate,
};
use crate::config::Config;
use crate::error::{Error, Result};

/// OpsDesk API client
#[derive(Clone)]
pub struct HttpClient {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
  timeout_secs: u64,
}

impl HttpClient {
  pub fn new(config: &Config) -> Result<Self> {
    // A trailing slash makes Url::join treat the last path segment as a
    // directory instead of replacing it.
    let mut base_url = config.api.base_url.clone();
    if !base_url.ends_with('/') {
      base_url.push('/');
    }
    let base = Url::parse(&base_url)
      .map_err(|e| Error::Config(format!("invalid api.base_url: {}", e)))?;

    let http = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base,
      token: Config::api_token(),
      timeout_secs: config.api.timeout_secs,
    })
  }

  fn url(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| Error::Config(format!("invalid request path '{}': {}", path, e)))
  }

  fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Send a request and surface transport/HTTP failures as [`Error`].
  /// A 401 is the re-authenticate signal and maps to `Unauthorized`.
  async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = self
      .authorize(builder)
      .send()
      .await
      .map_err(|e| Error::from_reqwest(e, self.timeout_secs))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      return Err(Error::Unauthorized);
    }
    if !status.is_success() {
      let body = response.bytes().await.unwrap_or_default();
      return Err(http_error(status.as_u16(), &body));
    }

    Ok(response)
  }

  async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let envelope: Envelope<T> = response
      .json()
      .await
      .map_err(|e| Error::Decode(e.to_string()))?;
    Ok(envelope.data)
  }

  async fn get_data<T: DeserializeOwned>(
    &self,
    path: &str,
    params: &[(&str, String)],
  ) -> Result<T> {
    let mut url = self.url(path)?;
    for (name, value) in params {
      url.query_pairs_mut().append_pair(name, value);
    }
    let response = self.execute(self.http.get(url)).await?;
    Self::decode(response).await
  }

  async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let url = self.url(path)?;
    let response = self.execute(self.http.request(method, url).json(body)).await?;
    Self::decode(response).await
  }

  async fn send_multipart<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    form: Form,
  ) -> Result<T> {
    let url = self.url(path)?;
    let response = self
      .execute(self.http.request(method, url).multipart(form))
      .await?;
    Self::decode(response).await
  }

  async fn delete(&self, path: &str) -> Result<()> {
    let url = self.url(path)?;
    self.execute(self.http.delete(url)).await?;
    Ok(())
  }

  // ==========================================================================
  // Customers
  // ==========================================================================

  pub async fn list_customers(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<Customer>> {
    let params = list_params(search, page, limit);
    let list: ApiCustomerList = self.get_data("users", &params).await?;

    Ok(Page {
      items: list.users.into_iter().map(Customer::from).collect(),
      page,
      total_pages: list.total_pages.max(1),
    })
  }

  pub async fn get_customer(&self, id: &str) -> Result<Customer> {
    let api: ApiCustomer = self.get_data(&format!("users/{}", id), &[]).await?;
    Ok(api.into())
  }

  pub async fn delete_customer(&self, id: &str) -> Result<()> {
    self.delete(&format!("users/{}", id)).await
  }

  // ==========================================================================
  // Services
  // ==========================================================================

  pub async fn list_services(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<Service>> {
    let params = list_params(search, page, limit);
    let list: ApiServiceList = self.get_data("services", &params).await?;

    Ok(Page {
      items: list.services.into_iter().map(Service::from).collect(),
      page,
      total_pages: list.total_pages.max(1),
    })
  }

  /// Create a service; multipart when an image attachment is present,
  /// plain JSON otherwise.
  pub async fn create_service(
    &self,
    draft: &ServiceDraft,
    image: Option<&Attachment>,
  ) -> Result<Service> {
    let api: ApiService = match image {
      Some(image) => {
        let form = Form::new()
          .text("title", draft.title.clone())
          .text("category", draft.category.clone())
          .text("description", draft.description.clone())
          .text("price", draft.price.to_string())
          .part("image", file_part(image)?);
        self.send_multipart(Method::POST, "services", form).await?
      }
      None => self.send_json(Method::POST, "services", draft).await?,
    };
    Ok(api.into())
  }

  pub async fn update_service(&self, id: &str, update: &ServiceUpdate) -> Result<Service> {
    let api: ApiService = self
      .send_json(Method::PUT, &format!("services/{}", id), update)
      .await?;
    Ok(api.into())
  }

  pub async fn delete_service(&self, id: &str) -> Result<()> {
    self.delete(&format!("services/{}", id)).await
  }

  // ==========================================================================
  // Website content
  // ==========================================================================

  pub async fn hero(&self) -> Result<HeroContent> {
    let api: ApiHeroContent = self.get_data("content/hero", &[]).await?;
    Ok(api.into())
  }

  pub async fn update_hero(
    &self,
    update: &HeroUpdate,
    image: Option<&Attachment>,
  ) -> Result<HeroContent> {
    let api: ApiHeroContent = match image {
      Some(image) => {
        let form = Form::new()
          .text("heading", update.heading.clone())
          .text("subheading", update.subheading.clone())
          .part("image", file_part(image)?);
        self.send_multipart(Method::PUT, "content/hero", form).await?
      }
      None => self.send_json(Method::PUT, "content/hero", update).await?,
    };
    Ok(api.into())
  }

  pub async fn brand_partners(&self) -> Result<Vec<BrandPartner>> {
    let api: Vec<ApiBrandPartner> = self.get_data("content/brand-partners", &[]).await?;
    Ok(api.into_iter().map(BrandPartner::from).collect())
  }

  /// Replace the brand partner list; returns the server's stored version.
  pub async fn update_brand_partners(
    &self,
    partners: &[BrandPartnerDraft],
  ) -> Result<Vec<BrandPartner>> {
    let api: Vec<ApiBrandPartner> = self
      .send_json(Method::PUT, "content/brand-partners", partners)
      .await?;
    Ok(api.into_iter().map(BrandPartner::from).collect())
  }

  pub async fn faqs(&self) -> Result<Vec<Faq>> {
    let api: Vec<ApiFaq> = self.get_data("content/faqs", &[]).await?;
    Ok(api.into_iter().map(Faq::from).collect())
  }

  pub async fn create_faq(&self, draft: &FaqDraft) -> Result<Faq> {
    let api: ApiFaq = self.send_json(Method::POST, "content/faqs", draft).await?;
    Ok(api.into())
  }

  pub async fn delete_faq(&self, id: &str) -> Result<()> {
    self.delete(&format!("content/faqs/{}", id)).await
  }

  // ==========================================================================
  // Inventory
  // ==========================================================================

  pub async fn list_inventory(
    &self,
    search: Option<&str>,
    page: u32,
    limit: u32,
  ) -> Result<Page<InventoryItem>> {
    let params = list_params(search, page, limit);
    let list: ApiInventoryList = self.get_data("inventory", &params).await?;

    Ok(Page {
      items: list.items.into_iter().map(InventoryItem::from).collect(),
      page,
      total_pages: list.total_pages.max(1),
    })
  }
}

fn list_params(search: Option<&str>, page: u32, limit: u32) -> Vec<(&'static str, String)> {
  let mut params = vec![("page", page.to_string()), ("limit", limit.to_string())];
  if let Some(search) = search {
    if !search.is_empty() {
      params.push(("search", search.to_string()));
    }
  }
  params
}

fn file_part(attachment: &Attachment) -> Result<Part> {
  let mime = mime_guess::from_path(&attachment.file_name).first_or_octet_stream();
  Part::bytes(attachment.bytes.clone())
    .file_name(attachment.file_name.clone())
    .mime_str(mime.as_ref())
    .map_err(|e| Error::Decode(format!("invalid attachment content type: {}", e)))
}

/// Build the error for a non-2xx response: the body's `message` verbatim
/// when present, else a generic per-status fallback.
fn http_error(status: u16, body: &[u8]) -> Error {
  let message = serde_json::from_slice::<ApiErrorBody>(body)
    .ok()
    .and_then(|b| b.message)
    .unwrap_or_else(|| generic_status_message(status).to_string());

  Error::Http { status, message }
}

fn generic_status_message(status: u16) -> &'static str {
  match status {
    400 => "bad request",
    403 => "forbidden",
    404 => "not found",
    409 => "conflict",
    422 => "unprocessable entity",
    500..=599 => "server error",
    _ => "request failed",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ApiConfig, CacheConfig};

  fn client(base_url: &str) -> HttpClient {
    HttpClient::new(&Config {
      api: ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 10,
      },
      cache: CacheConfig::default(),
    })
    .unwrap()
  }

  #[test]
  fn test_url_join_preserves_base_path() {
    let client = client("https://api.example.com/api/v1");
    assert_eq!(
      client.url("users").unwrap().as_str(),
      "https://api.example.com/api/v1/users"
    );
    assert_eq!(
      client.url("/content/hero").unwrap().as_str(),
      "https://api.example.com/api/v1/content/hero"
    );
  }

  #[test]
  fn test_http_error_uses_server_message_verbatim() {
    let err = http_error(404, br#"{"message": "no such user"}"#);
    assert_eq!(
      err,
      Error::Http {
        status: 404,
        message: "no such user".to_string()
      }
    );
  }

  #[test]
  fn test_http_error_falls_back_without_message() {
    assert_eq!(
      http_error(404, b""),
      Error::Http {
        status: 404,
        message: "not found".to_string()
      }
    );
    assert_eq!(
      http_error(503, b"<html>gateway</html>"),
      Error::Http {
        status: 503,
        message: "server error".to_string()
      }
    );
  }

  #[test]
  fn test_list_params_skip_empty_search() {
    let params = list_params(Some(""), 1, 10);
    assert_eq!(params.len(), 2);

    let params = list_params(Some("alpha"), 2, 10);
    assert!(params.contains(&("search", "alpha".to_string())));
    assert!(params.contains(&("page", "2".to_string())));
  }
}
