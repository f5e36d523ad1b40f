//! OpsDesk REST API surface: wire types, domain types, the HTTP client,
//! query keys, and the cached client most callers should use.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod keys;
pub mod types;

pub use cached_client::CachedApiClient;
pub use client::HttpClient;
pub use keys::ApiQueryKey;
