//! Error taxonomy for the client layer.
//!
//! Every variant is owned data (no source chaining) so an error can be
//! cloned out of a shared in-flight fetch and handed to every awaiter.

use thiserror::Error;

/// Errors surfaced by the HTTP client, the cache layer, and config loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  /// No response received (DNS, connect, TLS, connection reset).
  #[error("network error: {0}")]
  Network(String),

  /// The per-request timeout elapsed before a response arrived.
  #[error("request timed out after {0}s")]
  Timeout(u64),

  /// The server responded with a non-2xx status. `message` carries the
  /// body's `message` field verbatim when present, else a fallback.
  #[error("server error ({status}): {message}")]
  Http { status: u16, message: String },

  /// HTTP 401. The token was missing, expired, or rejected.
  #[error("unauthorized: the API token was rejected")]
  Unauthorized,

  /// The response body did not match the expected envelope/schema.
  #[error("unexpected response shape: {0}")]
  Decode(String),

  /// The cache snapshot store failed.
  #[error("cache storage error: {0}")]
  Storage(String),

  /// Configuration could not be loaded or validated.
  #[error("configuration error: {0}")]
  Config(String),
}

impl Error {
  /// True if retrying the same request without changes could succeed
  /// (transport-level failures, not contract or auth failures).
  pub fn is_transient(&self) -> bool {
    matches!(self, Error::Network(_) | Error::Timeout(_))
  }

  /// Map a reqwest failure to the taxonomy. `timeout_secs` is only used
  /// to label timeout errors.
  pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
    if err.is_timeout() {
      Error::Timeout(timeout_secs)
    } else if err.is_decode() {
      Error::Decode(err.to_string())
    } else {
      Error::Network(err.to_string())
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transient_classification() {
    assert!(Error::Network("reset".into()).is_transient());
    assert!(Error::Timeout(10).is_transient());
    assert!(!Error::Unauthorized.is_transient());
    assert!(!Error::Http { status: 500, message: "boom".into() }.is_transient());
  }

  #[test]
  fn test_http_display_includes_server_message() {
    let err = Error::Http {
      status: 422,
      message: "title is required".into(),
    };
    assert_eq!(err.to_string(), "server error (422): title is required");
  }
}
