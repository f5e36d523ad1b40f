use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the OpsDesk backend, e.g. "https://api.example.com/api/v1"
  pub base_url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached value is served without a network call
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// How long an unobserved entry survives before eviction.
  /// Defaults to twice the staleness window.
  pub gc_secs: Option<u64>,
  /// Disable the persistent cache entirely (every read hits the network)
  #[serde(default)]
  pub disabled: bool,
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_stale_secs() -> u64 {
  300
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: None,
      disabled: false,
    }
  }
}

impl CacheConfig {
  /// Effective GC window: explicit value or 2x the staleness window.
  pub fn effective_gc_secs(&self) -> u64 {
    self.gc_secs.unwrap_or(self.stale_secs * 2)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./opsdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/opsdesk/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!("config file not found: {}", p.display())));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(Error::Config(
        "no configuration file found; create one at ~/.config/opsdesk/config.yaml".to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("opsdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("opsdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    if config.api.base_url.is_empty() {
      return Err(Error::Config("api.base_url must not be empty".to_string()));
    }

    Ok(config)
  }

  /// Get the API bearer token from the environment.
  ///
  /// The token is never stored in the config file. Returns None when the
  /// variable is unset; the backend decides whether anonymous reads are
  /// allowed.
  pub fn api_token() -> Option<String> {
    std::env::var("OPSDESK_API_TOKEN").ok().filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config: Config = serde_yaml::from_str(
      "api:\n  base_url: https://api.example.com/api/v1\n",
    )
    .unwrap();

    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.cache.effective_gc_secs(), 600);
    assert!(!config.cache.disabled);
  }

  #[test]
  fn test_explicit_gc_window_wins() {
    let config: Config = serde_yaml::from_str(
      "api:\n  base_url: https://api.example.com\ncache:\n  stale_secs: 60\n  gc_secs: 900\n",
    )
    .unwrap();

    assert_eq!(config.cache.effective_gc_secs(), 900);
  }
}
