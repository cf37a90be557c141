//! HTTP server wiring for the Tenure ownership registry.
//!
//! Loads [`ServerConfig`], builds a [`Registry`] over the SQLite store and
//! serves [`tenure_api::api_router`] behind request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use tenure_core::{Registry, RegistryConfig, store::RegistryStore};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TENURE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  #[serde(default = "default_currency")]
  pub default_currency: String,
}

fn default_currency() -> String { RegistryConfig::default().default_currency }

impl ServerConfig {
  pub fn registry_config(&self) -> RegistryConfig {
    RegistryConfig { default_currency: self.default_currency.clone() }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Load configuration from an optional TOML file, overridden by environment
/// variables prefixed with `TENURE_`.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("TENURE"))
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `registry`.
pub fn router<S>(registry: Arc<Registry<S>>) -> Router
where
  S: RegistryStore + 'static,
{
  tenure_api::api_router(registry).layer(TraceLayer::new_for_http())
}
