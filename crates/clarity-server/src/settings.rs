//! Server configuration.
//!
//! Values are layered: built-in defaults, then the optional TOML file, then
//! `CLARITY_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use uuid::Uuid;

pub const ENV_PREFIX: &str = "CLARITY";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_STORE_PATH: &str = "clarity.db";
pub const DEFAULT_ACTOR: &str = "00000000-0000-0000-0000-000000000001";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Attributed to requests that carry no `X-Actor-Id` header.
  pub default_actor: Uuid,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Load configuration from `path` (which need not exist) and the environment.
pub fn load(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .set_default("host", DEFAULT_HOST)?
    .set_default("port", i64::from(DEFAULT_PORT))?
    .set_default("store_path", DEFAULT_STORE_PATH)?
    .set_default("default_actor", DEFAULT_ACTOR)?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix(ENV_PREFIX))
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
