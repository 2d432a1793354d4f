//! Configuration loader and validator for the catalog admin client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub backend: Backend,
    pub frontend: Frontend,
    pub product: Product,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Backend API settings. `origin` is both the API base and the prefix used
/// to resolve server-relative image references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub origin: String,
}

/// Public storefront settings, used when building QR reference links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frontend {
    pub origin: String,
    pub details_path: String,
}

/// Product-specific knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub image_update_policy: ImageUpdatePolicy,
}

/// What the backend should do with newly uploaded images during a product
/// edit: merge them into the stored set, or replace it wholesale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageUpdatePolicy {
    Append,
    Replace,
}

impl ImageUpdatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageUpdatePolicy::Append => "append",
            ImageUpdatePolicy::Replace => "replace",
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn origin_is_wellformed(origin: &str) -> bool {
    let o = origin.trim();
    (o.starts_with("http://") || o.starts_with("https://")) && !o.ends_with('/')
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.backend.origin.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.origin must be non-empty"));
    }
    if !origin_is_wellformed(&cfg.backend.origin) {
        return Err(ConfigError::Invalid(
            "backend.origin must start with http(s):// and carry no trailing slash",
        ));
    }

    if cfg.frontend.origin.trim().is_empty() {
        return Err(ConfigError::Invalid("frontend.origin must be non-empty"));
    }
    if !origin_is_wellformed(&cfg.frontend.origin) {
        return Err(ConfigError::Invalid(
            "frontend.origin must start with http(s):// and carry no trailing slash",
        ));
    }

    if cfg.frontend.details_path.trim().is_empty() {
        return Err(ConfigError::Invalid("frontend.details_path must be non-empty"));
    }
    if cfg.frontend.details_path.contains('/') {
        return Err(ConfigError::Invalid(
            "frontend.details_path must be a single path segment",
        ));
    }

    Ok(())
}

/// Canonical example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

backend:
  origin: "https://api.shreemmarmo.com"

frontend:
  origin: "https://shreemarmo.example.com"
  details_path: "Productdetails"

product:
  # What a product edit does with newly uploaded images: "append" | "replace"
  image_update_policy: "append"
"#
}
