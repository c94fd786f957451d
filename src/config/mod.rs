use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;

use crate::api::ProviderConfig;

/// Complete stratus configuration
///
/// Loaded once at startup: an optional TOML file, then `STRATUS_*`
/// environment overrides, then validation. Components are handed the
/// values they need at construction and never read the environment
/// themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database path; `:memory:` selects the in-memory backend
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Maximum accepted settings blob size in bytes
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,

    /// Pepper mixed into secret-namespace keys (required)
    #[serde(default)]
    pub pepper_secrets: String,

    /// Pepper mixed into settings-namespace keys (required, distinct)
    #[serde(default)]
    pub pepper_settings: String,

    /// When set, only these provider user ids may obtain secrets or sync
    #[serde(default)]
    pub allowed_users: Option<Vec<String>>,

    /// CORS origin allow-list; absent means any origin
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Identity provider endpoints and client credentials
    #[serde(default)]
    pub oauth: ProviderConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_path() -> String {
    "stratus.db".to_string()
}

fn default_size_limit() -> usize {
    1_048_576 // 1 MB
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            size_limit: default_size_limit(),
            pepper_secrets: String::new(),
            pepper_settings: String::new(),
            allowed_users: None,
            cors_origins: None,
            oauth: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the optional TOML file, apply environment
    /// overrides, and validate.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path))?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Apply `STRATUS_*` environment overrides on top of the file values.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("STRATUS_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("STRATUS_DB_PATH") {
            self.db_path = v;
        }
        if let Ok(v) = std::env::var("STRATUS_SIZE_LIMIT") {
            if let Ok(n) = v.parse::<usize>() {
                self.size_limit = n;
            }
        }
        if let Ok(v) = std::env::var("STRATUS_PEPPER_SECRETS") {
            self.pepper_secrets = v;
        }
        if let Ok(v) = std::env::var("STRATUS_PEPPER_SETTINGS") {
            self.pepper_settings = v;
        }
        if let Ok(v) = std::env::var("STRATUS_ALLOWED_USERS") {
            self.allowed_users = Some(split_list(&v));
        }
        if let Ok(v) = std::env::var("STRATUS_CORS_ORIGINS") {
            self.cors_origins = Some(split_list(&v));
        }
        if let Ok(v) = std::env::var("STRATUS_OAUTH_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Ok(v) = std::env::var("STRATUS_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Ok(v) = std::env::var("STRATUS_OAUTH_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
    }

    /// Reject configurations that cannot work.
    ///
    /// Equal peppers would silently collapse the secrets and settings key
    /// spaces into one, so they are refused outright.
    pub fn validate(&self) -> Result<()> {
        if self.pepper_secrets.is_empty() {
            bail!("pepper_secrets is required (STRATUS_PEPPER_SECRETS)");
        }
        if self.pepper_settings.is_empty() {
            bail!("pepper_settings is required (STRATUS_PEPPER_SETTINGS)");
        }
        if self.pepper_secrets == self.pepper_settings {
            bail!("pepper_secrets and pepper_settings must differ");
        }
        if self.size_limit == 0 {
            bail!("size_limit must be greater than zero");
        }
        if self.oauth.client_id.is_empty() {
            bail!("oauth.client_id is required (STRATUS_OAUTH_CLIENT_ID)");
        }
        if self.oauth.client_secret.is_empty() {
            bail!("oauth.client_secret is required (STRATUS_OAUTH_CLIENT_SECRET)");
        }
        if self.oauth.redirect_uri.is_empty() {
            bail!("oauth.redirect_uri is required (STRATUS_OAUTH_REDIRECT_URI)");
        }
        Ok(())
    }

    /// The allow-list as a set. An empty list counts as no restriction.
    pub fn allowed_users_set(&self) -> Option<HashSet<String>> {
        match &self.allowed_users {
            Some(users) if !users.is_empty() => Some(users.iter().cloned().collect()),
            _ => None,
        }
    }
}

/// Split a comma-separated value into trimmed, non-empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
