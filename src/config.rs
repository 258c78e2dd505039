//! Application configuration loaded from `config.yaml` with environment overrides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::application::composer::DEFAULT_AFFILIATE_CODE;
use crate::application::converter::MAX_UNWRAP_DEPTH;
use crate::infrastructure::short_link::DEFAULT_TIMEOUT_MS;

/// Top-level application configuration.
///
/// Every section is optional in the file; missing values take their defaults.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    /// Server configuration (host, port, CORS origins)
    #[serde(default)]
    pub server: ServerConfig,
    /// Conversion engine settings
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Short-link expansion settings
    #[serde(default)]
    pub short_links: ShortLinkConfig,
    /// Redis connection string; only set from `REDIS_URL`
    #[serde(skip)]
    pub redis_url: Option<String>,
}

/// Server configuration settings.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on (default: 3010)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ConverterConfig {
    /// Referral code appended to target links
    #[serde(default = "default_affiliate_code")]
    pub affiliate_code: String,
    /// Bound on nested wrapped links
    #[serde(default = "default_max_unwrap_depth")]
    pub max_unwrap_depth: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            affiliate_code: default_affiliate_code(),
            max_unwrap_depth: default_max_unwrap_depth(),
        }
    }
}

/// Which short-link expander backs the converter.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShortLinkMode {
    /// Canned destinations, no network access
    #[default]
    Static,
    /// Follow real redirects
    Http,
}

impl ShortLinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortLinkMode::Static => "static",
            ShortLinkMode::Http => "http",
        }
    }
}

impl FromStr for ShortLinkMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(ShortLinkMode::Static),
            "http" => Ok(ShortLinkMode::Http),
            other => bail!("unknown short-link mode '{}' (expected static or http)", other),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ShortLinkConfig {
    #[serde(default)]
    pub mode: ShortLinkMode,
    /// Per-request timeout for HTTP expansion
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Outbound expansion requests allowed per minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// TTL of cached expansions when Redis is configured
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ShortLinkConfig {
    fn default() -> Self {
        Self {
            mode: ShortLinkMode::default(),
            timeout_ms: default_timeout_ms(),
            requests_per_minute: default_requests_per_minute(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3010
}
fn default_allowed_origins() -> String {
    "*".to_string()
}
fn default_affiliate_code() -> String {
    DEFAULT_AFFILIATE_CODE.to_string()
}
fn default_max_unwrap_depth() -> usize {
    MAX_UNWRAP_DEPTH
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_requests_per_minute() -> u32 {
    600
}
fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Config {
    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .context("Failed to parse config.yaml - check YAML syntax and structure")
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Load from `CONFIG_PATH` (default `config.yaml`) and apply process
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::load(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `PORT`, `REDIS_URL`, `AFFILIATE_CODE` and `SHORT_LINK_MODE`
    /// overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(url) = lookup("REDIS_URL").filter(|u| !u.is_empty()) {
            self.redis_url = Some(url);
        }
        if let Some(code) = lookup("AFFILIATE_CODE").filter(|c| !c.is_empty()) {
            self.converter.affiliate_code = code;
        }
        if let Some(mode) = lookup("SHORT_LINK_MODE") {
            self.short_links.mode = mode.parse().context("Invalid SHORT_LINK_MODE")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.server.port, 3010);
        assert_eq!(config.converter.affiliate_code, DEFAULT_AFFILIATE_CODE);
        assert_eq!(config.converter.max_unwrap_depth, 5);
        assert_eq!(config.short_links.mode, ShortLinkMode::Static);
        assert_eq!(config.short_links.requests_per_minute, 600);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_yaml("short_links:\n  mode: http\n  timeout_ms: 1500\n").unwrap();
        assert_eq!(config.short_links.mode, ShortLinkMode::Http);
        assert_eq!(config.short_links.timeout_ms, 1500);
        assert_eq!(config.short_links.cache_ttl_secs, 3600);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("REDIS_URL", "redis://cache:6379"),
            ("AFFILIATE_CODE", "ZZ9"),
            ("SHORT_LINK_MODE", "HTTP"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.converter.affiliate_code, "ZZ9");
        assert_eq!(config.short_links.mode, ShortLinkMode::Http);
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()))
            .is_err());
        assert!(config
            .apply_overrides(|key| (key == "SHORT_LINK_MODE").then(|| "carrier-pigeon".to_string()))
            .is_err());
    }
}
