/*!
common/src/lib.rs

Shared configuration types for feedrelay.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Validation of the loaded configuration
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Browser-like user agent; some feed providers reject non-browser clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124 Safari/537.36";

/// HTTP server configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. "127.0.0.1" or "0.0.0.0")
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Outbound fetch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub user_agent: Option<String>,
    /// Client-level timeout. Unset means the HTTP client defaults apply.
    pub timeout_seconds: Option<u64>,
    pub max_redirects: Option<usize>,
}

impl FetchConfig {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects.unwrap_or(10)
    }
}

/// Per-feed item limits for the `count` query parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            max_count: default_max_count(),
        }
    }
}

fn default_count() -> usize {
    6
}

fn default_max_count() -> usize {
    50
}

/// A feed origin: display label plus absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Arrays such as
    /// `feeds` are replaced wholesale by the override.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Resolve the config files the binaries use: `config.default.toml` in the working
    /// directory, overridden by `explicit` (which must exist) or else `config.toml` if present.
    /// The merged result is validated before it is returned.
    pub async fn load_for_cli(explicit: Option<&Path>) -> Result<Self> {
        let default_path = Path::new("config.default.toml");

        let override_path = match explicit {
            Some(p) if !p.exists() => bail!("Config file not found: {}", p.display()),
            Some(p) => Some(p),
            None => Some(Path::new("config.toml")).filter(|p| p.exists()),
        };

        let cfg = Self::load_with_defaults(Some(default_path), override_path).await?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check limits and feed entries. Called once at startup, before anything is served.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_count < 1 {
            bail!("limits.max_count must be at least 1");
        }
        if self.limits.default_count < 1 || self.limits.default_count > self.limits.max_count {
            bail!(
                "limits.default_count ({}) must be within [1, {}]",
                self.limits.default_count,
                self.limits.max_count
            );
        }

        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                bail!("feed with url {} has an empty name", feed.url);
            }
            let parsed = url::Url::parse(&feed.url)
                .with_context(|| format!("feed '{}' has an invalid url: {}", feed.name, feed.url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("feed '{}' must use http or https, got {}", feed.name, parsed.scheme());
            }
        }

        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
