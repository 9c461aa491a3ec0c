use crate::core::cache::{EvictionPolicy, DEFAULT_TTL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TOKEN_ENV_VAR: &str = "PIPELINE_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
        }
    }
}

impl ServerSettings {
    /// The environment variable wins over the config file.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub delay_ms: u64,
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            delay_ms: 3000,
            fetch_timeout_ms: None,
        }
    }
}

impl PollingSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionMode {
    Expiry,
    Lru,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub eviction: EvictionMode,
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            eviction: EvictionMode::Expiry,
            capacity: 256,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn policy(&self) -> Result<EvictionPolicy> {
        match self.eviction {
            EvictionMode::Expiry => Ok(EvictionPolicy::Expiry),
            EvictionMode::Lru => {
                let capacity = NonZeroUsize::new(self.capacity)
                    .context("cache.capacity must be greater than zero for lru eviction")?;
                Ok(EvictionPolicy::Lru { capacity })
            }
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pipeline-poller").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.delay_ms == 0 {
            anyhow::bail!("polling.delay_ms must be greater than zero");
        }
        if self.polling.fetch_timeout_ms == Some(0) {
            anyhow::bail!("polling.fetch_timeout_ms must be greater than zero when set");
        }
        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be greater than zero");
        }
        self.cache.policy()?;
        Ok(())
    }
}
