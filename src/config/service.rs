// src/config/service.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "CONTENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub providers: ProvidersConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub json_url: String,
    pub xml_url: String,
    pub timeout_secs: u64,
    /// 0 disables the background refresh loop.
    pub refresh_interval_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            json_url: "http://localhost:3001/api/videos".to_string(),
            xml_url: "http://localhost:3002/api/articles".to_string(),
            timeout_secs: 30,
            refresh_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data/content.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl ServiceConfig {
    /// Parse a TOML file. Missing sections fall back to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Resolve the config file, then apply environment overrides:
    /// 1) $CONTENT_CONFIG_PATH (must exist)
    /// 2) config/service.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Overlay values from a key lookup (the process environment in `load`).
    /// Unparseable numbers and unknown enum values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let val = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = val("PROVIDER_JSON_URL") {
            self.providers.json_url = v;
        }
        if let Some(v) = val("PROVIDER_XML_URL") {
            self.providers.xml_url = v;
        }
        if let Some(v) = val("PROVIDER_TIMEOUT_SECS") {
            set_parsed("PROVIDER_TIMEOUT_SECS", &v, &mut self.providers.timeout_secs);
        }
        if let Some(v) = val("REFRESH_INTERVAL_SECS") {
            set_parsed(
                "REFRESH_INTERVAL_SECS",
                &v,
                &mut self.providers.refresh_interval_secs,
            );
        }
        if let Some(v) = val("STORAGE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "sqlite" => self.storage.backend = StorageBackend::Sqlite,
                other => tracing::warn!(value = other, "ignoring unknown STORAGE_BACKEND"),
            }
        }
        if let Some(v) = val("STORAGE_PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = val("LOG_FORMAT") {
            match v.to_ascii_lowercase().as_str() {
                "compact" => self.logging.format = LogFormat::Compact,
                "json" => self.logging.format = LogFormat::Json,
                other => tracing::warn!(value = other, "ignoring unknown LOG_FORMAT"),
            }
        }
    }
}

fn set_parsed<T: std::str::FromStr>(key: &str, raw: &str, slot: &mut T) {
    match raw.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = raw, "ignoring unparseable override"),
    }
}
