use crate::error::{FeverError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One year, in seconds.
pub const DEFAULT_MAX_AGE_SECS: u64 = 31_536_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeverConfig {
    /// Directory inside the store where compiled artifacts live.
    pub directory: String,
    /// Root of the local filesystem store.
    pub root: String,
    /// Number of served requests between two recache cycles. `0` disables it.
    pub recache: u64,
    /// How many files the hot cache keeps per cycle.
    pub hot_cache_capacity: usize,
    pub max_age_secs: u64,
    /// URL prefix artifacts are served under.
    pub prefix: String,
    pub server: ServerConfig,
    /// Fragment lists compiled when the server boots.
    pub bundles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for FeverConfig {
    fn default() -> Self {
        Self {
            directory: "fever".into(),
            root: ".".into(),
            recache: 10_000,
            hot_cache_capacity: 64,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            prefix: "/".into(),
            server: ServerConfig::default(),
            bundles: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl FeverConfig {
    /// Load a JSON configuration file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FeverError::Config(format!("read {}: {e}", path.display())))?;
        let config: FeverConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        debug!(path = %path.display(), prefix = %config.prefix, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hot_cache_capacity == 0 {
            return Err(FeverError::Config("hot_cache_capacity must be at least 1".into()));
        }
        if !self.prefix.starts_with('/') {
            return Err(FeverError::Config(format!(
                "prefix must start with '/', got {:?}",
                self.prefix
            )));
        }
        Ok(())
    }

    /// Prefix normalized to end with a single `/`.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.prefix.trim_end_matches('/');
        format!("{trimmed}/")
    }
}
