//! Runtime configuration loaded from an optional YAML file.
//!
//! Every key is optional; an absent file yields the defaults below.
//!
//! ```yaml
//! catalog: cellar/vinoteca.csv
//! cache_ttl_secs: 600
//! read_backoff_ms: [2000, 5000]
//! image_timeout_secs: 5
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "vinoteca.yaml";
pub const DEFAULT_CATALOG_FILE: &str = "vinoteca.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub catalog: PathBuf,
    /// How long a catalog read may be served from cache.
    pub cache_ttl_secs: u64,
    /// Delays between read attempts; one more attempt than entries.
    pub read_backoff_ms: Vec<u64>,
    pub image_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(DEFAULT_CATALOG_FILE),
            cache_ttl_secs: 600,
            read_backoff_ms: vec![2000, 5000],
            image_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Loads `path` when given (it must exist), otherwise `vinoteca.yaml` in
    /// the working directory if present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    debug!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn read_backoff(&self) -> Vec<Duration> {
        self.read_backoff_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}
