use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chart::{Mode, heatmap};

pub const CONFIG_FILE: &str = "config.json";
pub const API_URL_ENV: &str = "DEPTHMAP_API_URL";

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ScaleFactor(f64);

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f64> for ScaleFactor {
    fn from(value: f64) -> Self {
        ScaleFactor(value.clamp(0.8, 1.8))
    }
}

impl From<ScaleFactor> for f64 {
    fn from(value: ScaleFactor) -> Self {
        value.0
    }
}

impl From<ScaleFactor> for f32 {
    fn from(value: ScaleFactor) -> Self {
        value.0 as f32
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub auto_refresh: bool,
    pub default_mode: Mode,
    pub scale_factor: ScaleFactor,
    pub heatmap: heatmap::Config,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_refresh: true,
            default_mode: Mode::Auto,
            scale_factor: ScaleFactor::default(),
            heatmap: heatmap::Config::default(),
        }
    }
}

impl Config {
    pub fn api_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.api_base_url)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }

    /// Applies environment overrides on top of file values.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            self.api_base_url = url.trim().to_string();
        }
        self
    }
}

/// Reads the config file, falling back to defaults when it is missing or broken.
pub fn load() -> Config {
    let config = match crate::read_from_file(CONFIG_FILE) {
        Ok(config) => config,
        Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No {CONFIG_FILE} found, using defaults");
            Config::default()
        }
        Err(err) => {
            log::error!("Failed to load {CONFIG_FILE}, using defaults: {err}");
            Config::default()
        }
    };

    config.with_env()
}
