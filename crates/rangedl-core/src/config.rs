//! On-disk configuration (`~/.config/rangedl/config.toml`).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::{
    DownloadOptions, GetObjectType, DEFAULT_CONCURRENCY, DEFAULT_PART_BODY_MAX_RETRIES,
    DEFAULT_PART_SIZE_BYTES,
};

/// Backoff between body retries (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.1 = 100ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.1,
            max_delay_secs: 5,
        }
    }
}

/// Client-wide download defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangedlConfig {
    /// Bytes per ranged request.
    pub part_size_bytes: u64,
    /// Concurrent chunk requests per download.
    pub concurrency: usize,
    /// Retries per chunk when reading a response body fails.
    pub part_body_max_retries: u32,
    /// "ranges" (fixed-size byte ranges) or "parts" (server-defined parts).
    #[serde(default)]
    pub get_object_type: GetObjectType,
    /// Pin every chunk to the first chunk's ETag with If-Match.
    #[serde(default = "default_true")]
    pub enforce_consistency: bool,
    #[serde(default)]
    pub disable_checksum_validation: bool,
    /// Optional backoff; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for RangedlConfig {
    fn default() -> Self {
        Self {
            part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            concurrency: DEFAULT_CONCURRENCY,
            part_body_max_retries: DEFAULT_PART_BODY_MAX_RETRIES,
            get_object_type: GetObjectType::Ranges,
            enforce_consistency: true,
            disable_checksum_validation: false,
            retry: None,
        }
    }
}

impl RangedlConfig {
    /// Engine options for these settings. Validation happens per download.
    pub fn download_options(&self) -> DownloadOptions {
        let retry = self.retry.clone().unwrap_or_default();
        DownloadOptions {
            part_size_bytes: self.part_size_bytes,
            concurrency: self.concurrency,
            part_body_max_retries: self.part_body_max_retries,
            get_object_type: self.get_object_type,
            enforce_consistency: self.enforce_consistency,
            disable_checksum_validation: self.disable_checksum_validation,
            retry_base_delay: Duration::from_secs_f64(retry.base_delay_secs.max(0.0)),
            retry_max_delay: Duration::from_secs(retry.max_delay_secs),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RangedlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RangedlConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RangedlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
