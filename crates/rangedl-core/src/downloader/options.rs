//! Per-call download configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DownloadError;
use crate::retry::RetryPolicy;

/// Smallest accepted chunk size.
pub const MIN_PART_SIZE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_PART_SIZE_BYTES: u64 = 8 * 1024 * 1024;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_PART_BODY_MAX_RETRIES: u32 = 3;

/// How a whole object is split into requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GetObjectType {
    /// Fixed-size byte ranges of `part_size_bytes`.
    #[default]
    Ranges,
    /// Server-defined parts of a multipart object, addressed by part number.
    Parts,
}

/// Options for one download call. A [`crate::downloader::Downloader`] holds
/// client-wide defaults and hands each call its own copy.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Size of each ranged request in `Ranges` mode.
    pub part_size_bytes: u64,
    /// Worker count and work queue capacity.
    pub concurrency: usize,
    /// Retries per chunk after a body read failure.
    pub part_body_max_retries: u32,
    pub get_object_type: GetObjectType,
    /// Send the first chunk's ETag as If-Match on every later chunk.
    pub enforce_consistency: bool,
    /// Do not ask the server for checksum validation by default.
    pub disable_checksum_validation: bool,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            concurrency: DEFAULT_CONCURRENCY,
            part_body_max_retries: DEFAULT_PART_BODY_MAX_RETRIES,
            get_object_type: GetObjectType::Ranges,
            enforce_consistency: true,
            disable_checksum_validation: false,
            retry_base_delay: retry.base_delay,
            retry_max_delay: retry.max_delay,
        }
    }
}

impl DownloadOptions {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.part_size_bytes < MIN_PART_SIZE_BYTES {
            return Err(DownloadError::Config(format!(
                "part size must be at least {} bytes",
                MIN_PART_SIZE_BYTES
            )));
        }
        if self.concurrency == 0 {
            return Err(DownloadError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.part_body_max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = DownloadOptions::default();
        assert!(o.validate().is_ok());
        assert_eq!(o.part_size_bytes, 8 * 1024 * 1024);
        assert_eq!(o.concurrency, 5);
        assert_eq!(o.part_body_max_retries, 3);
        assert!(o.enforce_consistency);
    }

    #[test]
    fn part_size_below_minimum_rejected() {
        let o = DownloadOptions {
            part_size_bytes: MIN_PART_SIZE_BYTES - 1,
            ..DownloadOptions::default()
        };
        assert!(matches!(o.validate(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let o = DownloadOptions {
            concurrency: 0,
            ..DownloadOptions::default()
        };
        assert!(matches!(o.validate(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn retry_policy_mirrors_options() {
        let o = DownloadOptions {
            part_body_max_retries: 0,
            retry_base_delay: Duration::ZERO,
            ..DownloadOptions::default()
        };
        let p = o.retry_policy();
        assert_eq!(p.max_attempts(), 1);
        assert_eq!(p.base_delay, Duration::ZERO);
    }
}
