#![allow(dead_code)]

pub mod object_store;
pub mod range_server;

use std::time::Duration;

use rangedl_core::downloader::{DownloadOptions, MIN_PART_SIZE_BYTES};

pub const PART: u64 = MIN_PART_SIZE_BYTES;

/// Deterministic, non-repeating-per-chunk test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ (i / 251 % 7) as u8).collect()
}

/// Minimum part size, no backoff between retries.
pub fn fast_options(concurrency: usize) -> DownloadOptions {
    DownloadOptions {
        part_size_bytes: PART,
        concurrency,
        retry_base_delay: Duration::ZERO,
        retry_max_delay: Duration::ZERO,
        ..DownloadOptions::default()
    }
}
