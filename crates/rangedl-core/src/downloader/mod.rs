//! Concurrent chunked downloader.
//!
//! A download first issues one synchronous request (the probe) to learn the
//! object's total size, part count and ETag. The rest of the object is then
//! split into byte ranges (or parts) and fed through a bounded queue to a
//! fixed pool of worker threads. Each worker writes its chunk straight to the
//! chunk's offset in the destination [`RangeWriter`], so chunks may finish in
//! any order. The first error stops new work and is the call's only result.

mod chunk;
mod options;
mod run;
mod state;

pub use options::{
    DownloadOptions, GetObjectType, DEFAULT_CONCURRENCY, DEFAULT_PART_BODY_MAX_RETRIES,
    DEFAULT_PART_SIZE_BYTES, MIN_PART_SIZE_BYTES,
};

use serde::Serialize;
use std::sync::Arc;

use crate::control::CancelToken;
use crate::error::DownloadError;
use crate::fetch::{GetParams, ObjectFetcher, ObjectMetadata};
use crate::storage::RangeWriter;

/// Channel receiving a [`DownloadProgress`] after every completed chunk.
pub type ProgressSender = tokio::sync::mpsc::Sender<DownloadProgress>;

/// What to download.
///
/// `params.range` (`bytes=start-end`) limits the download to a sub-range;
/// those bytes land at offset 0 of the destination. `params.part_number`
/// downloads exactly one part with a single request.
#[derive(Debug, Clone, Default)]
pub struct DownloadInput {
    /// Object key understood by the fetcher (a URL for [`crate::fetch::HttpFetcher`]).
    pub key: String,
    pub params: GetParams,
}

impl DownloadInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: GetParams::default(),
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.params.range = Some(range.into());
        self
    }

    pub fn with_part_number(mut self, part: u32) -> Self {
        self.params.part_number = Some(part);
        self
    }

    pub fn with_version_id(mut self, version: impl Into<String>) -> Self {
        self.params.version_id = Some(version.into());
        self
    }
}

/// Result of a completed download.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutput {
    /// Bytes written to the destination.
    pub content_length: u64,
    /// `bytes=<first>-<last>` of the object span covered, or the response's
    /// own `Content-Range` for single-request downloads.
    pub content_range: Option<String>,
    /// Metadata of the first successful chunk response.
    pub metadata: ObjectMetadata,
}

/// Running byte count, sent after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub written: u64,
    /// Bytes expected in total, once known.
    pub total: Option<u64>,
}

/// Download client: a fetcher plus client-wide default options. Each call
/// works on its own copy of the options.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn ObjectFetcher>,
    options: DownloadOptions,
    progress: Option<ProgressSender>,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, options: DownloadOptions) -> Self {
        Self {
            fetcher,
            options,
            progress: None,
        }
    }

    /// Send progress updates to `tx` (best effort, never blocks workers).
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Download `input` into `writer` with the client's default options.
    /// Blocks until every chunk is written or the first error.
    pub fn download(
        &self,
        input: &DownloadInput,
        writer: &dyn RangeWriter,
        cancel: &CancelToken,
    ) -> Result<DownloadOutput, DownloadError> {
        self.download_with(input, writer, cancel, |_| {})
    }

    /// Like [`Downloader::download`], with per-call option overrides.
    pub fn download_with<F>(
        &self,
        input: &DownloadInput,
        writer: &dyn RangeWriter,
        cancel: &CancelToken,
        configure: F,
    ) -> Result<DownloadOutput, DownloadError>
    where
        F: FnOnce(&mut DownloadOptions),
    {
        let mut options = self.options.clone();
        configure(&mut options);
        run::download(
            self.fetcher.as_ref(),
            input,
            writer,
            &options,
            cancel,
            self.progress.as_ref(),
        )
    }
}

/// One-off download without building a [`Downloader`].
pub fn download(
    fetcher: &dyn ObjectFetcher,
    input: &DownloadInput,
    writer: &dyn RangeWriter,
    options: &DownloadOptions,
    cancel: &CancelToken,
) -> Result<DownloadOutput, DownloadError> {
    run::download(fetcher, input, writer, options, cancel, None)
}
