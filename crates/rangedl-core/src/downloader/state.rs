//! State shared by the probe and every worker of one download.
//!
//! One mutex guards everything. Total size, ETag and output are
//! first-writer-wins; the error slot keeps the first error and is never
//! cleared.

use std::sync::{Mutex, MutexGuard};

use crate::error::DownloadError;
use crate::fetch::ObjectMetadata;
use crate::plan::parse_content_range_total;

#[derive(Debug, Default)]
struct Inner {
    total_bytes: Option<u64>,
    /// Set by the first successful call response, whether or not it yielded a total.
    total_checked: bool,
    written: u64,
    etag: Option<String>,
    etag_captured: bool,
    err: Option<DownloadError>,
    output: Option<ObjectMetadata>,
}

/// Final values once all workers have joined.
#[derive(Debug)]
pub(crate) struct Finished {
    pub total_bytes: Option<u64>,
    pub written: u64,
    pub output: Option<ObjectMetadata>,
}

#[derive(Debug, Default)]
pub(crate) struct DownloadState {
    inner: Mutex<Inner>,
}

impl DownloadState {
    /// `total_bytes` is preset when the caller gave a bounded range.
    pub(crate) fn new(total_bytes: Option<u64>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                total_bytes,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn total_bytes(&self) -> Option<u64> {
        self.lock().total_bytes
    }

    /// Record the total from the first successful call response: the
    /// `Content-Range` complete length when present, else `Content-Length`
    /// (the whole object came back unchunked). Later calls are no-ops.
    pub(crate) fn record_total(&self, meta: &ObjectMetadata) -> Result<(), DownloadError> {
        let mut inner = self.lock();
        if inner.total_checked {
            return Ok(());
        }
        inner.total_checked = true;
        if inner.total_bytes.is_some() {
            return Ok(());
        }
        let total = match meta.content_range.as_deref() {
            Some(range) => parse_content_range_total(range)?,
            None => meta.content_length,
        };
        inner.total_bytes = Some(total);
        Ok(())
    }

    pub(crate) fn etag(&self) -> Option<String> {
        self.lock().etag.clone()
    }

    /// Capture the ETag of the first successful chunk.
    pub(crate) fn capture_etag(&self, etag: Option<&str>) {
        let mut inner = self.lock();
        if inner.etag_captured {
            return;
        }
        inner.etag_captured = true;
        inner.etag = etag.filter(|t| !t.is_empty()).map(str::to_string);
    }

    pub(crate) fn add_written(&self, n: u64) -> u64 {
        let mut inner = self.lock();
        inner.written += n;
        inner.written
    }

    pub(crate) fn set_output(&self, meta: &ObjectMetadata) {
        let mut inner = self.lock();
        if inner.output.is_none() {
            inner.output = Some(meta.clone());
        }
    }

    pub(crate) fn has_err(&self) -> bool {
        self.lock().err.is_some()
    }

    /// Record `e` unless an error is already recorded.
    pub(crate) fn set_err(&self, e: DownloadError) {
        let mut inner = self.lock();
        if inner.err.is_none() {
            inner.err = Some(e);
        } else {
            tracing::debug!(error = %e, "dropping error after first failure");
        }
    }

    /// Consume the state: the first error, or the final counters.
    pub(crate) fn finish(self) -> Result<Finished, DownloadError> {
        let inner = self.inner.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(e) = inner.err {
            return Err(e);
        }
        Ok(Finished {
            total_bytes: inner.total_bytes,
            written: inner.written,
            output: inner.output,
        })
    }
}
