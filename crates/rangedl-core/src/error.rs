//! Terminal error type for one download call.
//!
//! Exactly one of these is surfaced per failed download: the first error any
//! worker (or the probe) recorded. Per-attempt body failures that a retry
//! masked are never surfaced individually.

use crate::fetch::FetchError;
use std::io;

/// Error returned by [`crate::downloader::Downloader::download`].
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Invalid part size, concurrency or part number. Detected before any request.
    #[error("unable to initialize download: {0}")]
    Config(String),

    /// Malformed caller range or malformed `Content-Range` on a response.
    #[error("invalid range {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// The ranged request itself failed (transport, HTTP status, precondition).
    /// Not retried.
    #[error("chunk request failed: {0}")]
    Call(#[source] FetchError),

    /// Reading a response body failed on every allowed attempt.
    #[error("reading chunk body failed after {attempts} attempt(s): {source}")]
    BodyStream {
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// The destination rejected a write (disk full, permissions). Not retried.
    #[error("writing chunk at offset {offset} failed: {source}")]
    Storage {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The caller's cancel token was tripped.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub(crate) fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        DownloadError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// True when the server rejected a chunk because the object changed
    /// under the captured ETag.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, DownloadError::Call(FetchError::PreconditionFailed { .. }))
    }
}

impl From<FetchError> for DownloadError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => DownloadError::Cancelled,
            other => DownloadError::Call(other),
        }
    }
}
