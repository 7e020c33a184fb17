//! Ranged object reads.
//!
//! The engine never talks to the network directly: it asks an
//! [`ObjectFetcher`] for one ranged (or part-addressed) read at a time. A
//! failure returned by `fetch` is a call-level failure and is not retried; a
//! failure returned while reading [`FetchResponse::body`] is a body-stream
//! failure and is retried by re-issuing the whole chunk.

mod http;

pub use http::{HttpFetcher, HttpOptions};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

use crate::control::CancelToken;

/// Whether the server should return (and validate) object checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    #[default]
    Disabled,
    Enabled,
}

/// Parameters for one ranged read. The engine fills `range`/`part_number` per
/// chunk and may override `if_match` with the ETag captured from the first chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetParams {
    /// HTTP byte range, e.g. `bytes=0-8388607`.
    pub range: Option<String>,
    /// 1-based part number of a multipart object.
    pub part_number: Option<u32>,
    /// Pins the read to one object version. When set, the engine does not add If-Match.
    pub version_id: Option<String>,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    /// Explicit checksum mode; when unset the engine applies its default.
    pub checksum_mode: Option<ChecksumMode>,
    /// Extra request headers passed through unchanged.
    pub headers: BTreeMap<String, String>,
}

/// Response metadata of one read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    /// Length of this response's body.
    pub content_length: u64,
    /// `Content-Range` of this response; absent when the whole object was returned.
    pub content_range: Option<String>,
    /// Entity tag, kept verbatim (quotes included) so it can be echoed in If-Match.
    pub etag: Option<String>,
    /// Number of parts, for multipart objects read by part number.
    pub parts_count: Option<u32>,
    pub version_id: Option<String>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    /// Checksums keyed by algorithm (`sha256`, `crc32c`, ...).
    pub checksums: BTreeMap<String, String>,
    /// User metadata (`x-amz-meta-*` without the prefix).
    pub metadata: BTreeMap<String, String>,
}

/// A successful response: metadata plus a body still to be read.
pub struct FetchResponse {
    pub metadata: ObjectMetadata,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Call-level failure of one read.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The object no longer matches the If-Match tag (HTTP 412).
    #[error("precondition failed: object changed (If-Match {if_match:?})")]
    PreconditionFailed { if_match: Option<String> },
    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u32, message: String },
    /// The request could not be built (bad URL, bad header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The cancel token was tripped while the request was in flight.
    #[error("request cancelled")]
    Cancelled,
}

/// Performs a single ranged read of the object named by `key`.
pub trait ObjectFetcher: Send + Sync {
    fn fetch(
        &self,
        key: &str,
        params: &GetParams,
        cancel: &CancelToken,
    ) -> Result<FetchResponse, FetchError>;
}

impl<F: ObjectFetcher + ?Sized> ObjectFetcher for std::sync::Arc<F> {
    fn fetch(
        &self,
        key: &str,
        params: &GetParams,
        cancel: &CancelToken,
    ) -> Result<FetchResponse, FetchError> {
        (**self).fetch(key, params, cancel)
    }
}
