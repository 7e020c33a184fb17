//! `Content-Range` parsing for total size discovery.

use crate::error::DownloadError;

/// Returns the complete-length field of a `Content-Range` value
/// (`bytes 0-99/1000` → 1000). An unknown length (`*`) is an error because the
/// download cannot be planned without it.
pub fn parse_content_range_total(value: &str) -> Result<u64, DownloadError> {
    let (_, total) = value
        .rsplit_once('/')
        .ok_or_else(|| DownloadError::parse(value, "Content-Range has no complete length"))?;
    total
        .trim()
        .parse::<u64>()
        .map_err(|e| DownloadError::parse(value, format!("bad complete length: {}", e)))
}
