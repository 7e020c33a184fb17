//! Caller range parsing and per-chunk `Range` header values.

use crate::error::DownloadError;

/// Half-open byte span `[start, end)` requested by the caller.
/// `end` is `None` for an open-ended range (`bytes=100-`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive), if the caller gave one.
    pub end: Option<u64>,
}

impl ByteSpan {
    /// Length of the span, if bounded.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|e| e.saturating_sub(self.start))
    }
}

/// Parses an HTTP byte range `bytes=<start>-<end>` (inclusive end, end optional)
/// into a half-open span. Suffix ranges (`bytes=-500`) and multi-range values
/// are rejected.
pub fn parse_range(input: &str) -> Result<ByteSpan, DownloadError> {
    let (unit, spec) = input
        .trim()
        .split_once('=')
        .ok_or_else(|| DownloadError::parse(input, "missing '=' after range unit"))?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(DownloadError::parse(input, "range unit must be bytes"));
    }
    if spec.contains(',') {
        return Err(DownloadError::parse(input, "multiple ranges are not supported"));
    }
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| DownloadError::parse(input, "missing '-' separator"))?;
    let start = start
        .trim()
        .parse::<u64>()
        .map_err(|e| DownloadError::parse(input, format!("bad start offset: {}", e)))?;
    let end = end.trim();
    if end.is_empty() {
        return Ok(ByteSpan { start, end: None });
    }
    let end_incl = end
        .parse::<u64>()
        .map_err(|e| DownloadError::parse(input, format!("bad end offset: {}", e)))?;
    if end_incl < start {
        return Err(DownloadError::parse(input, "end offset before start offset"));
    }
    let end = end_incl
        .checked_add(1)
        .ok_or_else(|| DownloadError::parse(input, "end offset out of range"))?;
    Ok(ByteSpan {
        start,
        end: Some(end),
    })
}

/// `Range` header value for the chunk starting at `pos`.
///
/// With a known `total` the upper bound is clamped to the last byte; otherwise
/// a full `part_size` chunk is requested and the server clamps it. The upper
/// bound saturates at `u64::MAX`.
pub fn byte_range(pos: u64, part_size: u64, total: Option<u64>) -> String {
    let optimistic = pos.saturating_add(part_size.max(1) - 1);
    let upper = match total {
        Some(total) => optimistic.min(total.saturating_sub(1)),
        None => optimistic,
    };
    format!("bytes={}-{}", pos, upper)
}
