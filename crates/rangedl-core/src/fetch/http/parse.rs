//! Parse HTTP response header lines into ObjectMetadata.

use crate::fetch::ObjectMetadata;

/// Status code and reason phrase of the last status line
/// (`HTTP/1.1 206 Partial Content`). Redirect hops clear earlier lines, so the
/// last one belongs to the final response.
pub(crate) fn parse_status_line(lines: &[String]) -> Option<(u32, String)> {
    let line = lines.iter().rev().find(|l| l.starts_with("HTTP/"))?;
    let mut parts = line.splitn(3, ' ');
    let _version = parts.next()?;
    let code = parts.next()?.trim().parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((code, reason))
}

/// Map the final response's headers into metadata. `content_length` falls back
/// to 0 when absent; the caller substitutes the received body length.
pub(crate) fn parse_headers(lines: &[String]) -> ObjectMetadata {
    let mut meta = ObjectMetadata::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        match name.as_str() {
            "content-length" => {
                if let Ok(n) = value.parse::<u64>() {
                    meta.content_length = n;
                }
            }
            "content-range" => meta.content_range = Some(value.to_string()),
            "etag" => meta.etag = Some(value.to_string()),
            "x-amz-mp-parts-count" => meta.parts_count = value.parse::<u32>().ok(),
            "x-amz-version-id" => meta.version_id = Some(value.to_string()),
            "content-type" => meta.content_type = Some(value.to_string()),
            "last-modified" => meta.last_modified = Some(value.to_string()),
            "x-amz-checksum-mode" => {}
            _ => {
                if let Some(algo) = name.strip_prefix("x-amz-checksum-") {
                    meta.checksums.insert(algo.to_string(), value.to_string());
                } else if let Some(key) = name.strip_prefix("x-amz-meta-") {
                    meta.metadata.insert(key.to_string(), value.to_string());
                }
            }
        }
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_line_of_final_response() {
        let l = lines(&["HTTP/1.1 206 Partial Content", "Content-Length: 10"]);
        assert_eq!(parse_status_line(&l), Some((206, "Partial Content".to_string())));
        let l = lines(&["HTTP/2 412"]);
        assert_eq!(parse_status_line(&l), Some((412, String::new())));
        assert_eq!(parse_status_line(&lines(&["Content-Length: 1"])), None);
    }

    #[test]
    fn ranged_response_headers() {
        let l = lines(&[
            "HTTP/1.1 206 Partial Content",
            "Content-Length: 100",
            "Content-Range: bytes 0-99/1000",
            "ETag: \"abc-123\"",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
            "Content-Type: application/octet-stream",
        ]);
        let m = parse_headers(&l);
        assert_eq!(m.content_length, 100);
        assert_eq!(m.content_range.as_deref(), Some("bytes 0-99/1000"));
        assert_eq!(m.etag.as_deref(), Some("\"abc-123\""));
        assert_eq!(m.last_modified.as_deref(), Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(m.content_type.as_deref(), Some("application/octet-stream"));
        assert!(m.parts_count.is_none());
    }

    #[test]
    fn object_store_headers() {
        let l = lines(&[
            "x-amz-mp-parts-count: 4",
            "x-amz-version-id: v7",
            "x-amz-checksum-sha256: q83vEjRWeJA=",
            "x-amz-checksum-mode: ENABLED",
            "x-amz-meta-owner: ops",
        ]);
        let m = parse_headers(&l);
        assert_eq!(m.parts_count, Some(4));
        assert_eq!(m.version_id.as_deref(), Some("v7"));
        assert_eq!(m.checksums.get("sha256").map(String::as_str), Some("q83vEjRWeJA="));
        assert_eq!(m.checksums.len(), 1);
        assert_eq!(m.metadata.get("owner").map(String::as_str), Some("ops"));
    }
}
