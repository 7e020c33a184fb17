//! libcurl-backed fetcher for HTTP(S) objects.
//!
//! The object key is a URL. Part numbers and version ids travel as the
//! `partNumber` / `versionId` query parameters used by S3-compatible stores;
//! byte ranges and conditions travel as request headers. Each call buffers one
//! chunk's body, so memory stays bounded by `concurrency × part size`.

mod body;
mod parse;

use std::io;
use std::str;
use std::time::Duration;

use crate::control::CancelToken;
use crate::fetch::{ChecksumMode, FetchError, FetchResponse, GetParams, ObjectFetcher};

use body::ReceivedBody;

/// Transfer limits applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard cap so a completely stuck transfer eventually fails.
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Ranged GET over libcurl. Stateless; one `Easy` handle per call.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    options: HttpOptions,
}

impl HttpFetcher {
    pub fn new(options: HttpOptions) -> Self {
        Self { options }
    }
}

fn curl_err(e: curl::Error) -> FetchError {
    FetchError::Transport(Box::new(e))
}

/// URL with `partNumber` / `versionId` appended.
fn request_url(key: &str, params: &GetParams) -> Result<url::Url, FetchError> {
    let mut url = url::Url::parse(key)
        .map_err(|e| FetchError::InvalidRequest(format!("bad URL {:?}: {}", key, e)))?;
    if params.part_number.is_some() || params.version_id.is_some() {
        let mut query = url.query_pairs_mut();
        if let Some(part) = params.part_number {
            query.append_pair("partNumber", &part.to_string());
        }
        if let Some(version) = &params.version_id {
            query.append_pair("versionId", version);
        }
    }
    Ok(url)
}

/// Request header lines for `params`.
fn request_headers(params: &GetParams) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(range) = &params.range {
        out.push(format!("Range: {}", range));
    }
    if let Some(tag) = &params.if_match {
        out.push(format!("If-Match: {}", tag));
    }
    if let Some(tag) = &params.if_none_match {
        out.push(format!("If-None-Match: {}", tag));
    }
    if params.checksum_mode == Some(ChecksumMode::Enabled) {
        out.push("x-amz-checksum-mode: ENABLED".to_string());
    }
    for (k, v) in &params.headers {
        out.push(format!("{}: {}", k.trim(), v.trim()));
    }
    out
}

/// io::Error describing a transfer that broke after the status line.
fn body_error(e: curl::Error) -> io::Error {
    let kind = if e.is_operation_timedout() {
        io::ErrorKind::TimedOut
    } else if e.is_partial_file() {
        io::ErrorKind::UnexpectedEof
    } else if e.is_recv_error() || e.is_read_error() {
        io::ErrorKind::ConnectionReset
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, e)
}

impl ObjectFetcher for HttpFetcher {
    fn fetch(
        &self,
        key: &str,
        params: &GetParams,
        cancel: &CancelToken,
    ) -> Result<FetchResponse, FetchError> {
        let url = request_url(key, params)?;
        let opts = self.options;

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(10).map_err(curl_err)?;
        easy.connect_timeout(opts.connect_timeout).map_err(curl_err)?;
        easy.low_speed_limit(opts.low_speed_limit).map_err(curl_err)?;
        easy.low_speed_time(opts.low_speed_time).map_err(curl_err)?;
        easy.timeout(opts.timeout).map_err(curl_err)?;
        // Enables the progress callback, which is where cancellation is polled.
        easy.progress(true).map_err(curl_err)?;

        let header_lines = request_headers(params);
        if !header_lines.is_empty() {
            let mut list = curl::easy::List::new();
            for line in &header_lines {
                list.append(line)
                    .map_err(|e| FetchError::InvalidRequest(format!("bad header {:?}: {}", line, e)))?;
            }
            easy.http_headers(list).map_err(curl_err)?;
        }

        let mut response_headers: Vec<String> = Vec::new();
        let mut data: Vec<u8> = Vec::new();
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|h| {
                    if let Ok(s) = str::from_utf8(h) {
                        let line = s.trim_end();
                        if line.starts_with("HTTP/") {
                            response_headers.clear();
                        }
                        if !line.is_empty() {
                            response_headers.push(line.to_string());
                        }
                    }
                    true
                })
                .map_err(curl_err)?;
            transfer
                .write_function(|chunk| {
                    data.extend_from_slice(chunk);
                    Ok(chunk.len())
                })
                .map_err(curl_err)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(curl_err)?;
            transfer.perform()
        };

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let (code, reason) = match parse::parse_status_line(&response_headers) {
            Some(status) => status,
            None => match performed {
                Err(e) if e.is_aborted_by_callback() => return Err(FetchError::Cancelled),
                Err(e) => return Err(curl_err(e)),
                Ok(()) => (easy.response_code().map_err(curl_err)?, String::new()),
            },
        };

        if code == 412 {
            return Err(FetchError::PreconditionFailed {
                if_match: params.if_match.clone(),
            });
        }
        if !(200..300).contains(&code) {
            return Err(FetchError::Http {
                status: code,
                message: reason,
            });
        }

        let mut metadata = parse::parse_headers(&response_headers);
        let body = match performed {
            Ok(()) => {
                if metadata.content_length == 0 {
                    metadata.content_length = data.len() as u64;
                }
                ReceivedBody::complete(data)
            }
            Err(e) => {
                tracing::debug!(url = %url, received = data.len(), error = %e, "transfer broke after response headers");
                ReceivedBody::truncated(data, body_error(e))
            }
        };

        Ok(FetchResponse {
            metadata,
            body: Box::new(body),
        })
    }
}
