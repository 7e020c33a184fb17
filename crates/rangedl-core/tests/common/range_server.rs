//! Minimal HTTP/1.1 object server for integration tests.
//!
//! Serves a single static body with an ETag. Honors `Range: bytes=X-Y`,
//! `?partNumber=N` (fixed part size, `x-amz-mp-parts-count`) and `If-Match`
//! (412 on mismatch). One request per connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const ETAG: &str = "\"3858f62230ac3c915f300c664312c63f\"";

pub struct RangeServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl RangeServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body` split into parts
/// of `part_size`. The server runs until the process exits.
pub fn start(body: Vec<u8>, part_size: u64) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            counter.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || handle(stream, &body, part_size));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/bucket/object.bin", port),
        hits,
    }
}

struct Request {
    method: String,
    part_number: Option<u64>,
    range: Option<(u64, Option<u64>)>,
    if_match: Option<String>,
}

fn handle(mut stream: TcpStream, body: &[u8], part_size: u64) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    if !req.method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    if let Some(tag) = &req.if_match {
        if tag != ETAG {
            let _ = stream.write_all(b"HTTP/1.1 412 Precondition Failed\r\nContent-Length: 0\r\n\r\n");
            return;
        }
    }

    let total = body.len() as u64;
    let mut extra = String::new();
    let (start, end_excl) = match (req.part_number, req.range) {
        (Some(part), _) => {
            let parts = total.div_ceil(part_size).max(1);
            extra.push_str(&format!("x-amz-mp-parts-count: {}\r\n", parts));
            let start = (part.saturating_sub(1)) * part_size;
            (start, (start + part_size).min(total))
        }
        (None, Some((start, end))) => {
            let end_excl = end.map_or(total, |e| (e + 1).min(total));
            (start, end_excl)
        }
        (None, None) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nETag: {}\r\n\r\n",
                total, ETAG
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
            return;
        }
    };
    if start >= total || start >= end_excl {
        let head = format!(
            "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n\r\n",
            total
        );
        let _ = stream.write_all(head.as_bytes());
        return;
    }
    let slice = &body[start as usize..end_excl as usize];
    let head = format!(
        "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nETag: {}\r\n{}\r\n",
        slice.len(),
        start,
        end_excl - 1,
        total,
        ETAG,
        extra
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(slice);
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.lines();
    let request_line = lines.next()?;
    let mut words = request_line.split_whitespace();
    let method = words.next()?.to_string();
    let target = words.next().unwrap_or("/");

    let part_number = target.split_once('?').and_then(|(_, query)| {
        query
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == "partNumber")
            .and_then(|(_, v)| v.parse::<u64>().ok())
    });

    let mut range = None;
    let mut if_match = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("range") {
            if let Some(spec) = value.strip_prefix("bytes=") {
                if let Some((a, b)) = spec.split_once('-') {
                    let start = a.trim().parse::<u64>().unwrap_or(0);
                    let end = b.trim().parse::<u64>().ok();
                    range = Some((start, end));
                }
            }
        } else if name.trim().eq_ignore_ascii_case("if-match") {
            if_match = Some(value.to_string());
        }
    }
    Some(Request {
        method,
        part_number,
        range,
        if_match,
    })
}
