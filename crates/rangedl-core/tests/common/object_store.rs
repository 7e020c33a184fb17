//! In-memory object store implementing `ObjectFetcher` with scripted faults.
//!
//! Serves one object by byte range, by part number (fixed part size) or
//! whole. Records every request, counts concurrent requests and can fail
//! bodies, change the ETag or trip a cancel token on a given call.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rangedl_core::control::CancelToken;
use rangedl_core::fetch::{FetchError, FetchResponse, GetParams, ObjectFetcher, ObjectMetadata};
use rangedl_core::plan::parse_range;

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct MemoryObjectStore {
    data: Vec<u8>,
    part_size: u64,
    etag: Mutex<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GetParams>>,
    counters: Arc<Counters>,
    /// Response start offset -> remaining body failures.
    body_failures: Mutex<HashMap<u64, u32>>,
    /// After this many calls the object is replaced (new ETag).
    change_etag_after: Option<usize>,
    /// On this call (1-based) the token is cancelled after the response is built.
    cancel_on_call: Option<(usize, CancelToken)>,
    delay: Duration,
}

impl MemoryObjectStore {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            part_size: super::PART,
            etag: Mutex::new("\"v1\"".to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
            body_failures: Mutex::new(HashMap::new()),
            change_etag_after: None,
            cancel_on_call: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Fail the body of the response starting at `start` this many times.
    pub fn fail_body(self, start: u64, times: u32) -> Self {
        self.body_failures.lock().unwrap().insert(start, times);
        self
    }

    pub fn change_etag_after(mut self, calls: usize) -> Self {
        self.change_etag_after = Some(calls);
        self
    }

    pub fn cancel_on_call(mut self, call: usize, token: CancelToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Hold each request open for `delay` so concurrent requests overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GetParams> {
        self.requests.lock().unwrap().clone()
    }

    fn parts_count(&self) -> u32 {
        let len = self.data.len() as u64;
        len.div_ceil(self.part_size).max(1) as u32
    }

    fn respond(&self, params: &GetParams) -> Result<(u64, u64, ObjectMetadata), FetchError> {
        let total = self.data.len() as u64;
        let etag = self.etag.lock().unwrap().clone();
        if let Some(expected) = &params.if_match {
            if *expected != etag {
                return Err(FetchError::PreconditionFailed {
                    if_match: Some(expected.clone()),
                });
            }
        }

        let (start, end, ranged, parts_count) = if let Some(part) = params.part_number {
            let start = (part as u64 - 1) * self.part_size;
            if start >= total {
                return Err(FetchError::Http {
                    status: 416,
                    message: "Requested Range Not Satisfiable".to_string(),
                });
            }
            let end = (start + self.part_size).min(total);
            let mut span = (start, end);
            // A caller range alongside a part number narrows the part.
            if let Some(range) = &params.range {
                let r = parse_range(range).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
                span = (start + r.start, r.end.map_or(end, |e| (start + e).min(end)));
            }
            (span.0, span.1, true, Some(self.parts_count()))
        } else if let Some(range) = &params.range {
            let r = parse_range(range).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            if r.start >= total {
                return Err(FetchError::Http {
                    status: 416,
                    message: "Requested Range Not Satisfiable".to_string(),
                });
            }
            (r.start, r.end.map_or(total, |e| e.min(total)), true, None)
        } else {
            (0, total, false, None)
        };

        let meta = ObjectMetadata {
            content_length: end - start,
            content_range: ranged.then(|| format!("bytes {}-{}/{}", start, end - 1, total)),
            etag: Some(etag),
            parts_count,
            content_type: Some("application/octet-stream".to_string()),
            ..ObjectMetadata::default()
        };
        Ok((start, end, meta))
    }
}

impl ObjectFetcher for MemoryObjectStore {
    fn fetch(
        &self,
        _key: &str,
        params: &GetParams,
        cancel: &CancelToken,
    ) -> Result<FetchResponse, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(params.clone());
        let guard = InFlight::enter(&self.counters);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let response = self.respond(params);

        if self.change_etag_after == Some(call) {
            *self.etag.lock().unwrap() = "\"v2\"".to_string();
        }
        if let Some((n, token)) = &self.cancel_on_call {
            if *n == call {
                token.cancel();
            }
        }

        let (start, end, metadata) = response?;
        let slice = self.data[start as usize..end as usize].to_vec();
        let fail = {
            let mut failures = self.body_failures.lock().unwrap();
            match failures.get_mut(&start) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        Ok(FetchResponse {
            metadata,
            body: Box::new(ScriptedBody {
                data: io::Cursor::new(slice),
                fail_at: fail.then_some((end - start) / 2),
                read: 0,
                _guard: guard,
            }),
        })
    }
}

/// Counts a request as in flight until its body is dropped.
struct InFlight {
    counters: Arc<Counters>,
}

impl InFlight {
    fn enter(counters: &Arc<Counters>) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self {
            counters: Arc::clone(counters),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Body that optionally breaks with a connection reset after `fail_at` bytes.
struct ScriptedBody {
    data: io::Cursor<Vec<u8>>,
    fail_at: Option<u64>,
    read: u64,
    _guard: InFlight,
}

impl Read for ScriptedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = match self.fail_at {
            Some(at) if self.read >= at => {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"));
            }
            Some(at) => ((at - self.read) as usize).min(buf.len()),
            None => buf.len(),
        };
        let n = self.data.read(&mut buf[..limit])?;
        self.read += n as u64;
        Ok(n)
    }
}
