//! One chunk: request it, stream its body to the destination, retry body failures.

use std::io::{self, Read};

use crate::control::CancelToken;
use crate::error::DownloadError;
use crate::fetch::{GetParams, ObjectMetadata};
use crate::retry::run_with_retry;
use crate::storage::RangeWriter;

use super::run::DownloadJob;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// What a chunk request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChunkTarget {
    /// Whatever the caller's own params address (single-shot downloads).
    Whole,
    /// A byte range, e.g. `bytes=0-8388607`.
    Range(String),
    /// A server-defined part number.
    Part(u32),
}

/// One unit of work for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkDescriptor {
    /// Offset in the destination where the chunk's first byte goes.
    pub start: u64,
    pub target: ChunkTarget,
}

/// Why copying a body stopped.
#[derive(Debug)]
enum CopyError {
    Read(io::Error),
    Write { offset: u64, source: io::Error },
    Cancelled,
}

/// Writes a body into the destination at `start + cursor`. A fresh writer is
/// made per attempt, so a retry rewrites the chunk from its base offset.
struct ChunkWriter<'a> {
    dest: &'a dyn RangeWriter,
    start: u64,
    cursor: u64,
}

impl<'a> ChunkWriter<'a> {
    fn new(dest: &'a dyn RangeWriter, start: u64) -> Self {
        Self { dest, start, cursor: 0 }
    }

    fn copy_from(&mut self, body: &mut dyn Read, cancel: &CancelToken) -> Result<u64, CopyError> {
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Err(CopyError::Cancelled);
            }
            let n = match body.read(&mut buf) {
                Ok(0) => return Ok(self.cursor),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CopyError::Read(e)),
            };
            let offset = self.start + self.cursor;
            self.dest
                .write_at(offset, &buf[..n])
                .map_err(|source| CopyError::Write { offset, source })?;
            self.cursor += n as u64;
        }
    }
}

/// Request params for `chunk`: the caller's params plus the chunk's range or
/// part, plus If-Match once an ETag has been captured (unless a version id
/// already pins the object).
pub(crate) fn chunk_params(job: &DownloadJob<'_>, chunk: &ChunkDescriptor) -> GetParams {
    let mut params = job.base_params();
    match &chunk.target {
        ChunkTarget::Whole => {}
        ChunkTarget::Range(range) => params.range = Some(range.clone()),
        ChunkTarget::Part(part) => params.part_number = Some(*part),
    }
    if job.options.enforce_consistency && params.version_id.is_none() {
        if let Some(etag) = job.state.etag() {
            params.if_match = Some(etag);
        }
    }
    params
}

/// Download one chunk with retries. On success the byte count, ETag and
/// first output are merged into the shared state.
pub(crate) fn download_chunk(
    job: &DownloadJob<'_>,
    chunk: &ChunkDescriptor,
) -> Result<ObjectMetadata, DownloadError> {
    let params = chunk_params(job, chunk);
    let retry = job.options.retry_policy();
    let (meta, n) = run_with_retry(&retry, job.cancel, |attempt| {
        try_download_chunk(job, &params, chunk, attempt)
    })?;

    let written = job.state.add_written(n);
    job.state.capture_etag(meta.etag.as_deref());
    job.state.set_output(&meta);
    job.report_progress(written);
    tracing::debug!(start = chunk.start, bytes = n, target = ?chunk.target, "chunk complete");
    Ok(meta)
}

/// A single attempt: one call, one full body copy.
fn try_download_chunk(
    job: &DownloadJob<'_>,
    params: &GetParams,
    chunk: &ChunkDescriptor,
    attempt: u32,
) -> Result<(ObjectMetadata, u64), DownloadError> {
    if job.cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    let mut resp = job.fetcher.fetch(&job.input.key, params, job.cancel)?;
    job.state.record_total(&resp.metadata)?;

    let mut writer = ChunkWriter::new(job.writer, chunk.start);
    let n = writer
        .copy_from(&mut resp.body, job.cancel)
        .map_err(|e| match e {
            CopyError::Read(source) => DownloadError::BodyStream {
                attempts: attempt,
                source,
            },
            CopyError::Write { offset, source } => DownloadError::Storage { offset, source },
            CopyError::Cancelled => DownloadError::Cancelled,
        })?;

    let expected = resp.metadata.content_length;
    if n < expected {
        return Err(DownloadError::BodyStream {
            attempts: attempt,
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("body ended after {} of {} bytes", n, expected),
            ),
        });
    }
    Ok((resp.metadata, n))
}
