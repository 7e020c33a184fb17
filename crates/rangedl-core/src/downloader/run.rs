//! Download coordination: probe, bounded fan-out, join, finalize.

use std::sync::mpsc;
use std::sync::Mutex;

use crate::control::CancelToken;
use crate::error::DownloadError;
use crate::fetch::{ChecksumMode, GetParams, ObjectFetcher, ObjectMetadata};
use crate::plan::{byte_range, parse_range};
use crate::storage::RangeWriter;

use super::chunk::{download_chunk, ChunkDescriptor, ChunkTarget};
use super::options::{DownloadOptions, GetObjectType};
use super::state::DownloadState;
use super::{DownloadInput, DownloadOutput, DownloadProgress, ProgressSender};

/// Everything one download call shares between the probe and its workers.
pub(crate) struct DownloadJob<'a> {
    pub(crate) fetcher: &'a dyn ObjectFetcher,
    pub(crate) input: &'a DownloadInput,
    pub(crate) writer: &'a dyn RangeWriter,
    pub(crate) options: &'a DownloadOptions,
    pub(crate) cancel: &'a CancelToken,
    pub(crate) state: DownloadState,
    progress: Option<&'a ProgressSender>,
    /// Object offset of the first byte written (start of the caller's range, else 0).
    offset: u64,
}

impl DownloadJob<'_> {
    /// The caller's params with the engine's checksum default applied.
    pub(crate) fn base_params(&self) -> GetParams {
        let mut params = self.input.params.clone();
        if params.checksum_mode.is_none() && !self.options.disable_checksum_validation {
            params.checksum_mode = Some(ChecksumMode::Enabled);
        }
        params
    }

    /// Non-blocking progress update; dropped if the receiver is behind.
    pub(crate) fn report_progress(&self, written: u64) {
        if let Some(tx) = self.progress {
            let total = self.state.total_bytes().map(|t| t.saturating_sub(self.offset));
            let _ = tx.try_send(DownloadProgress { written, total });
        }
    }

    fn reserve(&self) -> Result<(), DownloadError> {
        if let Some(total) = self.state.total_bytes() {
            let len = total.saturating_sub(self.offset);
            self.writer
                .reserve(len)
                .map_err(|source| DownloadError::Storage { offset: 0, source })?;
        }
        Ok(())
    }

    fn finalize(self) -> Result<DownloadOutput, DownloadError> {
        let offset = self.offset;
        let done = self.state.finish()?;
        let total = done.total_bytes.unwrap_or(offset.saturating_add(done.written));
        Ok(DownloadOutput {
            content_length: done.written,
            content_range: Some(format!("bytes={}-{}", offset, total.saturating_sub(1))),
            metadata: done.output.unwrap_or_default(),
        })
    }
}

/// Entry point behind `Downloader::download`.
pub(crate) fn download(
    fetcher: &dyn ObjectFetcher,
    input: &DownloadInput,
    writer: &dyn RangeWriter,
    options: &DownloadOptions,
    cancel: &CancelToken,
    progress: Option<&ProgressSender>,
) -> Result<DownloadOutput, DownloadError> {
    options.validate()?;
    if input.params.part_number == Some(0) {
        return Err(DownloadError::Config(
            "part number must be a positive integer".to_string(),
        ));
    }
    let span = input.params.range.as_deref().map(parse_range).transpose()?;
    if let Some(span) = span {
        if span.start.checked_add(options.part_size_bytes).is_none() {
            return Err(DownloadError::parse(
                input.params.range.as_deref().unwrap_or_default(),
                "start offset out of range",
            ));
        }
    }

    let job = DownloadJob {
        fetcher,
        input,
        writer,
        options,
        cancel,
        state: DownloadState::new(span.and_then(|s| s.end)),
        progress,
        offset: span.map(|s| s.start).unwrap_or(0),
    };

    tracing::info!(
        key = %input.key,
        range = ?input.params.range,
        part_number = ?input.params.part_number,
        mode = ?options.get_object_type,
        concurrency = options.concurrency,
        part_size = options.part_size_bytes,
        "starting download"
    );

    let result = if input.params.part_number.is_some() {
        single_download(&job)
    } else {
        match options.get_object_type {
            // Part boundaries are server-defined and cannot be intersected
            // with an arbitrary caller range.
            GetObjectType::Parts if span.is_some() => single_download(&job),
            GetObjectType::Parts => download_parts(job),
            GetObjectType::Ranges => download_ranges(job),
        }
    };

    match &result {
        Ok(out) => tracing::info!(key = %input.key, bytes = out.content_length, "download complete"),
        Err(e) => tracing::warn!(key = %input.key, error = %e, "download failed"),
    }
    result
}

/// One unparallelized request using the caller's params as-is.
fn single_download(job: &DownloadJob<'_>) -> Result<DownloadOutput, DownloadError> {
    let chunk = ChunkDescriptor {
        start: 0,
        target: ChunkTarget::Whole,
    };
    let meta = download_chunk(job, &chunk)?;
    Ok(DownloadOutput {
        content_length: meta.content_length,
        content_range: meta.content_range.clone(),
        metadata: meta,
    })
}

/// Probe part 1, then fan out over parts 2..=N assuming uniform part size.
fn download_parts(job: DownloadJob<'_>) -> Result<DownloadOutput, DownloadError> {
    let first = probe(&job, ChunkTarget::Part(1), 0)?;
    let parts = first.parts_count.unwrap_or(1);
    if parts > 1 {
        job.reserve()?;
        let part_size = first.content_length;
        let mut pos = first.content_length;
        let chunks = (2..=parts).map(|part| {
            let chunk = ChunkDescriptor {
                start: pos - job.offset,
                target: ChunkTarget::Part(part),
            };
            pos = pos.saturating_add(part_size);
            chunk
        });
        fan_out(&job, chunks);
    }
    job.finalize()
}

/// Probe the first byte range, then fan out over the rest until the total is covered.
fn download_ranges(job: DownloadJob<'_>) -> Result<DownloadOutput, DownloadError> {
    let part_size = job.options.part_size_bytes;
    let first_range = byte_range(job.offset, part_size, job.state.total_bytes());
    let first = probe(&job, ChunkTarget::Range(first_range), job.offset)?;

    if let Some(total) = job.state.total_bytes() {
        job.reserve()?;
        let mut pos = job.offset.saturating_add(first.content_length);
        let chunks = std::iter::from_fn(|| {
            if pos >= total {
                return None;
            }
            let chunk = ChunkDescriptor {
                start: pos - job.offset,
                target: ChunkTarget::Range(byte_range(pos, part_size, Some(total))),
            };
            pos = pos.saturating_add(part_size);
            Some(chunk)
        });
        fan_out(&job, chunks);
    }
    job.finalize()
}

/// Synchronous first request; its response is the only source of total size,
/// part count and ETag, so fan-out waits for it.
fn probe(job: &DownloadJob<'_>, target: ChunkTarget, pos: u64) -> Result<ObjectMetadata, DownloadError> {
    let chunk = ChunkDescriptor {
        start: pos - job.offset,
        target,
    };
    let meta = download_chunk(job, &chunk)?;
    tracing::debug!(
        total = ?job.state.total_bytes(),
        parts = ?meta.parts_count,
        etag = ?meta.etag,
        "probe complete"
    );
    Ok(meta)
}

/// Feed `chunks` through a bounded queue to `concurrency` workers and wait for
/// them. The producer blocks while the queue is full and stops on the first
/// recorded error or on cancel; workers keep draining so the producer never
/// deadlocks, but skip fetching once an error is recorded.
fn fan_out<I>(job: &DownloadJob<'_>, chunks: I)
where
    I: Iterator<Item = ChunkDescriptor>,
{
    let workers = job.options.concurrency;
    let (tx, rx) = mpsc::sync_channel::<ChunkDescriptor>(workers);
    let rx = Mutex::new(rx);

    std::thread::scope(|s| {
        for worker_id in 0..workers {
            let rx = &rx;
            s.spawn(move || worker_loop(job, rx, worker_id));
        }

        for chunk in chunks {
            if job.state.has_err() {
                break;
            }
            if job.cancel.is_cancelled() {
                job.state.set_err(DownloadError::Cancelled);
                break;
            }
            if tx.send(chunk).is_err() {
                break;
            }
        }
        drop(tx);
    });
}

fn worker_loop(job: &DownloadJob<'_>, rx: &Mutex<mpsc::Receiver<ChunkDescriptor>>, worker_id: usize) {
    loop {
        let next = {
            let guard = rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.recv()
        };
        let Ok(chunk) = next else {
            break;
        };
        if job.state.has_err() {
            continue;
        }
        if job.cancel.is_cancelled() {
            job.state.set_err(DownloadError::Cancelled);
            continue;
        }
        if let Err(e) = download_chunk(job, &chunk) {
            tracing::debug!(worker_id, start = chunk.start, error = %e, "chunk failed");
            job.state.set_err(e);
        }
    }
}
