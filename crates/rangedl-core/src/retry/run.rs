//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;
use crate::error::DownloadError;

/// Runs `f(attempt)` (attempt is 1-based) until it succeeds or the retry
/// policy says to stop. On a retryable failure, sleeps for the backoff
/// duration then tries again; a cancel observed after the sleep ends the loop.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, DownloadError>
where
    F: FnMut(u32) -> Result<T, DownloadError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, delay_ms = d.as_millis() as u64, error = %e, "retrying chunk");
                        std::thread::sleep(d);
                        if cancel.is_cancelled() {
                            return Err(DownloadError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
