//! Per-chunk retry policy.
//!
//! Only body-stream failures are retried: the request went through and the
//! server answered, but copying the body broke. Call-level failures (status
//! codes, transport, stale ETag), storage failures and cancellation end the
//! chunk immediately.

mod classify;
mod policy;
mod run;

pub use classify::classify;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
