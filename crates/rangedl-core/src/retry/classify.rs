//! Map download errors onto retry kinds.

use crate::error::DownloadError;
use crate::retry::policy::ErrorKind;

/// Classify a chunk error for retry decisions.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::BodyStream { .. } => ErrorKind::BodyStream,
        DownloadError::Call(_) => ErrorKind::Call,
        DownloadError::Storage { .. } => ErrorKind::Storage,
        DownloadError::Cancelled => ErrorKind::Cancelled,
        DownloadError::Config(_) | DownloadError::Parse { .. } => ErrorKind::Other,
    }
}
