//! Concurrent chunked object downloads.
//!
//! A [`Downloader`] splits one logical object into byte ranges or server-side
//! parts, fetches them in parallel through an [`ObjectFetcher`], and writes
//! each chunk at its position in a [`RangeWriter`].

pub mod checksum;
pub mod config;
pub mod control;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod plan;
pub mod retry;
pub mod storage;

pub use control::CancelToken;
pub use downloader::{
    download, DownloadInput, DownloadOptions, DownloadOutput, DownloadProgress, Downloader,
    GetObjectType,
};
pub use error::DownloadError;
pub use fetch::{FetchError, FetchResponse, GetParams, ObjectFetcher, ObjectMetadata};
pub use storage::RangeWriter;
