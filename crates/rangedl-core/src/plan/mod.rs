//! Range math and chunk planning.
//!
//! Parses the caller's `bytes=start-end` range, computes the `Range` header for
//! the next chunk, and extracts the object total from a `Content-Range`.

mod content_range;
mod range;

pub use content_range::parse_content_range_total;
pub use range::{byte_range, parse_range, ByteSpan};
