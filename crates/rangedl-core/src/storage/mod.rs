//! Random-access download sinks.
//!
//! The engine writes each chunk at its absolute offset through [`RangeWriter`];
//! chunks never overlap, so implementations only need to be safe for
//! concurrent writes at disjoint offsets. [`StorageWriter`] is the file sink
//! (pwrite into a `.part` file, atomic finalize); [`MemoryWriter`] buffers in
//! memory.

mod memory;
mod writer;

pub use memory::MemoryWriter;
pub use writer::StorageWriter;

use std::io;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Destination that accepts writes at arbitrary offsets from many threads.
pub trait RangeWriter: Send + Sync {
    /// Write all of `data` at `offset`.
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Called once when the destination length becomes known.
    fn reserve(&self, _len: u64) -> io::Result<()> {
        Ok(())
    }
}

impl<W: RangeWriter + ?Sized> RangeWriter for &W {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        (**self).write_at(offset, data)
    }

    fn reserve(&self, len: u64) -> io::Result<()> {
        (**self).reserve(len)
    }
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}
