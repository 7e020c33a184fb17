//! In-memory sink.

use std::io;
use std::sync::Mutex;

use super::RangeWriter;

/// Growable in-memory buffer. Writes past the end zero-fill the gap.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    buf: Mutex<Vec<u8>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RangeWriter for MemoryWriter {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds address space"))?;
        let end = start + data.len();
        let mut buf = self.lock();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        Ok(())
    }

    fn reserve(&self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds address space"))?;
        let mut buf = self.lock();
        if buf.len() < len {
            buf.resize(len, 0);
        }
        Ok(())
    }
}
