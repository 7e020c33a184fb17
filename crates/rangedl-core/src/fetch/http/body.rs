//! Response body handed back by the HTTP fetcher.

use std::io::{self, Cursor, Read};

/// Replays the bytes curl received, then reports the transfer error (if any)
/// once the bytes run out. A transfer that broke after a 2xx status therefore
/// surfaces as a body read failure, not a call failure.
pub(crate) struct ReceivedBody {
    data: Cursor<Vec<u8>>,
    trailing_error: Option<io::Error>,
}

impl ReceivedBody {
    pub(crate) fn complete(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
            trailing_error: None,
        }
    }

    pub(crate) fn truncated(data: Vec<u8>, error: io::Error) -> Self {
        Self {
            data: Cursor::new(data),
            trailing_error: Some(error),
        }
    }
}

impl Read for ReceivedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(e) = self.trailing_error.take() {
                return Err(e);
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_body_reads_to_eof() {
        let mut body = ReceivedBody::complete(b"abc".to_vec());
        let mut out = Vec::new();
        body.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn truncated_body_fails_after_data() {
        let mut body = ReceivedBody::truncated(
            b"ab".to_vec(),
            io::Error::new(io::ErrorKind::UnexpectedEof, "closed early"),
        );
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).unwrap(), 2);
        let err = body.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
