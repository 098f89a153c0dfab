//! Cursor for reading primitive fields out of a server message.

use crate::error::{Error, Result};

/// Reader over a single incoming server message.
///
/// Tracks a read position and decodes the primitives the handshake needs:
/// null-terminated strings, 32-bit little-endian integers, and
/// length-prefixed byte blobs. Running out of bytes mid-field is a
/// [`Error::MalformedMessage`]; the one sanctioned exception is
/// [`read_blob`](MessageReader::read_blob) on an exhausted buffer, which
/// yields an empty slice (evaluators past the end of the server's
/// sub-challenge list receive an empty sub-challenge).
///
/// # Example
///
/// ```
/// use mongosql_auth_client::protocol::MessageReader;
///
/// let msg = [b'P', b'L', b'A', b'I', b'N', 0, 2, 0, 0, 0];
/// let mut reader = MessageReader::new(&msg);
///
/// assert_eq!(reader.read_cstring().unwrap(), "PLAIN");
/// assert_eq!(reader.read_i32_le().unwrap(), 2);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug)]
pub struct MessageReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MessageReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check whether the message has been fully consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// Scans forward to the next zero byte or, if none is found, to the end
    /// of the buffer. The position advances past the terminator (or to the
    /// limit when the terminator is absent).
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.buf[self.pos..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let s = std::str::from_utf8(&rest[..len])
            .map_err(|_| Error::MalformedMessage("invalid UTF-8 in string field".into()))?
            .to_string();
        // +1 skips the terminator; clamp covers the missing-terminator case.
        self.pos = (self.pos + len + 1).min(self.buf.len());
        Ok(s)
    }

    /// Read a 32-bit little-endian integer.
    pub fn read_i32_le(&mut self) -> Result<i32> {
        if self.remaining() < 4 {
            return Err(Error::MalformedMessage(format!(
                "need 4 bytes for int32, have {}",
                self.remaining()
            )));
        }
        let bytes = [
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ];
        self.pos += 4;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Read a length-prefixed byte blob.
    ///
    /// Returns an empty slice when no bytes remain. Otherwise reads a 4-byte
    /// little-endian length followed by exactly that many bytes; a length
    /// that is negative or runs past the end of the message is malformed.
    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        if self.is_empty() {
            return Ok(&[]);
        }
        let len = self.read_i32_le()?;
        if len < 0 {
            return Err(Error::MalformedMessage(format!(
                "negative blob length {len}"
            )));
        }
        let len = len as usize;
        if self.remaining() < len {
            return Err(Error::MalformedMessage(format!(
                "blob length {} exceeds remaining {}",
                len,
                self.remaining()
            )));
        }
        let blob = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(blob)
    }
}
