//! Growable buffer for building an outgoing client message.

use bytes::{BufMut, Bytes, BytesMut};

/// Writer for a single outgoing client message.
///
/// Appends primitives to an internal `BytesMut` and freezes the result into
/// an immutable [`Bytes`] payload. Integers are written Little Endian.
///
/// # Example
///
/// ```
/// use mongosql_auth_client::protocol::MessageWriter;
///
/// let mut writer = MessageWriter::new();
/// writer.put_u8(1);
/// writer.put_blob(b"response");
///
/// let msg = writer.into_bytes();
/// assert_eq!(&msg[..5], &[1, 8, 0, 0, 0]);
/// assert_eq!(&msg[5..], b"response");
/// ```
#[derive(Debug, Default)]
pub struct MessageWriter {
    buf: BytesMut,
}

impl MessageWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Append a single byte.
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Append a 32-bit integer, little-endian.
    #[inline]
    pub fn put_i32_le(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    /// Append raw bytes with no length prefix.
    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Append a length-prefixed blob (`len:i32 LE` then the bytes).
    pub fn put_blob(&mut self, bytes: &[u8]) {
        self.put_i32_le(bytes.len() as i32);
        self.put_slice(bytes);
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the accumulated bytes into an immutable message.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
