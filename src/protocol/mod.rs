//! Protocol module - wire format for handshake messages.
//!
//! The `mongosql_auth` exchange rides inside MySQL auth-switch packets, so
//! there is no header or end-of-message marker at this layer: the transport
//! frame defines the message length. This module only provides the primitive
//! readers and writers used by the session:
//!
//! - [`MessageReader`] - cursor over an incoming server message
//! - [`MessageWriter`] - growable buffer for an outgoing client message
//!
//! All multi-byte integers are Little Endian.

mod reader;
mod writer;

pub use reader::MessageReader;
pub use writer::MessageWriter;
