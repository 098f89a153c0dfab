//! Error types for mongosql-auth-client.

use thiserror::Error;

/// Main error type for all handshake operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server negotiated a mechanism this client does not recognize.
    #[error("unsupported SASL mechanism: {0}")]
    UnsupportedMechanism(String),

    /// A recognized mechanism was negotiated but support for it is not
    /// compiled into this build (e.g. the `gssapi` feature is disabled).
    #[error("SASL mechanism {0} is not available in this build")]
    MechanismUnavailable(&'static str),

    /// A mechanism engine failed while processing a sub-challenge.
    #[error("mechanism evaluation failed: {0}")]
    Mechanism(String),

    /// A server message ended before a required field could be read.
    #[error("malformed server message: {0}")]
    MalformedMessage(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
