//! Mechanism module - challenge evaluators and their factory.
//!
//! The handshake core never looks inside a mechanism: each negotiated
//! mechanism instance is driven through the [`ChallengeEvaluator`]
//! capability, one sub-challenge in, one response out, until the instance
//! reports completion. The mechanisms themselves:
//!
//! - [`ScramEvaluator`] - SCRAM-SHA-1 / SCRAM-SHA-256 (RFC 5802 / RFC 7677)
//! - [`PlainEvaluator`] - PLAIN credential encoding (RFC 4616)
//! - GSSAPI / Kerberos, behind the `gssapi` feature
//!
//! The factory is a pure function from mechanism name to evaluator; it
//! performs no caching, so every negotiation gets fresh instances.

mod plain;
mod scram;

#[cfg(feature = "gssapi")]
mod gssapi;

pub use plain::PlainEvaluator;
pub use scram::{ScramEvaluator, ScramFlavor};

#[cfg(feature = "gssapi")]
pub use gssapi::GssapiEvaluator;

use crate::error::{Error, Result};

/// Service name used for Kerberos when the user string carries none.
pub const DEFAULT_SERVICE_NAME: &str = "mongosql";

/// One running instance of a mechanism's challenge/response state.
///
/// Evaluators are created in a batch during negotiation and fed
/// sub-challenges in creation order, one per exchange round. The internal
/// protocol state is owned entirely by the mechanism.
pub trait ChallengeEvaluator {
    /// Process one sub-challenge and produce the response bytes.
    ///
    /// The first sub-challenge of a conversation may be empty for
    /// mechanisms that send an initial response (SCRAM, PLAIN).
    fn evaluate(&mut self, challenge: &[u8]) -> Result<Vec<u8>>;

    /// Whether the mechanism's conversation has finished successfully.
    fn is_complete(&self) -> bool;

    /// Release any resources held by the instance.
    fn dispose(&mut self) -> Result<()>;
}

/// The closed set of mechanisms this client recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// SCRAM with SHA-1 (MongoDB's historical default).
    ScramSha1,
    /// SCRAM with SHA-256.
    ScramSha256,
    /// Plaintext credentials, for LDAP proxy authentication.
    Plain,
    /// Kerberos via GSSAPI.
    Gssapi,
}

impl Mechanism {
    /// Parse a negotiated mechanism name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCRAM-SHA-1" => Some(Self::ScramSha1),
            "SCRAM-SHA-256" => Some(Self::ScramSha256),
            "PLAIN" => Some(Self::Plain),
            "GSSAPI" => Some(Self::Gssapi),
            _ => None,
        }
    }

    /// The SASL name of the mechanism.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScramSha1 => "SCRAM-SHA-1",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::Plain => "PLAIN",
            Self::Gssapi => "GSSAPI",
        }
    }
}

/// Construct a fresh evaluator for a negotiated mechanism name.
///
/// Each constructor receives only the slice of session identity it needs:
/// SCRAM and PLAIN take the credentials, GSSAPI takes the principal plus
/// the peer host and service name.
///
/// # Errors
///
/// [`Error::UnsupportedMechanism`] for a name outside the recognized set,
/// [`Error::MechanismUnavailable`] when GSSAPI is negotiated but the
/// `gssapi` feature is disabled.
pub fn create(
    mechanism: &str,
    user: &str,
    password: &str,
    host: Option<&str>,
    service_name: Option<&str>,
) -> Result<Box<dyn ChallengeEvaluator>> {
    match Mechanism::from_name(mechanism) {
        Some(Mechanism::ScramSha1) => Ok(Box::new(ScramEvaluator::new(
            ScramFlavor::Sha1,
            user,
            password,
        ))),
        Some(Mechanism::ScramSha256) => Ok(Box::new(ScramEvaluator::new(
            ScramFlavor::Sha256,
            user,
            password,
        ))),
        Some(Mechanism::Plain) => Ok(Box::new(PlainEvaluator::new(user, password))),
        #[cfg(feature = "gssapi")]
        Some(Mechanism::Gssapi) => Ok(Box::new(GssapiEvaluator::new(
            user,
            host.unwrap_or(""),
            service_name.unwrap_or(DEFAULT_SERVICE_NAME),
        )?)),
        #[cfg(not(feature = "gssapi"))]
        Some(Mechanism::Gssapi) => {
            let _ = (host, service_name);
            Err(Error::MechanismUnavailable("GSSAPI"))
        }
        None => Err(Error::UnsupportedMechanism(mechanism.to_string())),
    }
}
