//! Handshake session - the per-connection authentication state machine.
//!
//! One [`Session`] drives the client side of the `mongosql_auth` handshake
//! for exactly one connection attempt:
//!
//! 1. **Bootstrap** - the first `step` call always answers with a single
//!    empty payload, whatever the server sent.
//! 2. **Negotiation** - the next server message names the mechanism and how
//!    many parallel conversations to run; that many evaluators are created,
//!    then the same call falls through into the exchange.
//! 3. **Exchange** - every round distributes one length-prefixed
//!    sub-challenge to each evaluator in creation order and packs each
//!    response as `(complete:u8, len:i32 LE, bytes)` into one outgoing
//!    message.
//!
//! There is no success state: the host observes completion when the server
//! accepts the final message. Any failure latches the session; `step` then
//! keeps returning `false` and [`Session::last_error`] says why.
//!
//! # Example
//!
//! ```ignore
//! use mongosql_auth_client::Session;
//!
//! let mut session = Session::new("alice?serviceName=mongosql", "secret");
//! session.bind_host("db.example.com");
//!
//! let mut to_server = Vec::new();
//! while session.step(receive_from_server(), &mut to_server) {
//!     for message in &to_server {
//!         send_to_server(message);
//!     }
//! }
//! session.destroy();
//! ```

use bytes::Bytes;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::mechanism::{self, ChallengeEvaluator};
use crate::params::find_parameter;
use crate::protocol::{MessageReader, MessageWriter};

/// Name of the MySQL authentication plugin this client implements.
pub const PLUGIN_NAME: &str = "mongosql_auth";

/// Upper bound on the negotiated evaluator count. A count beyond this is a
/// corrupt or hostile message, not a real negotiation.
pub const MAX_EVALUATORS: i32 = 4096;

/// Resting states of the handshake.
///
/// The bootstrap round is the one-shot `Idle -> Negotiating` edge taken by
/// the first `step` call, not a state the session rests in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Created; no `step` call yet.
    Idle,
    /// Empty first payload sent; the next server message negotiates.
    Negotiating,
    /// Evaluators created; rounds are pure challenge/response.
    Exchanging,
    /// Terminal. Missing server message, or a parse or mechanism error.
    Failed,
}

/// Client-side handshake session for one connection attempt.
///
/// Not reusable: once a handshake fails or completes, a new connection
/// attempt needs a fresh session.
pub struct Session {
    user: String,
    password: Zeroizing<String>,
    host: Option<String>,
    service_name: Option<String>,
    state: State,
    evaluators: Vec<Box<dyn ChallengeEvaluator>>,
    last_error: Option<Error>,
}

impl Session {
    /// Create a session from the configured credentials.
    ///
    /// A `?...` suffix on the user is a parameter block, not part of the
    /// username: it is stripped from the stored user, while `serviceName`
    /// is extracted from the raw string.
    pub fn new(user: &str, password: &str) -> Self {
        let stored_user = match user.find('?') {
            Some(idx) => &user[..idx],
            None => user,
        };
        Self {
            user: stored_user.to_string(),
            password: Zeroizing::new(password.to_string()),
            host: None,
            service_name: find_parameter("serviceName", user).map(str::to_string),
            state: State::Idle,
            evaluators: Vec::new(),
            last_error: None,
        }
    }

    /// Record the peer host, for mechanisms that need it (GSSAPI).
    pub fn bind_host(&mut self, host: &str) {
        self.host = Some(host.to_string());
    }

    /// The username with any parameter suffix stripped.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The `serviceName` parameter extracted from the raw user string.
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// Current handshake state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Why the handshake stopped, when `step` has returned `false` for a
    /// reason other than the server sending nothing.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The plugin never encrypts the channel itself.
    pub fn requires_confidentiality(&self) -> bool {
        false
    }

    /// Sessions are bound to a single connection attempt.
    pub fn is_reusable(&self) -> bool {
        false
    }

    /// Advance the handshake by one round.
    ///
    /// `to_server` is cleared, then at most one outgoing message is
    /// appended. Returns `true` to continue the handshake; `false` when the
    /// server sent nothing (`from_server` is `None`) or a parse or
    /// mechanism error occurred. A `false` return latches the session in
    /// [`State::Failed`].
    pub fn step(&mut self, from_server: Option<&[u8]>, to_server: &mut Vec<Bytes>) -> bool {
        to_server.clear();

        let Some(from_server) = from_server else {
            tracing::debug!("handshake ended: no message from server");
            self.state = State::Failed;
            return false;
        };

        if self.state == State::Failed {
            return false;
        }

        if self.state == State::Idle {
            // Bootstrap round: the server's greeting is answered with an
            // empty payload, whatever it contained.
            self.state = State::Negotiating;
            to_server.push(Bytes::new());
            return true;
        }

        match self.advance(from_server) {
            Ok(message) => {
                to_server.push(message);
                true
            }
            Err(err) => {
                tracing::warn!("authentication handshake failed: {err}");
                self.state = State::Failed;
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Negotiate if this is the first real server message, then run one
    /// exchange round over all evaluators.
    fn advance(&mut self, from_server: &[u8]) -> Result<Bytes> {
        let mut reader = MessageReader::new(from_server);

        if self.state == State::Negotiating {
            let mechanism = reader.read_cstring()?;
            let count = reader.read_i32_le()?;
            if !(0..=MAX_EVALUATORS).contains(&count) {
                return Err(Error::MalformedMessage(format!(
                    "evaluator count {count} out of range"
                )));
            }
            for _ in 0..count {
                self.evaluators.push(mechanism::create(
                    &mechanism,
                    &self.user,
                    &self.password,
                    self.host.as_deref(),
                    self.service_name.as_deref(),
                )?);
            }
            tracing::debug!(mechanism = %mechanism, instances = count, "negotiated SASL mechanism");
            self.state = State::Exchanging;
        }

        let mut writer = MessageWriter::new();
        for evaluator in &mut self.evaluators {
            // An exhausted buffer yields an empty sub-challenge; evaluators
            // past the server's last blob still get their turn.
            let challenge = reader.read_blob()?;
            let response = evaluator.evaluate(challenge)?;
            writer.put_u8(u8::from(evaluator.is_complete()));
            writer.put_blob(&response);
        }
        tracing::trace!(
            evaluators = self.evaluators.len(),
            bytes = writer.len(),
            "packed exchange round"
        );
        Ok(writer.into_bytes())
    }

    /// Tear the session down, disposing every evaluator.
    ///
    /// Dispose errors are never propagated; they are logged and collected
    /// into the returned diagnostic list for hosts that care.
    pub fn destroy(&mut self) -> Vec<Error> {
        let mut errors = Vec::new();
        for evaluator in &mut self.evaluators {
            if let Err(err) = evaluator.dispose() {
                tracing::warn!("error disposing SASL evaluator: {err}");
                errors.push(err);
            }
        }
        self.evaluators.clear();
        errors
    }
}
