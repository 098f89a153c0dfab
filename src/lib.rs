//! # mongosql-auth-client
//!
//! Client side of the `mongosql_auth` MySQL authentication plugin: a
//! pluggable SASL-style handshake carried inside MySQL auth-switch packets,
//! used to authenticate against MongoDB's SQL interface.
//!
//! ## Architecture
//!
//! - **Session** ([`Session`]): the per-connection state machine - first
//!   empty bootstrap payload, mechanism negotiation, then challenge/response
//!   rounds over N parallel mechanism instances packed into single messages.
//! - **Mechanisms** ([`mechanism`]): SCRAM-SHA-1, SCRAM-SHA-256, PLAIN, and
//!   (behind the `gssapi` feature) Kerberos, each driven through the
//!   [`mechanism::ChallengeEvaluator`] capability.
//! - **Wire format** ([`protocol`]): little-endian primitive readers and
//!   writers; the transport frame defines message boundaries.
//!
//! Transport, connection pooling, and SQL execution belong to the host
//! driver; this crate only turns server payloads into client payloads.
//!
//! ## Example
//!
//! ```ignore
//! use mongosql_auth_client::Session;
//!
//! let mut session = Session::new("alice?serviceName=mongosql", "secret");
//! session.bind_host("db.example.com");
//!
//! let mut to_server = Vec::new();
//! while session.step(receive(), &mut to_server) {
//!     for message in &to_server {
//!         send(message);
//!     }
//! }
//! ```

pub mod error;
pub mod mechanism;
pub mod params;
pub mod protocol;

mod session;

pub use error::{Error, Result};
pub use session::{Session, State, MAX_EVALUATORS, PLUGIN_NAME};
