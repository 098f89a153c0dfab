//! SCRAM mechanism (RFC 5802, RFC 7677).
//!
//! Client side of the salted challenge-response conversation, in both the
//! SHA-1 and SHA-256 flavors MongoDB speaks. Three rounds:
//!
//! 1. client-first-message (sent as the initial response to an empty
//!    sub-challenge)
//! 2. server-first-message in, client-final-message with proof out
//! 3. server-final-message verified, empty response out
//!
//! # Known Limitations
//!
//! - **SASLprep**: no Unicode normalization (RFC 4013) is applied to the
//!   username or password. ASCII credentials work correctly; non-ASCII
//!   credentials may fail against servers that normalize strictly.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::mechanism::ChallengeEvaluator;

/// GS2 header for "no channel binding".
const GS2_HEADER: &str = "n,,";

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Hash flavor of a SCRAM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramFlavor {
    /// SCRAM-SHA-1
    Sha1,
    /// SCRAM-SHA-256
    Sha256,
}

impl ScramFlavor {
    /// The SASL mechanism name for this flavor.
    pub fn mechanism_name(self) -> &'static str {
        match self {
            Self::Sha1 => "SCRAM-SHA-1",
            Self::Sha256 => "SCRAM-SHA-256",
        }
    }

    /// Output length of the underlying hash in bytes.
    fn key_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Hi(password, salt, i): PBKDF2 with HMAC of this flavor.
    fn salted_password(self, password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<Vec<u8>> {
        let mut out = vec![0u8; self.key_len()];
        match self {
            Self::Sha1 => pbkdf2_hmac::<Sha1>(password, salt, iterations, &mut out),
            Self::Sha256 => pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out),
        }
        Zeroizing::new(out)
    }

    /// HMAC(key, data) with this flavor's hash.
    fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => {
                let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha256 => {
                let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// H(data) with this flavor's hash.
    fn h(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// Conversation state, carrying the intermediates each round needs.
enum ScramState {
    /// Ready to emit client-first-message.
    Initial,
    /// client-first sent; waiting for server-first-message.
    AwaitingServerFirst {
        /// client-first-message-bare (without the GS2 header).
        client_first_bare: String,
    },
    /// client-final sent; waiting for server-final-message.
    AwaitingServerFinal {
        /// Full auth message for signature computation.
        auth_message: String,
        /// Salted password (zeroized on drop).
        salted_password: Zeroizing<Vec<u8>>,
    },
    /// Server signature verified.
    Complete,
    /// Conversation aborted; no further rounds are possible.
    Failed,
}

/// Evaluator for the SCRAM-SHA-1 and SCRAM-SHA-256 mechanisms.
pub struct ScramEvaluator {
    flavor: ScramFlavor,
    username: String,
    password: Zeroizing<String>,
    client_nonce: String,
    state: ScramState,
}

impl ScramEvaluator {
    /// Create a SCRAM evaluator for the given flavor and credentials.
    pub fn new(flavor: ScramFlavor, username: &str, password: &str) -> Self {
        Self::with_nonce(flavor, username, password, generate_nonce())
    }

    fn with_nonce(flavor: ScramFlavor, username: &str, password: &str, nonce: String) -> Self {
        Self {
            flavor,
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            client_nonce: nonce,
            state: ScramState::Initial,
        }
    }

    /// Mechanism error carrying this conversation's flavor name.
    fn err(&self, message: impl std::fmt::Display) -> Error {
        Error::Mechanism(format!("{}: {message}", self.flavor.mechanism_name()))
    }

    /// Build the client-first-message.
    fn client_first(&self) -> (ScramState, Vec<u8>) {
        let client_first_bare = format!(
            "n={},r={}",
            escape_username(&self.username),
            self.client_nonce
        );
        let message = format!("{GS2_HEADER}{client_first_bare}");
        (
            ScramState::AwaitingServerFirst { client_first_bare },
            message.into_bytes(),
        )
    }

    /// Process server-first-message and build client-final-message.
    fn client_final(
        &self,
        client_first_bare: &str,
        challenge: &[u8],
    ) -> Result<(ScramState, Vec<u8>)> {
        let server_first = std::str::from_utf8(challenge)
            .map_err(|_| self.err("invalid UTF-8 in server-first"))?;

        let (server_nonce, salt, iterations) = parse_server_first(server_first)?;

        // The server nonce must extend ours; anything else is a replay or a
        // confused server.
        if !server_nonce.starts_with(&self.client_nonce) {
            return Err(self.err("server nonce mismatch"));
        }

        let salted_password = self
            .flavor
            .salted_password(self.password.as_bytes(), &salt, iterations);

        let channel_binding = BASE64.encode(GS2_HEADER.as_bytes());
        let client_final_without_proof = format!("c={channel_binding},r={server_nonce}");

        let auth_message =
            format!("{client_first_bare},{server_first},{client_final_without_proof}");

        // ClientKey = HMAC(SaltedPassword, "Client Key")
        // StoredKey = H(ClientKey)
        // ClientProof = ClientKey XOR HMAC(StoredKey, AuthMessage)
        let client_key = self.flavor.hmac(&salted_password, b"Client Key");
        let stored_key = self.flavor.h(&client_key);
        let client_signature = self.flavor.hmac(&stored_key, auth_message.as_bytes());
        let client_proof = xor_bytes(&client_key, &client_signature);

        let message = format!(
            "{client_final_without_proof},p={}",
            BASE64.encode(client_proof)
        );

        Ok((
            ScramState::AwaitingServerFinal {
                auth_message,
                salted_password,
            },
            message.into_bytes(),
        ))
    }

    /// Verify the server-final-message, completing mutual authentication.
    fn verify_server_final(
        &self,
        auth_message: &str,
        salted_password: &[u8],
        challenge: &[u8],
    ) -> Result<()> {
        let server_final = std::str::from_utf8(challenge)
            .map_err(|_| self.err("invalid UTF-8 in server-final"))?;

        if let Some(server_error) = server_final.strip_prefix("e=") {
            return Err(self.err(format!("server error: {server_error}")));
        }

        let Some(signature_b64) = server_final.strip_prefix("v=") else {
            return Err(self.err("invalid server-final format"));
        };

        let received = BASE64
            .decode(signature_b64)
            .map_err(|_| self.err("invalid base64 in server signature"))?;

        // ServerSignature = HMAC(HMAC(SaltedPassword, "Server Key"), AuthMessage)
        let server_key = self.flavor.hmac(salted_password, b"Server Key");
        let expected = self.flavor.hmac(&server_key, auth_message.as_bytes());

        if received.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(self.err("server signature verification failed"))
        }
    }
}

impl ChallengeEvaluator for ScramEvaluator {
    fn evaluate(&mut self, challenge: &[u8]) -> Result<Vec<u8>> {
        // Take the state out; error paths leave the conversation Failed.
        match std::mem::replace(&mut self.state, ScramState::Failed) {
            ScramState::Initial => {
                let (state, message) = self.client_first();
                self.state = state;
                Ok(message)
            }
            ScramState::AwaitingServerFirst { client_first_bare } => {
                let (state, message) = self.client_final(&client_first_bare, challenge)?;
                self.state = state;
                Ok(message)
            }
            ScramState::AwaitingServerFinal {
                auth_message,
                salted_password,
            } => {
                self.verify_server_final(&auth_message, &salted_password, challenge)?;
                self.state = ScramState::Complete;
                Ok(Vec::new())
            }
            ScramState::Complete => {
                self.state = ScramState::Complete;
                Ok(Vec::new())
            }
            ScramState::Failed => Err(self.err("conversation already failed")),
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self.state, ScramState::Complete)
    }

    fn dispose(&mut self) -> Result<()> {
        self.state = ScramState::Failed;
        Ok(())
    }
}

/// Generate a random printable nonce.
fn generate_nonce() -> String {
    use rand::Rng;
    let nonce_bytes: [u8; 24] = rand::thread_rng().gen();
    BASE64.encode(nonce_bytes)
}

/// Escape the username per RFC 5802: `=` becomes `=3D`, `,` becomes `=2C`.
fn escape_username(username: &str) -> String {
    let mut escaped = String::with_capacity(username.len());
    for c in username.chars() {
        match c {
            '=' => escaped.push_str("=3D"),
            ',' => escaped.push_str("=2C"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Parse server-first-message: `r=<nonce>,s=<salt>,i=<iterations>[,...]`.
fn parse_server_first(message: &str) -> Result<(String, Vec<u8>, u32)> {
    let mut nonce = None;
    let mut salt = None;
    let mut iterations = None;

    for part in message.split(',') {
        if let Some(value) = part.strip_prefix("r=") {
            nonce = Some(value.to_string());
        } else if let Some(value) = part.strip_prefix("s=") {
            salt = Some(
                BASE64
                    .decode(value)
                    .map_err(|_| Error::Mechanism("SCRAM: invalid base64 in salt".into()))?,
            );
        } else if let Some(value) = part.strip_prefix("i=") {
            iterations = Some(
                value
                    .parse::<u32>()
                    .map_err(|_| Error::Mechanism("SCRAM: invalid iteration count".into()))?,
            );
        }
    }

    match (nonce, salt, iterations) {
        (Some(n), Some(s), Some(i)) => Ok((n, s, i)),
        _ => Err(Error::Mechanism(
            "SCRAM: missing required field in server-first".into(),
        )),
    }
}

/// XOR two equal-length byte slices.
fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}
