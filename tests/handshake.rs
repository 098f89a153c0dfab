//! Integration tests for the full handshake flow.
//!
//! These drive a [`Session`] end to end against a simulated server,
//! exercising negotiation, multi-instance sub-challenge distribution, and
//! response framing together.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};

use mongosql_auth_client::{Session, State};

type HmacSha256 = Hmac<Sha256>;

/// Surface the crate's tracing output when a test runs with `RUST_LOG` set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a negotiation server message: null-terminated mechanism name,
/// evaluator count, then one length-prefixed sub-challenge per instance.
fn negotiation_message(mechanism: &str, challenges: &[&[u8]]) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(mechanism.as_bytes());
    msg.push(0);
    msg.extend_from_slice(&(challenges.len() as i32).to_le_bytes());
    for challenge in challenges {
        msg.extend_from_slice(&(challenge.len() as i32).to_le_bytes());
        msg.extend_from_slice(challenge);
    }
    msg
}

/// Build an exchange server message: length-prefixed sub-challenges only.
fn exchange_message(challenges: &[&[u8]]) -> Vec<u8> {
    let mut msg = Vec::new();
    for challenge in challenges {
        msg.extend_from_slice(&(challenge.len() as i32).to_le_bytes());
        msg.extend_from_slice(challenge);
    }
    msg
}

/// Split a client message into `(complete, response)` entries.
fn parse_entries(message: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos < message.len() {
        let complete = message[pos];
        let len =
            i32::from_le_bytes(message[pos + 1..pos + 5].try_into().unwrap()) as usize;
        entries.push((complete, message[pos + 5..pos + 5 + len].to_vec()));
        pos += 5 + len;
    }
    entries
}

fn step(session: &mut Session, from_server: &[u8]) -> Vec<Bytes> {
    let mut to_server = Vec::new();
    assert!(session.step(Some(from_server), &mut to_server));
    to_server
}

#[test]
fn test_plain_handshake_end_to_end() {
    init_tracing();
    let mut session = Session::new("alice", "secret");
    session.bind_host("db.example.com");

    // Bootstrap: the MySQL auth-switch greeting gets an empty reply.
    let out = step(&mut session, b"greeting");
    assert_eq!(out.len(), 1);
    assert!(out[0].is_empty());

    // Negotiation with one PLAIN instance and an empty first sub-challenge.
    let out = step(&mut session, &negotiation_message("PLAIN", &[b""]));
    let entries = parse_entries(&out[0]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, 1);
    assert_eq!(entries[0].1, b"\0alice\0secret");
    assert_eq!(session.state(), State::Exchanging);
}

#[test]
fn test_scram_sha256_handshake_with_parallel_instances() {
    let user = "user";
    let password = "pencil";
    let salt = b"0123456789abcdef";
    let iterations = 4096u32;

    init_tracing();
    let mut session = Session::new(user, password);
    let out = step(&mut session, b"greeting");
    assert!(out[0].is_empty());

    // Two parallel SCRAM conversations, both starting from an empty
    // sub-challenge.
    let out = step(
        &mut session,
        &negotiation_message("SCRAM-SHA-256", &[b"", b""]),
    );
    let client_firsts = parse_entries(&out[0]);
    assert_eq!(client_firsts.len(), 2);

    // Server side of round one: answer each conversation independently.
    let mut server_firsts = Vec::new();
    let mut client_first_bares = Vec::new();
    for (complete, client_first) in &client_firsts {
        assert_eq!(*complete, 0);
        let client_first = std::str::from_utf8(client_first).unwrap();
        let bare = client_first.strip_prefix("n,,").unwrap();
        assert!(bare.starts_with(&format!("n={user},r=")));
        let client_nonce = bare.split_once(",r=").unwrap().1;

        server_firsts.push(format!(
            "r={client_nonce}serverext,s={},i={iterations}",
            BASE64.encode(salt)
        ));
        client_first_bares.push(bare.to_string());
    }

    let challenges: Vec<&[u8]> = server_firsts.iter().map(|s| s.as_bytes()).collect();
    let out = step(&mut session, &exchange_message(&challenges));
    let client_finals = parse_entries(&out[0]);
    assert_eq!(client_finals.len(), 2);

    // Verify each proof and issue the matching server-final.
    let mut salted = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut salted);

    let mut server_finals = Vec::new();
    for (i, (complete, client_final)) in client_finals.iter().enumerate() {
        assert_eq!(*complete, 0);
        let client_final = std::str::from_utf8(client_final).unwrap();
        let (without_proof, proof_b64) = client_final.rsplit_once(",p=").unwrap();
        assert!(without_proof.starts_with("c=biws,r="));

        let auth_message = format!(
            "{},{},{}",
            client_first_bares[i], server_firsts[i], without_proof
        );

        let client_key = hmac_sha256(&salted, b"Client Key");
        let stored_key: [u8; 32] = Sha256::digest(client_key).into();
        let client_signature = hmac_sha256(&stored_key, auth_message.as_bytes());
        let expected_proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        assert_eq!(BASE64.decode(proof_b64).unwrap(), expected_proof);

        let server_key = hmac_sha256(&salted, b"Server Key");
        let server_signature = hmac_sha256(&server_key, auth_message.as_bytes());
        server_finals.push(format!("v={}", BASE64.encode(server_signature)));
    }

    let challenges: Vec<&[u8]> = server_finals.iter().map(|s| s.as_bytes()).collect();
    let out = step(&mut session, &exchange_message(&challenges));
    for (complete, response) in parse_entries(&out[0]) {
        assert_eq!(complete, 1);
        assert!(response.is_empty());
    }

    // The host observes completion; the session never reports success
    // itself and simply keeps continuing.
    assert_eq!(session.state(), State::Exchanging);
    assert!(session.destroy().is_empty());
}

#[test]
fn test_scram_rejects_tampered_server_signature() {
    init_tracing();
    let mut session = Session::new("user", "pencil");
    step(&mut session, b"greeting");

    let out = step(&mut session, &negotiation_message("SCRAM-SHA-1", &[b""]));
    let client_first = parse_entries(&out[0]).remove(0).1;
    let bare = std::str::from_utf8(&client_first)
        .unwrap()
        .strip_prefix("n,,")
        .unwrap()
        .to_string();
    let client_nonce = bare.split_once(",r=").unwrap().1.to_string();

    let server_first = format!(
        "r={client_nonce}ext,s={},i=4096",
        BASE64.encode(b"somesalt")
    );
    step(&mut session, &exchange_message(&[server_first.as_bytes()]));

    // A forged signature must fail the whole handshake.
    let forged = exchange_message(&[b"v=Zm9yZ2VkIHNpZ25hdHVyZQ=="]);
    let mut to_server = Vec::new();
    assert!(!session.step(Some(&forged), &mut to_server));
    assert!(to_server.is_empty());
    assert_eq!(session.state(), State::Failed);
    assert!(session.last_error().is_some());
}

#[test]
fn test_handshake_stops_when_server_goes_silent() {
    init_tracing();
    let mut session = Session::new("alice", "secret");
    step(&mut session, b"greeting");
    step(&mut session, &negotiation_message("PLAIN", &[b""]));

    let mut to_server = Vec::new();
    assert!(!session.step(None, &mut to_server));
    assert!(to_server.is_empty());
    assert_eq!(session.state(), State::Failed);
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().into()
}
