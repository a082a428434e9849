#![allow(dead_code)] // not every test binary uses every helper

//! A scripted ssh-agent that tests can point `Agent` at.
//!
//! Serves the list and sign requests over a real UNIX socket, with
//! deterministic fake signatures, the way deterministic signature schemes
//! (RSA, Ed25519) behave in a real agent.

use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::thread;

use sha1::{Digest, Sha1};
use tempfile::TempDir;

use shovel::codec::{Reader, Writer};

const SSH_AGENTC_REQUEST_IDENTITIES: u8 = 11;
const SSH_AGENT_IDENTITIES_ANSWER: u8 = 12;
const SSH_AGENTC_SIGN_REQUEST: u8 = 13;
const SSH_AGENT_SIGN_RESPONSE: u8 = 14;
const SSH_AGENT_FAILURE: u8 = 5;

#[derive(Clone)]
pub struct MockKey {
    pub blob: Vec<u8>,
    pub comment: String,
    pub refuse_sign: bool,
}

impl MockKey {
    pub fn new(comment: &str, seed: u8) -> Self {
        MockKey {
            blob: ed25519_blob(seed),
            comment: comment.to_owned(),
            refuse_sign: false,
        }
    }

    pub fn refusing(comment: &str, seed: u8) -> Self {
        MockKey {
            refuse_sign: true,
            ..MockKey::new(comment, seed)
        }
    }
}

/// A wire-format ed25519 public key blob.
pub fn ed25519_blob(seed: u8) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_string(b"ssh-ed25519").put_string(&[seed; 32]);
    w.into_inner()
}

/// A wire-format RSA public key blob.
pub fn rsa_blob(seed: u8) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_string(b"ssh-rsa")
        .put_string(&[0x01, 0x00, 0x01])
        .put_string(&[seed; 256]);
    w.into_inner()
}

/// What the mock returns from a sign request: deterministic per (key,
/// message), like a real RSA or Ed25519 signature.
pub fn fake_signature(blob: &[u8], message: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(b"mock-signature");
    hasher.update(blob);
    hasher.update(message);
    hasher.finalize().to_vec()
}

pub struct MockAgent {
    pub path: PathBuf,
    _dir: TempDir,
}

impl MockAgent {
    /// Binds a socket in a fresh temp dir and serves connections until the
    /// test process exits.
    pub fn spawn(keys: Vec<MockKey>) -> Self {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("agent.sock");
        let listener = UnixListener::bind(&path).expect("can bind socket");
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => serve(stream, &keys),
                    Err(_) => break,
                }
            }
        });
        MockAgent { path, _dir: dir }
    }
}

fn serve(stream: UnixStream, keys: &[MockKey]) {
    loop {
        let mut reader = Reader::new(&stream);
        if reader.read_u32().is_err() {
            // Client hung up.
            return;
        }
        let message_type = match reader.read_u8() {
            Ok(t) => t,
            Err(_) => return,
        };
        let reply = match message_type {
            SSH_AGENTC_REQUEST_IDENTITIES => {
                let mut w = Writer::new();
                w.put_u8(SSH_AGENT_IDENTITIES_ANSWER)
                    .put_u32(keys.len() as u32);
                for key in keys {
                    w.put_string(&key.blob).put_string(key.comment.as_bytes());
                }
                w
            }
            SSH_AGENTC_SIGN_REQUEST => {
                let blob = reader.read_string().expect("sign request blob");
                let message = reader.read_string().expect("sign request message");
                let _flags = reader.read_u32().expect("sign request flags");
                match keys.iter().find(|k| k.blob == blob) {
                    Some(key) if !key.refuse_sign => {
                        let mut inner = Writer::new();
                        inner
                            .put_string(b"ssh-ed25519")
                            .put_string(&fake_signature(&blob, &message));
                        let mut w = Writer::new();
                        w.put_u8(SSH_AGENT_SIGN_RESPONSE)
                            .put_string(&inner.into_inner());
                        w
                    }
                    _ => {
                        let mut w = Writer::new();
                        w.put_u8(SSH_AGENT_FAILURE);
                        w
                    }
                }
            }
            _ => {
                let mut w = Writer::new();
                w.put_u8(SSH_AGENT_FAILURE);
                w
            }
        };
        if (&stream).write_all(&reply.frame()).is_err() {
            return;
        }
    }
}

/// An "agent" that answers every request with an unrelated message type.
/// Useful to prove a code path never talks to the agent: doing so would
/// surface a protocol violation.
pub fn spawn_rogue() -> (PathBuf, TempDir) {
    let dir = tempfile::tempdir().expect("can create temp dir");
    let path = dir.path().join("agent.sock");
    let listener = UnixListener::bind(&path).expect("can bind socket");
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let mut reader = Reader::new(&stream);
            if reader.read_u32().is_err() || reader.read_u8().is_err() {
                continue;
            }
            let mut w = Writer::new();
            w.put_u8(99);
            let _ = (&stream).write_all(&w.frame());
        }
    });
    (path, dir)
}

/// True if `program` can be spawned at all.
pub fn have(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--help")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}
