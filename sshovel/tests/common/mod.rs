#![allow(dead_code)] // not every test binary uses every helper

//! A scripted ssh-agent serving a real UNIX socket, so the built binary can
//! be exercised end to end without a live agent. Signatures are
//! deterministic per (key, message), like real RSA or Ed25519 signatures.

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
}

impl MockKey {
    pub fn new(comment: &str, seed: u8) -> Self {
        let mut blob = Writer::new();
        blob.put_string(b"ssh-ed25519").put_string(&[seed; 32]);
        MockKey {
            blob: blob.into_inner(),
            comment: comment.to_owned(),
        }
    }
}

pub struct MockAgent {
    pub path: PathBuf,
    _dir: TempDir,
}

impl MockAgent {
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
                    Some(_) => {
                        let mut signature = Sha1::new();
                        signature.update(b"mock-signature");
                        signature.update(&blob);
                        signature.update(&message);

                        let mut inner = Writer::new();
                        inner
                            .put_string(b"ssh-ed25519")
                            .put_string(&signature.finalize());
                        let mut w = Writer::new();
                        w.put_u8(SSH_AGENT_SIGN_RESPONSE)
                            .put_string(&inner.into_inner());
                        w
                    }
                    None => {
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
