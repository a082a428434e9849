//! Client for the ssh-agent protocol.
//!
//! Speaks the subset of [draft-miller-ssh-agent] that sshovel needs: listing
//! identities and requesting signatures. The agent is reached over the
//! UNIX-domain stream socket named by `SSH_AUTH_SOCK`; private keys never
//! leave it.
//!
//! [draft-miller-ssh-agent]: https://tools.ietf.org/id/draft-miller-ssh-agent-00.html

use std::fmt;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::codec::{CodecError, Reader, Writer};
use crate::error::Error;

const SSH_AGENTC_REQUEST_IDENTITIES: u8 = 11;
const SSH_AGENT_IDENTITIES_ANSWER: u8 = 12;
const SSH_AGENTC_SIGN_REQUEST: u8 = 13;
const SSH_AGENT_SIGN_RESPONSE: u8 = 14;
const SSH_AGENT_FAILURE: u8 = 5;

/// Signature flags from the agent protocol.
pub const SSH_AGENT_FLAG_NONE: u32 = 0;
pub const SSH_AGENT_RSA_SHA2_256: u32 = 2;
pub const SSH_AGENT_RSA_SHA2_512: u32 = 4;

/// The digest used to render key fingerprints for display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FingerprintHash {
    Md5,
    Sha256,
}

impl FromStr for FingerprintHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(FingerprintHash::Md5),
            "sha256" => Ok(FingerprintHash::Sha256),
            other => Err(format!("unknown fingerprint hash: {}", other)),
        }
    }
}

impl fmt::Display for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintHash::Md5 => write!(f, "md5"),
            FingerprintHash::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FingerprintHash {
    /// Renders the fingerprint of a public key blob in OpenSSH's style:
    /// `MD5:` plus colon-separated hex pairs, or `SHA256:` plus unpadded
    /// base64.
    pub fn fingerprint(self, blob: &[u8]) -> String {
        match self {
            FingerprintHash::Md5 => {
                let digest = Md5::digest(blob);
                let hex = digest
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(":");
                format!("MD5:{}", hex)
            }
            FingerprintHash::Sha256 => format!(
                "SHA256:{}",
                base64::encode_config(Sha256::digest(blob), base64::STANDARD_NO_PAD),
            ),
        }
    }
}

/// A public key held by the agent, read-only after construction.
#[derive(Clone, Debug)]
pub struct Identity {
    /// The wire-format public key.
    pub blob: Vec<u8>,
    /// The comment the key was added under.
    pub comment: String,
    /// The algorithm name parsed from the blob, e.g. `ssh-rsa`.
    pub algorithm: String,
    /// A displayable fingerprint of the blob.
    pub fingerprint: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.fingerprint, self.comment, self.algorithm)
    }
}

/// The blob's first length-prefixed field is the algorithm name.
fn key_algorithm(blob: &[u8]) -> Result<String, Error> {
    let mut r = Reader::new(blob);
    let name = r.read_string().map_err(protocol_err)?;
    String::from_utf8(name).map_err(|_| Error::Protocol("non-UTF-8 key type".into()))
}

fn protocol_err(e: CodecError) -> Error {
    Error::Protocol(e.to_string())
}

/// A connection to an ssh-agent.
pub struct Agent {
    stream: UnixStream,
    hash: FingerprintHash,
}

impl Agent {
    /// Connects to the agent socket named by `SSH_AUTH_SOCK`.
    ///
    /// An unset or empty variable is reported the same way as a missing
    /// socket.
    pub fn from_env(hash: FingerprintHash) -> Result<Self, Error> {
        match std::env::var_os("SSH_AUTH_SOCK") {
            Some(path) if !path.is_empty() => Agent::connect(Path::new(&path), hash),
            _ => Err(Error::AgentUnreachable(
                "SSH_AUTH_SOCK is empty or unset".into(),
            )),
        }
    }

    /// Connects to an agent socket at an explicit path.
    pub fn connect(path: &Path, hash: FingerprintHash) -> Result<Self, Error> {
        debug!("connecting to ssh-agent at {}", path.display());
        let stream = UnixStream::connect(path)
            .map_err(|e| Error::AgentUnreachable(format!("{}: {}", path.display(), e)))?;
        Ok(Agent { stream, hash })
    }

    /// Asks the agent for every identity it holds.
    pub fn list_identities(&mut self) -> Result<Vec<Identity>, Error> {
        let mut req = Writer::new();
        req.put_u8(SSH_AGENTC_REQUEST_IDENTITIES);
        self.stream.write_all(&req.frame())?;

        let mut reply = Reader::new(&self.stream);
        let _length = reply.read_u32().map_err(protocol_err)?;
        let message_type = reply.read_u8().map_err(protocol_err)?;
        if message_type != SSH_AGENT_IDENTITIES_ANSWER {
            return Err(Error::Protocol(format!(
                "expected identities answer, got message type {}",
                message_type,
            )));
        }

        let count = reply.read_u32().map_err(protocol_err)?;
        let mut identities = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let blob = reply.read_string().map_err(protocol_err)?;
            let comment = reply.read_string().map_err(protocol_err)?;
            let algorithm = key_algorithm(&blob)?;
            let fingerprint = self.hash.fingerprint(&blob);
            identities.push(Identity {
                blob,
                comment: String::from_utf8_lossy(&comment).into_owned(),
                algorithm,
                fingerprint,
            });
        }
        debug!("agent holds {} identities", identities.len());
        Ok(identities)
    }

    /// Asks the agent to sign `message` with the key matching `blob`.
    ///
    /// Returns `None` if the agent replies with an explicit failure — in
    /// practice, when the key has been removed since it was listed, or the
    /// agent declines to use it.
    pub fn sign(
        &mut self,
        blob: &[u8],
        message: &[u8],
        flags: u32,
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut req = Writer::new();
        req.put_u8(SSH_AGENTC_SIGN_REQUEST)
            .put_string(blob)
            .put_string(message)
            .put_u32(flags);
        self.stream.write_all(&req.frame())?;

        let mut reply = Reader::new(&self.stream);
        let _length = reply.read_u32().map_err(protocol_err)?;
        match reply.read_u8().map_err(protocol_err)? {
            SSH_AGENT_FAILURE => Ok(None),
            SSH_AGENT_SIGN_RESPONSE => {
                // The signature is wrapped in an outer string whose length we
                // do not need, holding a format tag and the raw bytes.
                let _wrapper_length = reply.read_u32().map_err(protocol_err)?;
                let format_tag = reply.read_string().map_err(protocol_err)?;
                let signature = reply.read_string().map_err(protocol_err)?;
                debug!(
                    "agent returned a {} byte {} signature",
                    signature.len(),
                    String::from_utf8_lossy(&format_tag),
                );
                Ok(Some(signature))
            }
            other => Err(Error::Protocol(format!(
                "expected sign response, got message type {}",
                other,
            ))),
        }
    }
}
