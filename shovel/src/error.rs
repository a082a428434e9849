//! Error type.

use std::fmt;
use std::io;

/// The various errors that can be returned while encrypting or decrypting.
#[derive(Debug)]
pub enum Error {
    /// The ssh-agent socket is missing, unset, or refused the connection.
    AgentUnreachable(String),
    /// A child cipher process failed, or produced truncated output.
    CipherFailure(String),
    /// An I/O error occurred.
    Io(io::Error),
    /// No identity in the agent matches, or the agent refused to sign.
    KeyMissing(String),
    /// The container header could not be parsed.
    Malformed(String),
    /// A prompt did not appear on the child's terminal within the deadline.
    PromptTimeout(String),
    /// The agent sent bytes we did not expect.
    Protocol(String),
    /// A child's terminal reached EOF while we were still expecting output.
    UnexpectedEof(String),
    /// The container names a cipher that is not in the registry.
    UnknownCipher(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AgentUnreachable(e) => write!(f, "cannot reach ssh-agent: {}", e),
            Error::CipherFailure(e) => write!(f, "cipher failed: {}", e),
            Error::Io(e) => e.fmt(f),
            Error::KeyMissing(e) => write!(f, "missing key: {}", e),
            Error::Malformed(e) => write!(f, "malformed sshovel file: {}", e),
            Error::PromptTimeout(phrase) => {
                write!(f, "timed out waiting for '{}'", phrase)
            }
            Error::Protocol(e) => write!(f, "ssh-agent protocol violation: {}", e),
            Error::UnexpectedEof(read) => {
                write!(f, "unexpected EOF after reading: {}", read)
            }
            Error::UnknownCipher(name) => write!(f, "unknown cipher: {}", name),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(inner) => Some(inner),
            _ => None,
        }
    }
}
