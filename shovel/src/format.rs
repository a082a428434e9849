//! The sshovel container format.
//!
//! A container is a fixed preamble followed by a cipher-defined body. The
//! preamble carries everything a decryptor needs to find the right key in
//! the agent and re-derive the passphrase: the cipher name, the per-file
//! nonce, and a selector hash binding the nonce to one identity.

use std::io::{self, Read, Write};

use crate::codec::{CodecError, Reader, Writer};
use crate::error::Error;

/// The first bytes of every sshovel file.
pub const MAGIC: &[u8; 15] = b"HAZ.CAT/SSHOVEL";

/// The container format version.
pub const VERSION: u32 = 5807;

/// Nonces are exactly this many bytes of fresh randomness.
pub const NONCE_LEN: usize = 1024;

/// Selector hashes are SHA-1 output.
pub const SELECTOR_LEN: usize = 20;

/// The decoded container preamble.
///
/// The format reserves a recipient count for future multi-recipient support,
/// but exactly one selector is ever written, and only one is accepted.
#[derive(Debug, Eq, PartialEq)]
pub struct Header {
    /// Name of the cipher that produced the body.
    pub cipher: String,
    /// The nonce the passphrase was derived from.
    pub nonce: Vec<u8>,
    /// SHA-1 of (nonce ‖ identity blob).
    pub selector: [u8; SELECTOR_LEN],
}

fn malformed(e: CodecError) -> Error {
    Error::Malformed(e.to_string())
}

impl Header {
    pub fn new(cipher: &str, nonce: Vec<u8>, selector: [u8; SELECTOR_LEN]) -> Self {
        debug_assert_eq!(nonce.len(), NONCE_LEN);
        Header {
            cipher: cipher.to_ascii_lowercase(),
            nonce,
            selector,
        }
    }

    /// Parses a header, consuming exactly the preamble and nothing of the
    /// body. Every mismatch is a hard error; no agent traffic happens before
    /// this returns.
    pub fn read<R: Read>(input: &mut R) -> Result<Self, Error> {
        let mut magic = [0; MAGIC.len()];
        input
            .read_exact(&mut magic)
            .map_err(|_| Error::Malformed("truncated magic".into()))?;
        if &magic != MAGIC {
            return Err(Error::Malformed("bad magic".into()));
        }

        let mut r = Reader::new(input);
        let version = r.read_u32().map_err(malformed)?;
        if version != VERSION {
            return Err(Error::Malformed(format!(
                "unsupported version {}",
                version,
            )));
        }

        let cipher = r.read_string().map_err(malformed)?;
        let cipher = String::from_utf8(cipher)
            .map_err(|_| Error::Malformed("cipher name is not UTF-8".into()))?;

        let nonce = r.read_string().map_err(malformed)?;
        if nonce.len() != NONCE_LEN {
            return Err(Error::Malformed(format!(
                "nonce is {} bytes, expected {}",
                nonce.len(),
                NONCE_LEN,
            )));
        }

        let count = r.read_u32().map_err(malformed)?;
        if count != 1 {
            return Err(Error::Malformed(format!(
                "{} selector hashes, expected 1",
                count,
            )));
        }

        let selector = r.read_string().map_err(malformed)?;
        let selector: [u8; SELECTOR_LEN] = selector
            .try_into()
            .map_err(|_| Error::Malformed("selector hash is not SHA-1 sized".into()))?;

        Ok(Header {
            cipher,
            nonce,
            selector,
        })
    }

    /// Writes the preamble. The body follows, written by the cipher.
    pub fn write<W: Write>(&self, output: &mut W) -> io::Result<()> {
        output.write_all(MAGIC)?;
        let mut w = Writer::new();
        w.put_u32(VERSION)
            .put_string(self.cipher.as_bytes())
            .put_string(&self.nonce)
            .put_u32(1)
            .put_string(&self.selector);
        output.write_all(&w.into_inner())
    }
}

/// A reader wrapper that can look at the start of a stream without consuming
/// it, so encrypt-or-decrypt detection can happen before header parsing
/// commits.
pub struct PeekReader<R: Read> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
}

impl<R: Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        PeekReader {
            inner,
            buffer: Vec::new(),
            pos: 0,
        }
    }

    /// Returns up to `n` bytes from the front of the stream without
    /// consuming them. Fewer than `n` means the stream ended early.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buffer.len() - self.pos < n {
            let mut chunk = [0; 256];
            match self.inner.read(&mut chunk)? {
                0 => break,
                read => self.buffer.extend_from_slice(&chunk[..read]),
            }
        }
        let available = (self.buffer.len() - self.pos).min(n);
        Ok(&self.buffer[self.pos..self.pos + available])
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.buffer.len() {
            let n = (self.buffer.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
            self.pos += n;
            if self.pos == self.buffer.len() {
                self.buffer.clear();
                self.pos = 0;
            }
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

/// True if the stream starts with the sshovel magic.
pub fn is_shovel_stream<R: Read>(input: &mut PeekReader<R>) -> io::Result<bool> {
    Ok(input.peek(MAGIC.len())? == MAGIC)
}
