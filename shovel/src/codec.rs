//! The length-prefixed binary codec shared by the ssh-agent protocol and the
//! container header.
//!
//! Everything on the wire is big-endian: single bytes, 32-bit unsigned
//! integers, and `string`s (a `u32` length followed by that many raw bytes).
//! The codec is byte-transparent; whether a `string` holds UTF-8 or an opaque
//! blob is the caller's concern.

use std::fmt;
use std::io::{self, Read};

/// Refuse to allocate for a `string` longer than this. Nothing either peer
/// legitimately sends comes anywhere near it.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Errors from the codec itself. Callers map these onto their own error
/// category (protocol violation for the agent, malformed file for the
/// container parser).
#[derive(Debug)]
pub enum CodecError {
    /// The underlying stream ended before the value was complete.
    Truncated,
    /// A length field exceeded [`MAX_STRING_LEN`].
    Overflow(usize),
    /// Any other I/O failure.
    Io(io::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "truncated field"),
            CodecError::Overflow(n) => write!(f, "refusing to read {} byte string", n),
            CodecError::Io(e) => e.fmt(f),
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::Truncated,
            _ => CodecError::Io(e),
        }
    }
}

impl std::error::Error for CodecError {}

/// Accumulates primitives into a buffer.
///
/// [`Writer::frame`] wraps the accumulated bytes in one outer `string`, which
/// is how a complete agent request is framed on the wire.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_string(&mut self, s: &[u8]) -> &mut Self {
        self.put_u32(s.len() as u32);
        self.buf.extend_from_slice(s);
        self
    }

    /// The accumulated bytes, unframed.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// The accumulated bytes wrapped as a single `string`.
    pub fn frame(self) -> Vec<u8> {
        let mut framed = Vec::with_capacity(4 + self.buf.len());
        framed.extend_from_slice(&(self.buf.len() as u32).to_be_bytes());
        framed.extend_from_slice(&self.buf);
        framed
    }
}

/// Reads primitives off a byte stream.
///
/// Short reads surface as [`CodecError::Truncated`]; the reader relies on
/// [`Read::read_exact`], which loops until the requested length is filled.
pub struct Reader<R: Read> {
    inner: R,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader { inner }
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let mut buf = [0; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_string(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LEN {
            return Err(CodecError::Overflow(len));
        }
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}
