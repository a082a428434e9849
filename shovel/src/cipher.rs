//! The pluggable body ciphers.
//!
//! A cipher is an encrypt/decrypt pair over opaque byte streams and a
//! passphrase, always realized by driving a child process; sshovel never
//! implements symmetric encryption itself. The container header records only
//! the cipher's name, so the name space is a closed registry: a name resolves
//! to exactly one implementation, and the body format is entirely that
//! implementation's concern.

use std::io::{Read, Write};
use std::process::ExitStatus;

use secrecy::SecretString;

use crate::error::Error;

mod openssl;
mod scrypt;

pub use openssl::OpensslCipher;
pub use scrypt::ScryptCipher;

/// A streaming encrypt/decrypt pair.
pub trait Cipher {
    /// The lowercase identifier written into container headers.
    fn name(&self) -> &'static str;

    fn encrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error>;

    fn decrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error>;
}

/// Resolves a cipher name (case-insensitively) against the registry.
pub fn resolve(name: &str) -> Result<Box<dyn Cipher>, Error> {
    match name.to_ascii_lowercase().as_str() {
        "scrypt" => Ok(Box::new(ScryptCipher::default())),
        "openssl" => Ok(Box::new(OpensslCipher)),
        other => Err(Error::UnknownCipher(other.to_owned())),
    }
}

/// Every registered cipher name, for help text.
pub fn names() -> &'static [&'static str] {
    &["scrypt", "openssl"]
}

fn exit_error(program: &str, status: ExitStatus, stderr: &str) -> Error {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Error::CipherFailure(format!("{} exited with {}", program, status))
    } else {
        Error::CipherFailure(format!("{} exited with {}: {}", program, status, stderr))
    }
}
