//! *Library for encrypting files with keys held in ssh-agent*
//!
//! sshovel encrypts and decrypts files using a passphrase derived from an
//! ssh-agent signature. The private key never leaves the agent: the agent
//! signs a per-file random nonce, and the deterministic signature is digested
//! into a symmetric passphrase for an external cipher tool (`scrypt` or
//! `openssl`). The resulting file is self-describing — it carries a magic
//! header, a version, the cipher name, the nonce, and a selector hash that
//! lets decryption find the matching identity again.
//!
//! # Examples
//!
//! ```no_run
//! use std::io::Cursor;
//!
//! # fn run_main() -> Result<(), shovel::Error> {
//! let mut agent = shovel::agent::Agent::from_env(shovel::agent::FingerprintHash::Sha256)?;
//! let identity = agent.list_identities()?.into_iter().next().expect("agent has a key");
//!
//! let mut plaintext = Cursor::new(b"Hello world!".to_vec());
//! let mut encrypted = vec![];
//! shovel::protocol::encrypt(
//!     &mut plaintext,
//!     &mut encrypted,
//!     &mut agent,
//!     &identity,
//!     "openssl",
//!     None,
//! )?;
//! assert!(encrypted.starts_with(shovel::format::MAGIC));
//!
//! let mut decrypted = vec![];
//! shovel::protocol::decrypt(&mut &encrypted[..], &mut decrypted, &mut agent)?;
//! assert_eq!(decrypted, b"Hello world!");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cipher;
pub mod codec;
mod error;
pub mod expect;
pub mod format;
pub mod protocol;

pub use error::Error;
