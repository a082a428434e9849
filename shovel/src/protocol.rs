//! The shovel engine: ties the agent, the container format, and a cipher
//! together.
//!
//! Encryption signs a fresh nonce with the chosen identity, digests the
//! (deterministic) signature into a passphrase, writes the container header,
//! and hands the body to the cipher. Decryption reads the header back,
//! locates the matching identity by selector hash, and re-derives the same
//! passphrase. Bodies are opaque to the engine; it never reads past the
//! header before delegating.

use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

use crate::agent::{Agent, Identity, SSH_AGENT_FLAG_NONE, SSH_AGENT_RSA_SHA2_512};
use crate::cipher;
use crate::error::Error;
use crate::format::{Header, NONCE_LEN, SELECTOR_LEN};

/// The container parameters recovered while decrypting, so that callers (the
/// edit workflow) can re-encrypt with the same identity and nonce.
#[derive(Debug)]
pub struct Decrypted {
    pub cipher: String,
    pub nonce: Vec<u8>,
    pub identity: Identity,
}

/// RSA keys are asked for an rsa-sha2-512 signature; everything else uses
/// the legacy flag. DSA-like schemes are non-deterministic and would break
/// passphrase recovery, so they are simply never matched at decrypt time.
fn sign_flags(identity: &Identity) -> u32 {
    if identity.algorithm == "ssh-rsa" {
        SSH_AGENT_RSA_SHA2_512
    } else {
        SSH_AGENT_FLAG_NONE
    }
}

/// SHA-1 of (nonce ‖ blob): the opaque tag the decryptor evaluates against
/// each identity the agent offers.
fn selector_hash(nonce: &[u8], blob: &[u8]) -> [u8; SELECTOR_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(blob);
    hasher.finalize().into()
}

/// Asks the agent to sign the nonce and digests the raw signature bytes into
/// the symmetric passphrase: lowercase SHA-1 hex.
fn derive_passphrase(
    agent: &mut Agent,
    identity: &Identity,
    nonce: &[u8],
) -> Result<SecretString, Error> {
    let signature = agent
        .sign(&identity.blob, nonce, sign_flags(identity))?
        .ok_or_else(|| {
            Error::KeyMissing(format!("the agent refused to sign with '{}'", identity.comment))
        })?;
    Ok(SecretString::new(hex::encode(Sha1::digest(&signature))))
}

fn fresh_nonce() -> Vec<u8> {
    let mut nonce = vec![0; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts `input` into a shovel container on `output`.
///
/// A fresh 1024-byte nonce is generated unless the caller supplies one (the
/// edit workflow re-supplies a container's nonce so its selector hash, and
/// passphrase, are preserved). The header is fully written before any body
/// byte, and the cipher child is not spawned until the passphrase is ready.
pub fn encrypt<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    agent: &mut Agent,
    identity: &Identity,
    cipher_name: &str,
    nonce: Option<&[u8]>,
) -> Result<(), Error> {
    let cipher = cipher::resolve(cipher_name)?;
    let nonce = match nonce {
        Some(nonce) => nonce.to_vec(),
        None => fresh_nonce(),
    };

    debug!("encrypting for {}", identity.fingerprint);
    let passphrase = derive_passphrase(agent, identity, &nonce)?;
    let selector = selector_hash(&nonce, &identity.blob);

    let header = Header::new(cipher.name(), nonce, selector);
    header.write(output)?;

    info!("encrypting with {}...", cipher.name());
    cipher.encrypt(input, output, &passphrase)?;
    info!("done");
    Ok(())
}

/// Decrypts a shovel container from `input` onto `output`, returning the
/// container parameters that were used.
pub fn decrypt<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    agent: &mut Agent,
) -> Result<Decrypted, Error> {
    let header = Header::read(input)?;
    let cipher = cipher::resolve(&header.cipher)?;

    let identity = agent
        .list_identities()?
        .into_iter()
        .find(|identity| selector_hash(&header.nonce, &identity.blob) == header.selector)
        .ok_or_else(|| {
            Error::KeyMissing("no identity in the agent matches this file".into())
        })?;
    debug!("decrypting with {} '{}'", identity.fingerprint, identity.comment);

    let passphrase = derive_passphrase(agent, &identity, &header.nonce)?;

    info!("decrypting with {}...", cipher.name());
    cipher.decrypt(input, output, &passphrase)?;
    info!("done");

    Ok(Decrypted {
        cipher: header.cipher,
        nonce: header.nonce,
        identity,
    })
}
