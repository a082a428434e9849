#![forbid(unsafe_code)]

use std::env;
use std::io::Write;

use clap::Parser;
use log::info;
use shovel::agent::{Agent, Identity};
use shovel::format::{is_shovel_stream, PeekReader};
use shovel::protocol;

mod cleanup;
mod cli;
mod edit;
mod error;
mod file_io;

use cli::Options;
use error::Error;

/// The cipher to encrypt with: an explicit flag wins, then `SSHOVEL_CIPHER`,
/// then the caller's fallback (the edit workflow passes the container's own
/// cipher), then scrypt.
pub(crate) fn resolve_cipher_name(explicit: Option<&str>, fallback: Option<&str>) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| env::var("SSHOVEL_CIPHER").ok().filter(|c| !c.is_empty()))
        .or_else(|| fallback.map(str::to_owned))
        .unwrap_or_else(|| "scrypt".to_owned())
}

/// Picks the signing identity: the unique key whose comment contains the
/// `--key` pattern, or the agent's first key when no pattern is given.
pub(crate) fn select_identity(
    agent: &mut Agent,
    key_match: Option<&str>,
) -> Result<Identity, Error> {
    let identities = agent.list_identities()?;
    if identities.is_empty() {
        return Err(Error::NoKeys);
    }
    match key_match {
        None => Ok(identities.into_iter().next().expect("non-empty")),
        Some(pattern) => {
            let mut matches: Vec<Identity> = identities
                .iter()
                .filter(|identity| identity.comment.contains(pattern))
                .cloned()
                .collect();
            match matches.len() {
                0 => Err(Error::NoKeyMatched {
                    pattern: pattern.to_owned(),
                    known: identities.into_iter().map(|i| i.comment).collect(),
                }),
                1 => Ok(matches.remove(0)),
                _ => Err(Error::AmbiguousKey {
                    pattern: pattern.to_owned(),
                    matches: matches.into_iter().map(|i| i.comment).collect(),
                }),
            }
        }
    }
}

fn main() -> Result<(), Error> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Off)
        .parse_default_env()
        .init();

    cleanup::init()?;

    let opts = Options::parse();
    let hash = opts.fingerprint_hash.into();

    if let Some(path) = &opts.edit {
        let mut agent = Agent::from_env(hash).map_err(Error::Shovel)?;
        return edit::edit(path, &mut agent, opts.key.as_deref(), opts.cipher.as_deref());
    }

    // Decide encrypt-or-decrypt from the input itself, before any agent
    // round-trip.
    let input = file_io::InputReader::new(opts.input.as_deref())?;
    let mut input = PeekReader::new(input);
    let decrypting = is_shovel_stream(&mut input)?;

    let mut agent = Agent::from_env(hash).map_err(Error::Shovel)?;

    if decrypting {
        let mut output =
            file_io::OutputWriter::new(opts.output.as_deref(), file_io::OutputFormat::Unknown)?;
        protocol::decrypt(&mut input, &mut output, &mut agent)?;
        output.flush()?;
    } else {
        let identity = select_identity(&mut agent, opts.key.as_deref())?;
        info!("using key '{}' ({})", identity.comment, identity.fingerprint);
        let mut output =
            file_io::OutputWriter::new(opts.output.as_deref(), file_io::OutputFormat::Binary)?;
        let cipher = resolve_cipher_name(opts.cipher.as_deref(), None);
        protocol::encrypt(&mut input, &mut output, &mut agent, &identity, &cipher, None)?;
        output.flush()?;
    }

    Ok(())
}
