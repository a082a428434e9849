//! Edit-in-place: decrypt to a tempfile, run the editor, re-encrypt.
//!
//! Three starting states, by existence and magic sniff:
//! - a missing file is created from whatever the editor writes;
//! - an existing plaintext file is always re-encrypted, even if the editor
//!   changed nothing (converting plaintext is itself the change);
//! - an existing container is re-encrypted only if the plaintext changed,
//!   reusing the container's identity and exact nonce, so an unchanged file
//!   is left completely untouched.

use std::env;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::Path;
use std::process::Command;

use log::info;
use shovel::agent::Agent;
use shovel::format::{is_shovel_stream, PeekReader};
use shovel::protocol;

use crate::cleanup;
use crate::error::Error;
use crate::{resolve_cipher_name, select_identity};

const DEFAULT_EDITOR: &str = "nano";

pub(crate) fn edit(
    path: &Path,
    agent: &mut Agent,
    key_match: Option<&str>,
    cipher_flag: Option<&str>,
) -> Result<(), Error> {
    let dir = tempfile::Builder::new().prefix("sshovel-edit-").tempdir()?;
    cleanup::register(dir.path());
    let result = edit_in(dir.path(), path, agent, key_match, cipher_flag);
    cleanup::unregister(dir.path());
    // `dir` drops here, removing the plaintext on every non-signal path.
    result
}

fn edit_in(
    tmp_dir: &Path,
    path: &Path,
    agent: &mut Agent,
    key_match: Option<&str>,
    cipher_flag: Option<&str>,
) -> Result<(), Error> {
    let tmp = tmp_dir.join(plaintext_name(path));

    if !path.exists() {
        run_editor(&tmp)?;
        match fs::metadata(&tmp) {
            Ok(meta) if meta.len() > 0 => {
                let identity = select_identity(agent, key_match)?;
                let cipher = resolve_cipher_name(cipher_flag, None);
                encrypt_into(&tmp, path, agent, &identity, &cipher, None)
            }
            _ => {
                info!("nothing written; not creating {}", path.display());
                Ok(())
            }
        }
    } else {
        let mut input = PeekReader::new(File::open(path)?);
        if is_shovel_stream(&mut input)? {
            let mut tmp_file = File::create(&tmp)?;
            let container = protocol::decrypt(&mut input, &mut tmp_file, agent)?;
            drop(tmp_file);
            drop(input);

            let before = fs::read(&tmp)?;
            run_editor(&tmp)?;
            let after = fs::read(&tmp)?;
            if before == after {
                info!("no changes; leaving {} untouched", path.display());
                return Ok(());
            }

            // Reusing the nonce preserves the selector hash and passphrase;
            // the output still differs by the cipher's random salt.
            let cipher = resolve_cipher_name(cipher_flag, Some(&container.cipher));
            encrypt_into(
                &tmp,
                path,
                agent,
                &container.identity,
                &cipher,
                Some(&container.nonce),
            )
        } else {
            drop(input);
            fs::copy(path, &tmp)?;
            run_editor(&tmp)?;
            let identity = select_identity(agent, key_match)?;
            let cipher = resolve_cipher_name(cipher_flag, None);
            encrypt_into(&tmp, path, agent, &identity, &cipher, None)
        }
    }
}

/// The tempfile keeps the target's file name so editor modes behave.
fn plaintext_name(path: &Path) -> OsString {
    path.file_name()
        .map(|name| name.to_owned())
        .unwrap_or_else(|| OsString::from("plaintext"))
}

fn encrypt_into(
    tmp: &Path,
    path: &Path,
    agent: &mut Agent,
    identity: &shovel::agent::Identity,
    cipher: &str,
    nonce: Option<&[u8]>,
) -> Result<(), Error> {
    let mut input = File::open(tmp)?;
    let mut output = File::create(path)?;
    protocol::encrypt(&mut input, &mut output, agent, identity, cipher, nonce)?;
    Ok(())
}

fn run_editor(path: &Path) -> Result<(), Error> {
    let editor = env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_owned());

    // Support EDITOR values like "code -w" without invoking a shell.
    let mut words = editor.split_whitespace();
    let program = words.next().expect("editor is non-empty");
    let mut command = Command::new(program);
    command.args(words).arg(path);

    info!("editing {} with {}", path.display(), program);
    let status = command
        .status()
        .map_err(|e| Error::EditorFailed(format!("failed to run {}: {}", program, e)))?;
    if !status.success() {
        return Err(Error::EditorFailed(format!(
            "{} exited with {}",
            program, status,
        )));
    }
    Ok(())
}
