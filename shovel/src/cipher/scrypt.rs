//! The `scrypt` cipher: interactive, passphrase typed at a pseudo-terminal.

use std::io::{self, Read, Write};
use std::process::Command;
use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::{exit_error, Cipher};
use crate::error::Error;
use crate::expect::{self, Expect};

const PASSPHRASE_PROMPT: &str = "passphrase: ";
const PROMPT_TIMEOUT: Duration = Duration::from_secs(1);
// scrypt's key derivation can legitimately run for a long time at high work
// factors, so the data pump gets a far more generous deadline than a prompt.
const DATA_TIMEOUT: Duration = Duration::from_secs(900);

/// Drives the `scrypt` tool, which only accepts passphrases typed at its
/// controlling terminal. Encryption answers the prompt twice (entry and
/// confirmation); decryption answers once.
#[derive(Default)]
pub struct ScryptCipher {
    enc_args: Vec<String>,
}

impl ScryptCipher {
    /// A cipher that passes extra arguments (work factor tuning such as
    /// `-t`, `-m`) to `scrypt enc`. Decryption never takes options; scrypt
    /// records its parameters in its own body format.
    pub fn with_options<S: Into<String>>(enc_args: Vec<S>) -> Self {
        ScryptCipher {
            enc_args: enc_args.into_iter().map(Into::into).collect(),
        }
    }

    fn answer_prompt(session: &mut Expect, passphrase: &SecretString) -> Result<(), Error> {
        session.expect(PASSPHRASE_PROMPT, PROMPT_TIMEOUT)?;
        session.send(passphrase.expose_secret().as_bytes())?;
        session.send(b"\n")?;
        Ok(())
    }

    fn pump(
        mut session: Expect,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<(), Error> {
        let mut stdin = session.take_stdin().expect("could open stdin");
        match io::copy(input, &mut stdin) {
            Ok(_) => (),
            // The child quit early; its exit status will say why.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => (),
            Err(e) => return Err(e.into()),
        }
        drop(stdin);

        let mut stdout = session.take_stdout().expect("could open stdout");
        expect::copy(&mut stdout, output, DATA_TIMEOUT)?;

        let (status, stderr) = session.finish()?;
        if !status.success() {
            return Err(exit_error("scrypt", status, &stderr));
        }
        Ok(())
    }
}

impl Cipher for ScryptCipher {
    fn name(&self) -> &'static str {
        "scrypt"
    }

    fn encrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error> {
        let mut command = Command::new("scrypt");
        command.arg("enc");
        command.args(&self.enc_args);
        command.arg("-");
        debug!("running scrypt enc with {} extra args", self.enc_args.len());

        let mut session = Expect::spawn(command)?;
        ScryptCipher::answer_prompt(&mut session, passphrase)?;
        // scrypt asks again to confirm.
        ScryptCipher::answer_prompt(&mut session, passphrase)?;
        ScryptCipher::pump(session, input, output)
    }

    fn decrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error> {
        let mut command = Command::new("scrypt");
        command.arg("dec").arg("-");
        debug!("running scrypt dec");

        let mut session = Expect::spawn(command)?;
        ScryptCipher::answer_prompt(&mut session, passphrase)?;
        ScryptCipher::pump(session, input, output)
    }
}
