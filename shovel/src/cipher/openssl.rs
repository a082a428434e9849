//! The `openssl` cipher: non-interactive, passphrase over a pipe.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::FromRawFd;
use std::process::{Child, Command, Stdio};

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::{exit_error, Cipher};
use crate::error::Error;

/// Drives `openssl aes-256-cbc` with the passphrase delivered through an
/// anonymous pipe named as `/dev/fd/N`, so it never appears on the command
/// line or in the environment.
pub struct OpensslCipher;

impl OpensslCipher {
    fn run(
        &self,
        mode: &str,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error> {
        let mut fds: [libc::c_int; 2] = [-1; 2];
        // SAFETY: pipe only writes the two fds we hand it.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        let [read_fd, write_fd] = fds;
        // SAFETY: both fds are fresh and owned by these Files from here on;
        // neither carries CLOEXEC, so the read end is inherited by the child.
        let read_end = unsafe { File::from_raw_fd(read_fd) };
        {
            let mut write_end = unsafe { File::from_raw_fd(write_fd) };
            write_end.write_all(passphrase.expose_secret().as_bytes())?;
            // Dropping the write end closes it, so openssl sees EOF after
            // the first line.
        }

        debug!("running openssl aes-256-cbc {}", mode);
        let mut child = Command::new("openssl")
            .arg("aes-256-cbc")
            .arg(mode)
            .arg("-a")
            .arg("-salt")
            .arg("-kfile")
            .arg(format!("/dev/fd/{}", read_fd))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::CipherFailure(format!("failed to run openssl: {}", e)))?;
        // The child holds its own copy of the read end now.
        drop(read_end);

        match pump(&mut child, input, output) {
            Ok(()) => (),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }

        let mut stderr = Vec::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_end(&mut stderr);
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(exit_error(
                "openssl",
                status,
                &String::from_utf8_lossy(&stderr),
            ));
        }
        Ok(())
    }
}

fn pump(child: &mut Child, input: &mut dyn Read, output: &mut dyn Write) -> Result<(), Error> {
    let mut stdin = child.stdin.take().expect("could open stdin");
    match io::copy(input, &mut stdin) {
        Ok(_) => (),
        // The child quit early; its exit status will say why.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => (),
        Err(e) => return Err(e.into()),
    }
    drop(stdin);

    let mut stdout = child.stdout.take().expect("could open stdout");
    io::copy(&mut stdout, output)?;
    Ok(())
}

impl Cipher for OpensslCipher {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn encrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error> {
        self.run("-e", input, output, passphrase)
    }

    fn decrypt(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        passphrase: &SecretString,
    ) -> Result<(), Error> {
        self.run("-d", input, output, passphrase)
    }
}
