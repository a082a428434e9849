//! Drives a child process that insists on talking to a terminal.
//!
//! `scrypt` reads passphrases from its controlling terminal rather than from
//! stdin, so it cannot be fed through a pipe. [`Expect`] allocates a fresh
//! pseudo-terminal, makes it the child's controlling terminal, and exposes a
//! small phrase-based handshake: wait for a prompt, type a reply, pump data,
//! collect the exit status.
//!
//! The terminal and the child's stdout are non-blocking; deadlines are
//! implemented by polling with a short sleep.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a fd we own; no memory is touched.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// A child process under a freshly allocated pseudo-terminal.
///
/// Stdin, stdout, and stderr are pipes; the pty is the controlling terminal
/// only, which keeps prompt traffic and data traffic apart. Dropping an
/// `Expect` kills and reaps the child, so every spawn is waited for even on
/// error paths.
pub struct Expect {
    child: Child,
    master: Option<File>,
    program: String,
}

impl Expect {
    /// Spawns `command` with a new controlling terminal.
    pub fn spawn(mut command: Command) -> Result<Self, Error> {
        let program = command.get_program().to_string_lossy().into_owned();

        let mut master_fd: libc::c_int = -1;
        let mut slave_fd: libc::c_int = -1;
        // SAFETY: openpty only writes the two fds we hand it.
        if unsafe {
            libc::openpty(
                &mut master_fd,
                &mut slave_fd,
                ptr::null_mut(),
                ptr::null(),
                ptr::null(),
            )
        } < 0
        {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        // SAFETY: master_fd is a fresh fd we own from here on.
        let master = unsafe { File::from_raw_fd(master_fd) };

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // SAFETY: the closure runs in the child between fork and exec and
        // only calls async-signal-safe functions.
        unsafe {
            command.pre_exec(move || {
                if libc::setsid() < 0 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(slave_fd, libc::TIOCSCTTY, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
                // The controlling terminal outlives these descriptors.
                libc::close(slave_fd);
                libc::close(master_fd);
                Ok(())
            });
        }

        let child = command.spawn().map_err(|e| {
            // SAFETY: the slave fd is still ours if the spawn failed.
            unsafe { libc::close(slave_fd) };
            Error::CipherFailure(format!("failed to run {}: {}", program, e))
        })?;
        // SAFETY: closes the parent's copy; the child keeps its terminal.
        unsafe { libc::close(slave_fd) };

        set_nonblocking(master.as_raw_fd())?;
        if let Some(stdout) = &child.stdout {
            set_nonblocking(stdout.as_raw_fd())?;
        }

        debug!("spawned {} under a pty", program);
        Ok(Expect {
            child,
            master: Some(master),
            program,
        })
    }

    fn master(&self) -> &File {
        self.master.as_ref().expect("terminal is open until finish")
    }

    /// Reads from the terminal until `phrase` appears as a substring of what
    /// has been read so far, or the deadline elapses.
    pub fn expect(&mut self, phrase: &str, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        let mut chunk = [0; 256];
        let mut master = self.master();
        loop {
            match master.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::UnexpectedEof(
                        String::from_utf8_lossy(&seen).into_owned(),
                    ));
                }
                Ok(n) => {
                    seen.extend_from_slice(&chunk[..n]);
                    if contains(&seen, phrase.as_bytes()) {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                // Linux reports a pty whose other side is gone as EIO.
                Err(e) if e.raw_os_error() == Some(libc::EIO) => {
                    return Err(Error::UnexpectedEof(
                        String::from_utf8_lossy(&seen).into_owned(),
                    ));
                }
                Err(e) => return Err(Error::Io(e)),
            }
            if Instant::now() >= deadline {
                return Err(Error::PromptTimeout(phrase.into()));
            }
        }
    }

    /// Types `bytes` at the terminal.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut rest = bytes;
        let mut master = self.master();
        while !rest.is_empty() {
            match master.write(rest) {
                Ok(n) => rest = &rest[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    /// Hands out the pipe feeding the child's stdin. Dropping it signals EOF.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Hands out the child's stdout pipe, already in non-blocking mode.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Closes the terminal, drains stderr, and waits for the child.
    pub fn finish(mut self) -> Result<(ExitStatus, String), Error> {
        drop(self.master.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            // Best effort; stderr may not be valid UTF-8.
            let mut raw = Vec::new();
            let _ = pipe.read_to_end(&mut raw);
            stderr = String::from_utf8_lossy(&raw).into_owned();
        }
        let status = self.child.wait()?;
        debug!("{} exited with {}", self.program, status);
        Ok((status, stderr))
    }
}

impl Drop for Expect {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Copies everything from `input` to `output`, tolerating non-blocking reads,
/// until EOF or the deadline.
pub fn copy<R: Read, W: Write + ?Sized>(
    input: &mut R,
    output: &mut W,
    timeout: Duration,
) -> Result<u64, Error> {
    let deadline = Instant::now() + timeout;
    let mut total = 0;
    let mut chunk = [0; 8192];
    loop {
        match input.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                output.write_all(&chunk[..n])?;
                total += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(Error::CipherFailure(format!(
                        "timed out copying output after {} bytes",
                        total,
                    )));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return Err(Error::Io(e)),
        }
    }
}
