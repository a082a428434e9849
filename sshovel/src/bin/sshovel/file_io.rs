//! File I/O wrappers for the CLI: positional IN/OUT with the Unix convention
//! that `-` (or omission) means the standard streams.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};

#[derive(Debug)]
struct DenyBinaryOutputError;

impl fmt::Display for DenyBinaryOutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "refusing to write ciphertext to the terminal.")?;
        write!(f, "Redirect the output, or force it with OUT '-'.")
    }
}

impl std::error::Error for DenyBinaryOutputError {}

/// Wrapper around either a file or standard input.
pub(crate) enum InputReader {
    File(File),
    Stdin(io::Stdin),
}

impl InputReader {
    pub(crate) fn new(input: Option<&str>) -> io::Result<Self> {
        match input {
            Some(filename) if filename != "-" => Ok(InputReader::File(File::open(filename)?)),
            _ => Ok(InputReader::Stdin(io::stdin())),
        }
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputReader::File(f) => f.read(buf),
            InputReader::Stdin(handle) => handle.read(buf),
        }
    }
}

/// The data format being written out.
pub(crate) enum OutputFormat {
    /// Ciphertext, which should not land on a TTY by default.
    Binary,
    /// Decrypted data; whatever the user encrypted is their business.
    Unknown,
}

/// Wrapper around either a file or standard output.
pub(crate) enum OutputWriter {
    File(File),
    Stdout(io::Stdout),
}

impl OutputWriter {
    pub(crate) fn new(output: Option<&str>, format: OutputFormat) -> io::Result<Self> {
        match output {
            Some(filename) if filename != "-" => Ok(OutputWriter::File(File::create(filename)?)),
            // An explicit "-" is a request to have it, TTY or not.
            Some(_) => Ok(OutputWriter::Stdout(io::stdout())),
            None => {
                if matches!(format, OutputFormat::Binary) && console::user_attended() {
                    return Err(io::Error::new(io::ErrorKind::Other, DenyBinaryOutputError));
                }
                Ok(OutputWriter::Stdout(io::stdout()))
            }
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::File(f) => f.write(data),
            OutputWriter::Stdout(handle) => handle.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::File(f) => f.flush(),
            OutputWriter::Stdout(handle) => handle.flush(),
        }
    }
}
