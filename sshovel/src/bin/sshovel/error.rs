use std::fmt;
use std::io;

pub(crate) enum Error {
    AmbiguousKey {
        pattern: String,
        matches: Vec<String>,
    },
    EditorFailed(String),
    Io(io::Error),
    NoKeyMatched {
        pattern: String,
        known: Vec<String>,
    },
    NoKeys,
    Shovel(shovel::Error),
}

impl From<shovel::Error> for Error {
    fn from(e: shovel::Error) -> Self {
        Error::Shovel(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

// Rust only supports `fn main() -> Result<(), E: Debug>`, so we implement
// `Debug` manually to provide the error output we want.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AmbiguousKey { pattern, matches } => write!(
                f,
                "more than one key matched '{}': {}",
                pattern,
                matches.join(", "),
            ),
            Error::EditorFailed(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "{}", e),
            Error::NoKeyMatched { pattern, known } => write!(
                f,
                "no ssh key matched '{}'; known keys: {}",
                pattern,
                known.join(", "),
            ),
            Error::NoKeys => write!(f, "the ssh agent holds no keys"),
            Error::Shovel(e) => write!(f, "{}", e),
        }
    }
}
