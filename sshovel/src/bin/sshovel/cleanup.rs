//! Signal-triggered cleanup.
//!
//! The edit workflow keeps decrypted plaintext in a temp directory; if the
//! user interrupts the editor, that plaintext must not be left behind. Paths
//! registered here are removed when SIGINT or SIGQUIT arrives, before the
//! process exits. The normal exit paths clean up through `Drop` as usual.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use signal_hook::consts::{SIGINT, SIGQUIT};
use signal_hook::iterator::Signals;

static PATHS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Installs the handler thread. Call once, early.
pub(crate) fn init() -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGQUIT])?;
    thread::spawn(move || {
        if signals.forever().next().is_some() {
            for path in PATHS.lock().unwrap().drain(..) {
                let _ = fs::remove_dir_all(&path);
            }
            eprintln!("sshovel: interrupted");
            std::process::exit(1);
        }
    });
    Ok(())
}

pub(crate) fn register(path: &Path) {
    PATHS.lock().unwrap().push(path.to_owned());
}

pub(crate) fn unregister(path: &Path) {
    PATHS.lock().unwrap().retain(|p| p != path);
}
