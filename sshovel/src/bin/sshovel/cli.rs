use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shovel::agent::FingerprintHash;

fn after_help() -> String {
    format!(
        "Ciphers: {}\n\n\
         With no flags, sshovel inspects its input: a sshovel file is\n\
         decrypted, anything else is encrypted.",
        shovel::cipher::names().join(", "),
    )
}

#[derive(Debug, Parser)]
#[command(name = "sshovel", version)]
#[command(about = "Encrypt files with ssh-agent, scrypt and a shovel")]
#[command(after_help(after_help()))]
pub(crate) struct Options {
    /// Input file (default: standard input; "-" is also standard input).
    #[arg(value_name = "IN")]
    pub(crate) input: Option<String>,

    /// Output file (default: standard output; "-" is also standard output).
    #[arg(value_name = "OUT")]
    pub(crate) output: Option<String>,

    /// Body cipher to encrypt with [default: $SSHOVEL_CIPHER, else scrypt].
    #[arg(long, value_name = "NAME")]
    pub(crate) cipher: Option<String>,

    /// Use the ssh key whose comment contains MATCH.
    #[arg(long, value_name = "MATCH")]
    pub(crate) key: Option<String>,

    /// Digest used to display key fingerprints.
    #[arg(long, value_enum, value_name = "HASH", default_value = "sha256")]
    pub(crate) fingerprint_hash: FingerprintArg,

    /// Decrypt FILE (if needed), run $EDITOR on it, re-encrypt the result.
    #[arg(long, value_name = "FILE")]
    #[arg(conflicts_with_all = ["input", "output"])]
    pub(crate) edit: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum FingerprintArg {
    Md5,
    Sha256,
}

impl From<FingerprintArg> for FingerprintHash {
    fn from(arg: FingerprintArg) -> Self {
        match arg {
            FingerprintArg::Md5 => FingerprintHash::Md5,
            FingerprintArg::Sha256 => FingerprintHash::Sha256,
        }
    }
}
