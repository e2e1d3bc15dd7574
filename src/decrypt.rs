//! Decryption of backup archives with an external encryption tool

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;
use std::str::FromStr;

use log::info;
use thiserror::Error;

use crate::dependencies::{self, DependencyError};

#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("unknown encryptor '{0}' (expected 'openssl' or 'gpg')")]
    UnknownEncryptor(String),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("unable to run {encryptor}: {source}")]
    Spawn {
        encryptor: Encryptor,
        #[source]
        source: std::io::Error,
    },
    #[error("{encryptor} exited unsuccessfully (exit code {code:?})")]
    Failed {
        encryptor: Encryptor,
        code: Option<i32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryptor {
    Openssl,
    Gpg,
}

impl Encryptor {
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Encryptor::Openssl => "openssl",
            Encryptor::Gpg => "gpg",
        }
    }
}

impl fmt::Display for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for Encryptor {
    type Err = DecryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openssl" => Ok(Encryptor::Openssl),
            "gpg" => Ok(Encryptor::Gpg),
            _ => Err(DecryptError::UnknownEncryptor(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecryptOptions {
    pub encryptor: Encryptor,
    pub input: PathBuf,
    pub output: PathBuf,
    /// openssl only: input is base64 encoded
    pub base64: bool,
    /// openssl only: input was encrypted with a salt
    pub salt: bool,
}

/// Build the decryption command without running it
#[must_use]
pub fn command(program: &Path, options: &DecryptOptions) -> ProcessCommand {
    let mut cmd = ProcessCommand::new(program);
    match options.encryptor {
        Encryptor::Openssl => {
            cmd.args(["aes-256-cbc", "-d"]);
            if options.base64 {
                cmd.arg("-base64");
            }
            if options.salt {
                cmd.arg("-salt");
            }
            cmd.arg("-in")
                .arg(&options.input)
                .arg("-out")
                .arg(&options.output);
        }
        Encryptor::Gpg => {
            cmd.arg("-o")
                .arg(&options.output)
                .arg("-d")
                .arg(&options.input);
        }
    }
    cmd
}

/// Decrypt `options.input` into `options.output`. The tool prompts for the passphrase.
///
/// # Errors
///
/// Returns `DecryptError::Dependency` if the tool is not installed, or
/// `DecryptError::Spawn`/`DecryptError::Failed` if it cannot run or fails.
pub fn run(options: &DecryptOptions) -> Result<(), DecryptError> {
    let program = dependencies::load(options.encryptor.binary())?;
    info!(
        "Decrypting {} with {} into {}",
        options.input.display(),
        options.encryptor,
        options.output.display()
    );
    let status = command(&program, options)
        .status()
        .map_err(|source| DecryptError::Spawn {
            encryptor: options.encryptor,
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(DecryptError::Failed {
            encryptor: options.encryptor,
            code: status.code(),
        })
    }
}
