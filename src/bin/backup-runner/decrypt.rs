use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;

use backup_runner::decrypt::{self, DecryptOptions, Encryptor};
use backup_runner::logger;

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Encryptor the archive was encrypted with: openssl or gpg
    #[arg(short, long)]
    encryptor: String,

    /// Encrypted input file
    #[arg(long = "in")]
    input: PathBuf,

    /// Decrypted output file
    #[arg(long = "out")]
    output: PathBuf,

    /// Input is base64 encoded (openssl only)
    #[arg(long)]
    base64: bool,

    /// Input was encrypted with a salt (openssl only)
    #[arg(long)]
    salt: bool,
}

/// Run the decrypt subcommand.
///
/// # Errors
///
/// Returns an error if the encryptor is unknown or missing, or decryption fails.
pub fn run(args: &DecryptArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    logger::init(false, None)?;
    let encryptor: Encryptor = args.encryptor.parse()?;
    decrypt::run(&DecryptOptions {
        encryptor,
        input: args.input.clone(),
        output: args.output.clone(),
        base64: args.base64,
        salt: args.salt,
    })?;
    Ok(ExitCode::SUCCESS)
}
