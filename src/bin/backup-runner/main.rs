mod decrypt;
mod dependencies;
mod generate;
mod perform;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "backup-runner",
    about = "Run named backup jobs from a configuration file",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Perform one or more backup triggers, in the order given
    Perform(perform::PerformArgs),
    /// Generate a configuration file from template fragments
    Generate(generate::GenerateArgs),
    /// Decrypt an encrypted backup archive
    Decrypt(decrypt::DecryptArgs),
    /// List the external tools jobs may depend on, or check for one
    Dependencies(dependencies::DependenciesArgs),
    /// Print the version
    Version,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Perform(ref args) => perform::run(args),
        Commands::Generate(ref args) => generate::run(args),
        Commands::Decrypt(ref args) => decrypt::run(args),
        Commands::Dependencies(ref args) => dependencies::run(args),
        Commands::Version => {
            println!("backup-runner {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}
