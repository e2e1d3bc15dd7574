use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;

use backup_runner::generate::{self, Selection};
use backup_runner::logger;
use backup_runner::settings::{CONFIG_FILE_NAME, Paths};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory to write the configuration file into (defaults to ~/Backup)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Trigger name of the generated job
    #[arg(short, long)]
    trigger: Option<String>,

    /// Database templates, e.g. mysql,postgresql
    #[arg(long, value_delimiter = ',')]
    databases: Vec<String>,

    /// Compressor templates, e.g. gzip
    #[arg(long, value_delimiter = ',')]
    compressors: Vec<String>,

    /// Encryptor templates, e.g. openssl
    #[arg(long, value_delimiter = ',')]
    encryptors: Vec<String>,

    /// Storage templates, e.g. local,rsync
    #[arg(long, value_delimiter = ',')]
    storages: Vec<String>,

    /// Notifier templates, e.g. mail
    #[arg(long, value_delimiter = ',')]
    notifiers: Vec<String>,

    /// List the available templates and exit
    #[arg(long)]
    list: bool,

    /// Overwrite an existing configuration file without asking
    #[arg(long)]
    force: bool,
}

fn confirm_overwrite(path: &Path) -> bool {
    inquire::Confirm::new(&format!("{} already exists. Overwrite?", path.display()))
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}

/// Run the generate subcommand.
///
/// # Errors
///
/// Returns an error if a template is unknown or the file cannot be written.
pub fn run(args: &GenerateArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if args.list {
        println!("{}", generate::describe_templates());
        return Ok(ExitCode::SUCCESS);
    }
    logger::init(false, None)?;

    let selection = Selection {
        trigger: args.trigger.clone(),
        databases: args.databases.clone(),
        compressors: args.compressors.clone(),
        encryptors: args.encryptors.clone(),
        storages: args.storages.clone(),
        notifiers: args.notifiers.clone(),
    };
    let contents = generate::render(&selection)?;
    let dir = args.path.clone().unwrap_or_else(Paths::default_root);
    let path = dir.join(CONFIG_FILE_NAME);

    if generate::write(&path, &contents, args.force, confirm_overwrite)? {
        println!("Generated configuration file at {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
