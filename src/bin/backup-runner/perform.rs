use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;

use backup_runner::logger;
use backup_runner::settings::Overrides;

#[derive(Args, Debug)]
pub struct PerformArgs {
    /// Comma separated triggers to perform; `*` matches any characters
    #[arg(short, long, required = true)]
    trigger: Vec<String>,

    /// Path to the configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Root directory for the default config, data, log, cache and tmp paths
    #[arg(short, long)]
    root_path: Option<PathBuf>,

    /// Directory holding one working directory per trigger
    #[arg(short, long)]
    data_path: Option<PathBuf>,

    /// Directory for the log file
    #[arg(short, long)]
    log_path: Option<PathBuf>,

    /// Cache directory
    #[arg(long)]
    cache_path: Option<PathBuf>,

    /// Temporary directory
    #[arg(long)]
    tmp_path: Option<PathBuf>,

    /// Only write to the log file
    #[arg(short, long)]
    quiet: bool,

    /// Run each resolved trigger only once
    #[arg(long)]
    dedup: bool,
}

impl PerformArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root_path.clone(),
            config_file: self.config_file.clone(),
            data: self.data_path.clone(),
            log: self.log_path.clone(),
            cache: self.cache_path.clone(),
            tmp: self.tmp_path.clone(),
        }
    }
}

/// Run the perform subcommand.
///
/// # Errors
///
/// Returns an error if a required directory cannot be created, the log file cannot be
/// opened, or wildcard triggers cannot be expanded.
pub fn run(args: &PerformArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let paths = args.overrides().resolve();
    let log_file = logger::open_log_file(&paths.log_file())?;
    logger::init(args.quiet, Some(log_file))?;

    let summary = backup_runner::perform(&paths, &args.trigger, args.dedup, args.quiet)?;
    log::logger().flush();
    if summary.exit_code() == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
