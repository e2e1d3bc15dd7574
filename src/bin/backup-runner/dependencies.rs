use std::process::ExitCode;

use clap::Args;

use backup_runner::dependencies::{self, CATALOG};
use backup_runner::output::Style;

#[derive(Args, Debug)]
pub struct DependenciesArgs {
    /// Print only the dependency names, one per line
    #[arg(short, long)]
    pub(crate) names: bool,

    /// Check whether a single dependency is installed
    #[arg(short, long, value_name = "NAME")]
    pub(crate) installed: Option<String>,
}

/// Run the dependencies subcommand.
///
/// # Errors
///
/// Returns an error if the named dependency is unknown or not installed.
pub fn run(args: &DependenciesArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if let Some(ref name) = args.installed {
        let path = dependencies::load(name)?;
        println!("{name} is installed at {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if args.names {
        for dep in CATALOG {
            println!("{}", dep.name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let sty = Style::new();
    let width = CATALOG.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for dep in CATALOG {
        let status = if dependencies::find_in_path(dep.name).is_some() {
            sty.green("installed")
        } else {
            sty.dim("missing  ")
        };
        println!("{:<width$}  {status}  {}", dep.name, dep.required_for);
    }
    Ok(ExitCode::SUCCESS)
}
