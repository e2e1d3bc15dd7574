//! Core implementation of the backup trigger runner
//!
//! Operators describe named backup jobs ("triggers") in a configuration file and run
//! one or many of them by name or wildcard pattern. Triggers run strictly one after
//! another, each inside a fresh run context holding its name, timestamp, directories
//! and the job definitions loaded for it.

use log::debug;

use crate::context::ContextManager;
use crate::jobs::loader::ConfigLoader;
use crate::perform::{Driver, PerformError, Summary};
use crate::settings::Paths;

pub mod config_file;
pub mod context;
pub mod decrypt;
pub mod dependencies;
pub mod generate;
pub mod jobs;
pub mod logger;
pub mod output;
pub mod perform;
pub mod settings;
pub mod trigger;

/// Run the requested triggers against the configuration file named in `paths`.
///
/// # Errors
///
/// Returns `PerformError` if a required directory cannot be created or the trigger
/// catalog is needed and cannot be read. Failures of single triggers are reported in
/// the returned `Summary`.
pub fn perform<S: AsRef<str>>(
    paths: &Paths,
    requests: &[S],
    dedup: bool,
    quiet: bool,
) -> Result<Summary, PerformError> {
    debug!(
        "Performing with config {} (data: {})",
        paths.config_file.display(),
        paths.data.display()
    );
    let loader = ConfigLoader::new(&paths.config_file);
    let contexts = ContextManager::new(paths.clone());
    Driver::new(&loader, &contexts)
        .quiet(quiet)
        .perform(requests, dedup)
}
