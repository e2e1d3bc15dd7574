use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::config_file::{Config, ConfigError};
use crate::jobs::definition::JobDefinition;
use crate::jobs::registry::JobRegistry;

/// Errors raised while locating a job definition
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not find trigger '{0}' in the configuration")]
    NotFound(String),
    #[error("Job definitions for '{trigger}' are invalid: {source}")]
    Invalid {
        trigger: String,
        #[source]
        source: ConfigError,
    },
    #[error("Job definitions cannot be read: {0}")]
    Catalog(#[source] ConfigError),
}

/// Source of job definitions.
pub trait JobLoader {
    /// Names of every known job, in definition order.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Catalog` if the definitions cannot be read.
    fn catalog(&self) -> Result<Vec<String>, LoadError>;

    /// Load the definitions into `registry` and return the one named by `trigger`.
    ///
    /// Implementations record every definition they see in `registry.all_jobs` and
    /// the requested one in `registry.current_job`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotFound` if no job has this trigger, or
    /// `LoadError::Invalid` if the definitions cannot be parsed.
    fn load(&self, trigger: &str, registry: &mut JobRegistry) -> Result<JobDefinition, LoadError>;
}

/// Loads jobs from a YAML or JSON configuration file, re-reading it on every load
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

}

impl JobLoader for ConfigLoader {
    fn catalog(&self) -> Result<Vec<String>, LoadError> {
        let config = Config::load(&self.path).map_err(LoadError::Catalog)?;
        Ok(config.triggers())
    }

    fn load(&self, trigger: &str, registry: &mut JobRegistry) -> Result<JobDefinition, LoadError> {
        let config = Config::load(&self.path).map_err(|source| LoadError::Invalid {
            trigger: trigger.to_string(),
            source,
        })?;
        debug!(
            "Loaded {} job definition(s) from {}",
            config.jobs.len(),
            self.path.display()
        );
        let default_format = registry.default_archive_format.clone();
        registry.all_jobs.extend(
            config
                .jobs
                .into_iter()
                .map(|job| job.into_definition(&default_format)),
        );
        let job = registry
            .find(trigger)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(trigger.to_string()))?;
        registry.current_job = Some(job.clone());
        Ok(job)
    }
}
