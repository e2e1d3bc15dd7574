//! Per-trigger run context.
//!
//! A [`RunContext`] holds everything scoped to one trigger's run: its name, the run
//! timestamp, the directories it may use and the job registry filled while loading
//! its definition. [`ContextManager::enter`] hands it out wrapped in a [`RunScope`],
//! whose drop performs [`ContextManager::leave`], so teardown happens on every exit
//! path including panics raised by the job.

use std::cell::Cell;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info};
use thiserror::Error;

use crate::jobs::registry::JobRegistry;
use crate::settings::Paths;

/// Format of [`RunContext::time`], second precision
pub const TIME_FORMAT: &str = "%Y.%m.%d.%H.%M.%S";

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Unable to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Trigger '{0}' is not a plain name and cannot be used below the data root")]
    InvalidTrigger(String),
}

fn create_dir(path: &Path) -> Result<(), ContextError> {
    std::fs::create_dir_all(path).map_err(|source| ContextError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Directories available to a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPaths {
    pub work_dir: PathBuf,
    pub data: PathBuf,
    pub cache: PathBuf,
    pub log: PathBuf,
    pub tmp: PathBuf,
}

#[derive(Debug)]
pub struct RunContext {
    pub trigger: String,
    pub time: String,
    pub started: DateTime<Local>,
    pub paths: RunPaths,
    pub registry: JobRegistry,
}

impl RunContext {
    /// Environment exported to every step of the job
    #[must_use]
    pub fn env_vars(&self) -> Vec<(&'static str, &OsStr)> {
        vec![
            ("BACKUP_TRIGGER", OsStr::new(&self.trigger)),
            ("BACKUP_TIME", OsStr::new(&self.time)),
            ("BACKUP_WORK_DIR", self.paths.work_dir.as_os_str()),
            ("BACKUP_DATA_PATH", self.paths.data.as_os_str()),
            ("BACKUP_CACHE_PATH", self.paths.cache.as_os_str()),
            ("BACKUP_LOG_PATH", self.paths.log.as_os_str()),
            ("BACKUP_TMP_PATH", self.paths.tmp.as_os_str()),
        ]
    }

    fn clear(&mut self) {
        self.trigger.clear();
        self.time.clear();
        self.registry.reset();
    }
}

/// Creates and tears down run contexts, counting both
#[derive(Debug)]
pub struct ContextManager {
    paths: Paths,
    entered: Cell<usize>,
    left: Cell<usize>,
}

impl ContextManager {
    #[must_use]
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            entered: Cell::new(0),
            left: Cell::new(0),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Create the data, cache, log and tmp roots.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::DirectoryCreationFailed` if any root cannot be created.
    pub fn ensure_roots(&self) -> Result<(), ContextError> {
        for dir in [
            &self.paths.data,
            &self.paths.cache,
            &self.paths.log,
            &self.paths.tmp,
        ] {
            create_dir(dir)?;
        }
        Ok(())
    }

    /// Start a run for `trigger`, creating its working directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::InvalidTrigger` if `trigger` is not a plain name, or
    /// `ContextError::DirectoryCreationFailed` if the working directory cannot be
    /// created.
    pub fn enter(&self, trigger: &str) -> Result<RunScope<'_>, ContextError> {
        let work_dir = self
            .paths
            .work_dir(trigger)
            .ok_or_else(|| ContextError::InvalidTrigger(trigger.to_string()))?;
        create_dir(&work_dir)?;

        let started = Local::now();
        let ctx = RunContext {
            trigger: trigger.to_string(),
            time: started.format(TIME_FORMAT).to_string(),
            started,
            paths: RunPaths {
                work_dir,
                data: self.paths.data.clone(),
                cache: self.paths.cache.clone(),
                log: self.paths.log.clone(),
                tmp: self.paths.tmp.clone(),
            },
            registry: JobRegistry::default(),
        };
        info!("Starting run for trigger '{}' at {}", ctx.trigger, ctx.time);
        self.entered.set(self.entered.get() + 1);
        Ok(RunScope { manager: self, ctx })
    }

    /// Clear the run's identity and job registry.
    pub fn leave(&self, ctx: &mut RunContext) {
        debug!("Leaving run context for trigger '{}'", ctx.trigger);
        ctx.clear();
        self.left.set(self.left.get() + 1);
    }

    /// Number of contexts entered so far
    #[must_use]
    pub fn entered(&self) -> usize {
        self.entered.get()
    }

    /// Number of contexts torn down so far
    #[must_use]
    pub fn left(&self) -> usize {
        self.left.get()
    }

    /// Contexts currently entered and not yet left
    #[must_use]
    pub fn live(&self) -> usize {
        self.entered() - self.left()
    }
}

/// A live run context, torn down when dropped
#[derive(Debug)]
pub struct RunScope<'a> {
    manager: &'a ContextManager,
    ctx: RunContext,
}

impl RunScope<'_> {
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.ctx
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        self.manager.leave(&mut self.ctx);
    }
}
