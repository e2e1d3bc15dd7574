use std::collections::HashMap;
use std::process::Command as ProcessCommand;
use std::time::Instant;

use log::{debug, info};
use thiserror::Error;

use crate::context::RunContext;

/// Errors raised by a job's steps while it runs
#[derive(Error, Debug)]
pub enum StepError {
    #[error("unable to start step '{step}': {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },
    #[error("step '{step}' {}{}", describe_exit(.exit_code), describe_stderr(.stderr))]
    Failed {
        step: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

#[allow(clippy::ref_option)]
fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    match stderr.lines().last() {
        Some(line) if !line.trim().is_empty() => format!(": {}", line.trim()),
        _ => String::new(),
    }
}

/// A single shell command executed as part of a job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub cmd: String,
}

/// A named backup job, as declared in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDefinition {
    pub trigger: String,
    pub label: String,
    pub archive_format: String,
    pub env: HashMap<String, String>,
    pub steps: Vec<Step>,
}

impl JobDefinition {
    /// Run every step in order inside the trigger's working directory, stopping at the
    /// first step that fails.
    ///
    /// # Errors
    ///
    /// Returns `StepError::Spawn` if a step cannot be started, or `StepError::Failed`
    /// if it exits unsuccessfully.
    pub fn perform(&self, ctx: &RunContext) -> Result<(), StepError> {
        info!(
            "Performing '{}' ({} step(s), archive format {})",
            self.label,
            self.steps.len(),
            self.archive_format
        );
        for step in &self.steps {
            let start = Instant::now();
            let output = ProcessCommand::new("sh")
                .arg("-c")
                .arg(&step.cmd)
                .current_dir(&ctx.paths.work_dir)
                .envs(ctx.env_vars())
                .env("BACKUP_ARCHIVE_FORMAT", &self.archive_format)
                .envs(&self.env)
                .output()
                .map_err(|e| StepError::Spawn {
                    step: step.name.clone(),
                    source: e,
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                debug!("[{}/{}] {line}", self.trigger, step.name);
            }
            if !output.status.success() {
                return Err(StepError::Failed {
                    step: step.name.clone(),
                    exit_code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
            debug!(
                "Step '{}' of '{}' finished in {:.1}s",
                step.name,
                self.trigger,
                start.elapsed().as_secs_f64()
            );
        }
        Ok(())
    }
}
