//! Configuration file handling for backup jobs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jobs::definition::{JobDefinition, Step};
use crate::trigger;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unable to parse YAML config file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON config file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Duplicate trigger in config: {0}")]
    DuplicateTrigger(String),
    #[error("Invalid config: {0}")]
    Validation(String),
}

/// Configuration for a single step of a job
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConfigStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cmd: String,
}

/// Configuration for a single backup job
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConfigJob {
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    pub steps: Option<Vec<ConfigStep>>,
}

impl ConfigJob {
    /// Build a job definition, falling back to `default_archive_format` when the job
    /// does not name one.
    #[must_use]
    pub fn into_definition(self, default_archive_format: &str) -> JobDefinition {
        let steps = self
            .steps
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, step)| Step {
                name: step.name.unwrap_or_else(|| format!("step {}", i + 1)),
                cmd: step.cmd,
            })
            .collect();
        JobDefinition {
            label: self.label.unwrap_or_else(|| self.trigger.clone()),
            trigger: self.trigger,
            archive_format: self
                .archive_format
                .unwrap_or_else(|| default_archive_format.to_string()),
            env: self.env.unwrap_or_default(),
            steps,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub backup_version: String,
    #[serde(default)]
    pub jobs: Vec<ConfigJob>,
}

impl Config {
    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ConfigError::ConfigNotFound(file.to_path_buf()))?;
        debug!("Parsing config file {}", file.display());
        let config: Config = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(config)
    }

    /// Load, version-check and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unparsable, or fails validation.
    pub fn load(file: &Path) -> Result<Config, ConfigError> {
        let config = Self::from_file(file)?;
        validate_version(&config.backup_version);
        config.validate()?;
        Ok(config)
    }

    /// Trigger names in the order they appear in the file.
    #[must_use]
    pub fn triggers(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.trigger.clone()).collect()
    }

    /// Validate the job list for duplicate triggers, empty names and missing steps
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateTrigger` or `ConfigError::Validation`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.trigger.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Job with an empty trigger".to_string(),
                ));
            }
            if job.trigger.contains(['*', ',']) {
                return Err(ConfigError::Validation(format!(
                    "Trigger '{}' contains a reserved character",
                    job.trigger
                )));
            }
            if !trigger::is_valid_name(&job.trigger) {
                return Err(ConfigError::Validation(format!(
                    "Trigger '{}' must be a plain name without path separators, '.' or '..'",
                    job.trigger
                )));
            }
            if !seen.insert(job.trigger.as_str()) {
                return Err(ConfigError::DuplicateTrigger(job.trigger.clone()));
            }
            let steps = job.steps.as_deref().unwrap_or_default();
            if steps.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Job '{}' has no steps",
                    job.trigger
                )));
            }
            if let Some(step) = steps.iter().find(|s| s.cmd.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "Job '{}' has a step with an empty cmd string ({})",
                    job.trigger,
                    step.name.as_deref().unwrap_or("unnamed")
                )));
            }
        }
        Ok(())
    }
}

/// Warn if the config's `backup_version` doesn't match the binary version
fn validate_version(config_version: &str) {
    let binary_version = env!("CARGO_PKG_VERSION");
    if config_version != binary_version {
        warn!(
            "Config backup_version '{config_version}' differs from binary version '{binary_version}'"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_job(trigger: &str, cmds: &[&str]) -> ConfigJob {
        ConfigJob {
            trigger: trigger.to_string(),
            label: None,
            archive_format: None,
            env: None,
            steps: Some(
                cmds.iter()
                    .map(|c| ConfigStep {
                        name: None,
                        cmd: (*c).to_string(),
                    })
                    .collect(),
            ),
        }
    }

    fn make_config(jobs: Vec<ConfigJob>) -> Config {
        Config {
            backup_version: env!("CARGO_PKG_VERSION").to_string(),
            jobs,
        }
    }

    #[test]
    fn test_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "backup_version": "0.1.0",
                "jobs": [{"trigger": "db", "steps": [{"cmd": "echo hello"}]}]
            }"#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.triggers(), vec!["db".to_string()]);
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "backup_version: '0.1.0'\njobs:\n  - trigger: web\n    steps:\n      - cmd: echo hello\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.jobs[0].trigger, "web");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yml");
        match Config::from_file(&path) {
            Err(ConfigError::ConfigNotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected ConfigNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_trigger_detection() {
        let config = make_config(vec![make_job("db", &["true"]), make_job("db", &["true"])]);
        match config.validate() {
            Err(ConfigError::DuplicateTrigger(t)) => assert_eq!(t, "db"),
            other => panic!("Expected DuplicateTrigger, got: {other:?}"),
        }
    }

    #[test]
    fn test_job_without_steps_is_invalid() {
        let config = make_config(vec![make_job("db", &[])]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_cmd_is_invalid() {
        let config = make_config(vec![make_job("db", &["echo ok", "  "])]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_wildcard_in_trigger_is_invalid() {
        let config = make_config(vec![make_job("db-*", &["true"])]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_path_like_trigger_is_invalid() {
        for name in ["../escape", "/var/backups", "db/nested", "."] {
            let config = make_config(vec![make_job(name, &["true"])]);
            match config.validate() {
                Err(ConfigError::Validation(msg)) => assert!(msg.contains(name), "{msg}"),
                other => panic!("Expected Validation for {name}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_into_definition_defaults() {
        let def = make_job("db", &["echo a", "echo b"]).into_definition("tar");
        assert_eq!(def.label, "db");
        assert_eq!(def.archive_format, "tar");
        assert_eq!(def.steps[1].name, "step 2");
    }
}
