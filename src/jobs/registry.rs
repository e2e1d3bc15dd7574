use crate::jobs::definition::JobDefinition;

/// Archive format used by jobs that do not declare their own
pub const DEFAULT_ARCHIVE_FORMAT: &str = "tar";

/// Job definitions accumulated while loading a configuration file.
///
/// Each run context owns its own registry; `reset` returns it to the state a
/// fresh registry starts in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRegistry {
    pub current_job: Option<JobDefinition>,
    pub all_jobs: Vec<JobDefinition>,
    pub default_archive_format: String,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self {
            current_job: None,
            all_jobs: Vec::new(),
            default_archive_format: DEFAULT_ARCHIVE_FORMAT.to_string(),
        }
    }
}

impl JobRegistry {
    /// Clear the current job and all loaded jobs, and restore the default archive format
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current_job.is_none() && self.all_jobs.is_empty()
    }

    #[must_use]
    pub fn find(&self, trigger: &str) -> Option<&JobDefinition> {
        self.all_jobs.iter().find(|job| job.trigger == trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_restores_defaults() {
        let job = JobDefinition {
            trigger: "db".to_string(),
            ..Default::default()
        };
        let mut registry = JobRegistry {
            current_job: Some(job.clone()),
            all_jobs: vec![job],
            default_archive_format: "zip".to_string(),
        };
        assert!(!registry.is_empty());

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.default_archive_format, DEFAULT_ARCHIVE_FORMAT);
    }
}
