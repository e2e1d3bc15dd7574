use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config_file::ConfigError;
use crate::context::{ContextError, ContextManager, RunContext};
use crate::jobs::definition::StepError;
use crate::jobs::loader::{JobLoader, LoadError};
use crate::output::Style;
use crate::trigger;

/// Failure of a single trigger. The driver records it and moves on to the next one.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("trigger '{0}' not found")]
    TriggerNotFound(String),
    #[error("definition of trigger '{trigger}' is invalid: {source}")]
    DefinitionInvalid {
        trigger: String,
        #[source]
        source: ConfigError,
    },
    #[error("trigger '{trigger}' failed: {source}")]
    ExecutionFailed {
        trigger: String,
        #[source]
        source: StepError,
    },
}

impl RunError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::TriggerNotFound(_) => "not found",
            RunError::DefinitionInvalid { .. } => "invalid definition",
            RunError::ExecutionFailed { .. } => "execution failed",
        }
    }

    /// Map a loader failure for `trigger` to the per-trigger error
    #[must_use]
    pub fn from_load(trigger: &str, e: LoadError) -> Self {
        match e {
            LoadError::NotFound(trigger) => RunError::TriggerNotFound(trigger),
            LoadError::Invalid { trigger, source } => {
                RunError::DefinitionInvalid { trigger, source }
            }
            LoadError::Catalog(source) => RunError::DefinitionInvalid {
                trigger: trigger.to_string(),
                source,
            },
        }
    }
}

/// Failure that aborts the whole invocation
#[derive(Error, Debug)]
pub enum PerformError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("Unable to list known triggers: {0}")]
    Catalog(#[source] LoadError),
}

#[derive(Debug)]
pub enum Outcome {
    Success,
    Failed(RunError),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug)]
pub struct TriggerReport {
    pub trigger: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Outcomes of every trigger in execution order
#[derive(Debug, Default)]
pub struct Summary {
    pub reports: Vec<TriggerReport>,
}

impl Summary {
    #[must_use]
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    /// `1` if any trigger failed, `0` otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed() > 0)
    }
}

/// Load the job named by the context's trigger and run it once.
pub fn load_and_run(loader: &dyn JobLoader, ctx: &mut RunContext) -> Outcome {
    debug_assert!(ctx.registry.is_empty());
    let job = match loader.load(&ctx.trigger, &mut ctx.registry) {
        Ok(job) => job,
        Err(e) => return Outcome::Failed(RunError::from_load(&ctx.trigger, e)),
    };
    match job.perform(ctx) {
        Ok(()) => Outcome::Success,
        Err(source) => Outcome::Failed(RunError::ExecutionFailed {
            trigger: job.trigger,
            source,
        }),
    }
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let tenths = d.subsec_millis() / 100;
    if total_secs < 60 {
        format!("{total_secs}.{tenths}s")
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{mins}m {secs}.{tenths}s")
    }
}

/// Runs triggers one after another, each inside its own run context
pub struct Driver<'a> {
    loader: &'a dyn JobLoader,
    contexts: &'a ContextManager,
    quiet: bool,
    sty: Style,
}

impl<'a> Driver<'a> {
    #[must_use]
    pub fn new(loader: &'a dyn JobLoader, contexts: &'a ContextManager) -> Self {
        Self {
            loader,
            contexts,
            quiet: false,
            sty: Style::new(),
        }
    }

    /// Suppress the progress lines and summary on stderr
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Expand the requested triggers, reading the catalog only when a wildcard needs it.
    ///
    /// # Errors
    ///
    /// Returns `PerformError::Catalog` if a wildcard is requested and the known
    /// triggers cannot be listed.
    pub fn resolve<S: AsRef<str>>(
        &self,
        requests: &[S],
        dedup: bool,
    ) -> Result<Vec<String>, PerformError> {
        let catalog = if trigger::needs_catalog(requests) {
            self.loader.catalog().map_err(PerformError::Catalog)?
        } else {
            Vec::new()
        };
        let triggers = trigger::resolve(requests, &catalog, dedup);
        debug!("Resolved triggers: {}", triggers.join(", "));
        Ok(triggers)
    }

    /// Create the roots, resolve `requests` and run every resulting trigger.
    ///
    /// # Errors
    ///
    /// Returns `PerformError` if a directory cannot be created or the catalog cannot be
    /// read. Failures of individual triggers are reported in the `Summary` instead.
    pub fn perform<S: AsRef<str>>(
        &self,
        requests: &[S],
        dedup: bool,
    ) -> Result<Summary, PerformError> {
        self.contexts.ensure_roots()?;
        let triggers = self.resolve(requests, dedup)?;
        self.run(&triggers)
    }

    /// Run `triggers` strictly in order. A failing trigger does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns `PerformError::Context` if a working directory cannot be created.
    pub fn run(&self, triggers: &[String]) -> Result<Summary, PerformError> {
        let mut summary = Summary::default();
        if triggers.is_empty() {
            info!("No triggers to perform");
            self.note(&self.sty.dim("No triggers to perform."));
            return Ok(summary);
        }

        let total = triggers.len();
        let total_start = Instant::now();
        let counter_width = total.to_string().len();

        for (i, trigger) in triggers.iter().enumerate() {
            let prefix = self.sty.bold(&format!("[{:>counter_width$}/{total}]", i + 1));
            let start = Instant::now();
            let outcome = if trigger::is_valid_name(trigger) {
                let mut scope = self.contexts.enter(trigger).inspect_err(|e| {
                    error!("Aborting at trigger '{trigger}': {e}");
                })?;
                load_and_run(self.loader, scope.context_mut())
            } else {
                warn!("Trigger '{trigger}' is not a plain name, skipping without a work dir");
                Outcome::Failed(RunError::TriggerNotFound(trigger.clone()))
            };
            let duration = start.elapsed();
            debug_assert_eq!(self.contexts.live(), 0);

            match &outcome {
                Outcome::Success => {
                    info!("Trigger '{trigger}' finished in {}", format_duration(duration));
                    self.note(&format!(
                        "{prefix} {trigger} {} {}",
                        self.sty.green("PASS"),
                        self.sty.dim(&format_duration(duration))
                    ));
                }
                Outcome::Failed(e) => {
                    error!("Trigger '{trigger}' ({}): {e}", e.kind());
                    self.note(&format!(
                        "{prefix} {trigger} {} {} {}",
                        self.sty.red("FAIL"),
                        self.sty.yellow(e.kind()),
                        self.sty.dim(&format_duration(duration))
                    ));
                }
            }
            summary.reports.push(TriggerReport {
                trigger: trigger.clone(),
                outcome,
                duration,
            });
        }

        self.print_summary(&summary, total_start.elapsed());
        Ok(summary)
    }

    fn note(&self, line: &str) {
        if !self.quiet {
            eprintln!("{line}");
        }
    }

    fn print_summary(&self, summary: &Summary, elapsed: Duration) {
        if self.quiet {
            return;
        }
        let mut parts = Vec::new();
        if summary.passed() > 0 {
            parts.push(self.sty.green(&format!("{} passed", summary.passed())));
        }
        if summary.failed() > 0 {
            parts.push(self.sty.red(&format!("{} failed", summary.failed())));
        }
        eprintln!();
        eprintln!(
            "{} {} {}",
            self.sty.bold(&format!("{} triggers:", summary.reports.len())),
            parts.join(self.sty.dim(", ").as_str()),
            self.sty.dim(&format!("({})", format_duration(elapsed)))
        );
    }
}
