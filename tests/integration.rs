use std::cell::RefCell;
use std::error::Error as _;
use std::path::PathBuf;

use backup_runner::context::ContextManager;
use backup_runner::jobs::definition::{JobDefinition, StepError};
use backup_runner::jobs::loader::{ConfigLoader, JobLoader, LoadError};
use backup_runner::jobs::registry::JobRegistry;
use backup_runner::perform::{Driver, Outcome, PerformError, RunError};
use backup_runner::settings::Paths;

const CONFIG: &str = r#"
backup_version: "0.1.0"
jobs:
  - trigger: db-a
    steps:
      - name: dump
        cmd: echo "$BACKUP_TRIGGER $BACKUP_TIME" > dump.txt
  - trigger: db-b
    archive_format: zip
    steps:
      - name: dump
        cmd: echo "$BACKUP_ARCHIVE_FORMAT" > dump.txt
      - name: broken
        cmd: echo "disk full" >&2; exit 4
  - trigger: web
    env:
      SITE: example.org
    steps:
      - name: mirror
        cmd: echo "$SITE" > site.txt
"#;

fn setup(content: &str) -> (tempfile::TempDir, Paths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::under(dir.path());
    std::fs::write(&paths.config_file, content).unwrap();
    (dir, paths)
}

fn triggers(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Wraps another loader and records the registry state it was handed
struct ObservingLoader<L> {
    inner: L,
    seen: RefCell<Vec<(String, bool)>>,
}

impl<L: JobLoader> JobLoader for ObservingLoader<L> {
    fn catalog(&self) -> Result<Vec<String>, LoadError> {
        self.inner.catalog()
    }

    fn load(&self, trigger: &str, registry: &mut JobRegistry) -> Result<JobDefinition, LoadError> {
        self.seen
            .borrow_mut()
            .push((trigger.to_string(), registry.is_empty()));
        self.inner.load(trigger, registry)
    }
}

#[test]
fn test_wildcards_expand_in_catalog_order() {
    let (_dir, paths) = setup(CONFIG);
    let loader = ConfigLoader::new(&paths.config_file);
    let contexts = ContextManager::new(paths);
    let driver = Driver::new(&loader, &contexts).quiet(true);

    let resolved = driver.resolve(&["web,db-*"], false).unwrap();
    assert_eq!(resolved, vec!["web", "db-a", "db-b"]);
}

#[test]
fn test_each_trigger_runs_in_its_own_work_dir() {
    let (dir, paths) = setup(CONFIG);
    let summary = backup_runner::perform(&paths, &["db-a, web"], false, true).unwrap();

    assert_eq!(summary.exit_code(), 0);
    let dump = std::fs::read_to_string(dir.path().join("data/db-a/dump.txt")).unwrap();
    let mut words = dump.split_whitespace();
    assert_eq!(words.next(), Some("db-a"));
    assert_eq!(words.next().map(|t| t.split('.').count()), Some(6));
    let site = std::fs::read_to_string(dir.path().join("data/web/site.txt")).unwrap();
    assert_eq!(site.trim(), "example.org");
    for root in [&paths.cache, &paths.log, &paths.tmp] {
        assert!(root.is_dir());
    }
}

#[test]
fn test_failing_trigger_does_not_stop_the_rest() {
    let (_dir, paths) = setup(CONFIG);
    let loader = ConfigLoader::new(&paths.config_file);
    let contexts = ContextManager::new(paths);
    let driver = Driver::new(&loader, &contexts).quiet(true);

    let summary = driver.run(&triggers(&["db-a", "db-b", "web"])).unwrap();
    let outcomes: Vec<bool> = summary
        .reports
        .iter()
        .map(|r| r.outcome.is_success())
        .collect();
    assert_eq!(outcomes, vec![true, false, true]);
    assert_eq!(summary.passed(), 2);
    assert_eq!(summary.exit_code(), 1);

    match &summary.reports[1].outcome {
        Outcome::Failed(err @ RunError::ExecutionFailed { trigger, .. }) => {
            assert_eq!(trigger, "db-b");
            let cause = err.source().unwrap().downcast_ref::<StepError>().unwrap();
            assert!(matches!(
                cause,
                StepError::Failed { step, exit_code: Some(4), stderr } if step == "broken" && stderr.contains("disk full")
            ));
        }
        other => panic!("Expected ExecutionFailed, got: {other:?}"),
    }
}

#[test]
fn test_teardown_count_matches_setup_count() {
    let (_dir, paths) = setup(CONFIG);
    let loader = ConfigLoader::new(&paths.config_file);
    let contexts = ContextManager::new(paths);
    let driver = Driver::new(&loader, &contexts).quiet(true);

    let list = triggers(&["db-b", "missing", "db-a", "db-b", "web"]);
    let summary = driver.run(&list).unwrap();
    assert_eq!(summary.reports.len(), list.len());
    assert_eq!(contexts.entered(), list.len());
    assert_eq!(contexts.left(), list.len());
}

#[test]
fn test_registry_is_empty_when_each_load_starts() {
    let (_dir, paths) = setup(CONFIG);
    let loader = ObservingLoader {
        inner: ConfigLoader::new(&paths.config_file),
        seen: RefCell::new(Vec::new()),
    };
    let contexts = ContextManager::new(paths);
    let driver = Driver::new(&loader, &contexts).quiet(true);

    driver.run(&triggers(&["db-a", "db-b", "web"])).unwrap();
    assert_eq!(
        loader.seen.into_inner(),
        vec![
            ("db-a".to_string(), true),
            ("db-b".to_string(), true),
            ("web".to_string(), true),
        ]
    );
}

#[test]
fn test_unknown_literal_trigger_is_reported() {
    let (_dir, paths) = setup(CONFIG);
    let summary = backup_runner::perform(&paths, &["mail,web"], false, true).unwrap();

    match &summary.reports[0].outcome {
        Outcome::Failed(RunError::TriggerNotFound(t)) => assert_eq!(t, "mail"),
        other => panic!("Expected TriggerNotFound, got: {other:?}"),
    }
    assert!(summary.reports[1].outcome.is_success());
}

#[test]
fn test_invalid_config_fails_each_trigger() {
    let (_dir, paths) = setup("backup_version: '0.1.0'\njobs:\n  - trigger: db\n");
    let summary = backup_runner::perform(&paths, &["db", "web"], false, true).unwrap();

    assert_eq!(summary.reports.len(), 2);
    for report in &summary.reports {
        assert!(matches!(
            report.outcome,
            Outcome::Failed(RunError::DefinitionInvalid { .. })
        ));
    }
}

#[test]
fn test_wildcard_without_catalog_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::under(dir.path());
    let result = backup_runner::perform(&paths, &["db-*"], false, true);
    assert!(matches!(result, Err(PerformError::Catalog(_))));
}

#[test]
fn test_wildcard_without_matches_runs_nothing() {
    let (_dir, paths) = setup(CONFIG);
    let summary = backup_runner::perform(&paths, &["none-*"], false, true).unwrap();
    assert!(summary.reports.is_empty());
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn test_unwritable_data_root_aborts_everything() {
    let (dir, mut paths) = setup(CONFIG);
    let blocker: PathBuf = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    paths.data = blocker.join("data");

    let result = backup_runner::perform(&paths, &["db-a"], false, true);
    assert!(matches!(result, Err(PerformError::Context(_))));
    assert!(!paths.data.exists());
}

#[test]
fn test_json_config() {
    let (_dir, mut paths) = setup("");
    paths.config_file = paths.root.join("config.json");
    std::fs::write(
        &paths.config_file,
        r#"{"backup_version": "0.1.0", "jobs": [{"trigger": "db", "steps": [{"cmd": "true"}]}]}"#,
    )
    .unwrap();

    let summary = backup_runner::perform(&paths, &["*"], false, true).unwrap();
    assert_eq!(summary.reports.len(), 1);
    assert!(summary.reports[0].outcome.is_success());
}

#[test]
fn test_absolute_trigger_creates_nothing_outside_data() {
    let (dir, paths) = setup(CONFIG);
    let outside = dir.path().join("elsewhere").join("abs");
    let request = format!("{},web", outside.display());

    let summary = backup_runner::perform(&paths, &[request], false, true).unwrap();
    assert!(matches!(
        summary.reports[0].outcome,
        Outcome::Failed(RunError::TriggerNotFound(_))
    ));
    assert!(summary.reports[1].outcome.is_success());
    assert!(!dir.path().join("elsewhere").exists());
}

#[test]
fn test_parent_trigger_creates_nothing_outside_data() {
    let (dir, paths) = setup(CONFIG);
    let summary = backup_runner::perform(&paths, &["../outside", ".."], false, true).unwrap();

    assert_eq!(summary.failed(), 2);
    assert!(!dir.path().join("outside").exists());
    let entries: Vec<_> = std::fs::read_dir(&paths.data).unwrap().collect();
    assert!(entries.is_empty());
}

#[test]
fn test_parent_trigger_in_config_is_rejected() {
    let (dir, paths) = setup(
        "backup_version: '0.1.0'\njobs:\n  - trigger: ../escape\n    steps:\n      - cmd: pwd > where.txt\n",
    );

    let summary = backup_runner::perform(&paths, &["../escape"], false, true).unwrap();
    assert!(matches!(
        summary.reports[0].outcome,
        Outcome::Failed(RunError::TriggerNotFound(_))
    ));

    let result = backup_runner::perform(&paths, &["*"], false, true);
    match result {
        Err(err @ PerformError::Catalog(_)) => {
            assert!(err.to_string().contains("../escape"), "{err}");
        }
        other => panic!("Expected Catalog, got: {other:?}"),
    }
    assert!(!dir.path().join("escape").exists());
}
