//! Generation of a starter configuration file from named template fragments

use std::fmt;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::config_file::{Config, ConfigJob, ConfigStep};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("unknown {kind} template '{name}' (available: {available})")]
    UnknownTemplate {
        kind: Kind,
        name: String,
        available: String,
    },
    #[error("unable to render configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to write configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Database,
    Compressor,
    Encryptor,
    Storage,
    Notifier,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Database => "database",
            Kind::Compressor => "compressor",
            Kind::Encryptor => "encryptor",
            Kind::Storage => "storage",
            Kind::Notifier => "notifier",
        })
    }
}

/// A named step fragment a generated job can be assembled from
#[derive(Debug)]
pub struct Template {
    pub kind: Kind,
    pub name: &'static str,
    pub cmd: &'static str,
}

/// Archive produced by the packaging step; compressors and encryptors add suffixes to it
const PACKAGE: &str = "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME.$BACKUP_ARCHIVE_FORMAT";

const PACKAGE_CMD: &str = r#"tar -cf "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME.$BACKUP_ARCHIVE_FORMAT" -C "$BACKUP_WORK_DIR" ."#;

pub const TEMPLATES: &[Template] = &[
    Template {
        kind: Kind::Database,
        name: "mysql",
        cmd: r#"mysqldump --all-databases > "$BACKUP_WORK_DIR/mysql.sql""#,
    },
    Template {
        kind: Kind::Database,
        name: "postgresql",
        cmd: r#"pg_dumpall > "$BACKUP_WORK_DIR/postgresql.sql""#,
    },
    Template {
        kind: Kind::Database,
        name: "mongodb",
        cmd: r#"mongodump --out "$BACKUP_WORK_DIR/mongodb""#,
    },
    Template {
        kind: Kind::Database,
        name: "redis",
        cmd: r#"redis-cli --rdb "$BACKUP_WORK_DIR/redis.rdb""#,
    },
    Template {
        kind: Kind::Compressor,
        name: "gzip",
        cmd: r#"gzip -f "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".*"#,
    },
    Template {
        kind: Kind::Compressor,
        name: "bzip2",
        cmd: r#"bzip2 -f "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".*"#,
    },
    Template {
        kind: Kind::Encryptor,
        name: "openssl",
        cmd: r#"for f in "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".*; do openssl aes-256-cbc -salt -pbkdf2 -pass env:BACKUP_PASSPHRASE -in "$f" -out "$f.enc" && rm "$f"; done"#,
    },
    Template {
        kind: Kind::Encryptor,
        name: "gpg",
        cmd: r#"for f in "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".*; do gpg --batch --yes --symmetric --passphrase-env BACKUP_PASSPHRASE -o "$f.gpg" "$f" && rm "$f"; done"#,
    },
    Template {
        kind: Kind::Storage,
        name: "local",
        cmd: r#"mkdir -p "$HOME/backups/$BACKUP_TRIGGER" && mv "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".* "$HOME/backups/$BACKUP_TRIGGER/""#,
    },
    Template {
        kind: Kind::Storage,
        name: "rsync",
        cmd: r#"rsync -a --remove-source-files "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".* backup@example.com:backups/"#,
    },
    Template {
        kind: Kind::Storage,
        name: "scp",
        cmd: r#"scp "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".* backup@example.com:backups/ && rm "$BACKUP_TMP_PATH/$BACKUP_TRIGGER.$BACKUP_TIME".*"#,
    },
    Template {
        kind: Kind::Notifier,
        name: "mail",
        cmd: r#"echo "Backup $BACKUP_TRIGGER finished at $BACKUP_TIME" | mail -s "Backup $BACKUP_TRIGGER" root"#,
    },
];

/// Fragments requested for each kind, in the order they should run
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub trigger: Option<String>,
    pub databases: Vec<String>,
    pub compressors: Vec<String>,
    pub encryptors: Vec<String>,
    pub storages: Vec<String>,
    pub notifiers: Vec<String>,
}

pub const DEFAULT_TRIGGER: &str = "my_backup";

fn find(kind: Kind, name: &str) -> Result<&'static Template, GenerateError> {
    TEMPLATES
        .iter()
        .find(|t| t.kind == kind && t.name == name)
        .ok_or_else(|| GenerateError::UnknownTemplate {
            kind,
            name: name.to_string(),
            available: names(kind).join(", "),
        })
}

/// Names of every template of `kind`
#[must_use]
pub fn names(kind: Kind) -> Vec<&'static str> {
    TEMPLATES
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.name)
        .collect()
}

fn step(name: &str, cmd: &str) -> ConfigStep {
    ConfigStep {
        name: Some(name.to_string()),
        cmd: cmd.to_string(),
    }
}

/// Assemble a single-job configuration from the selected fragments.
///
/// # Errors
///
/// Returns `GenerateError::UnknownTemplate` if a name does not match any fragment.
pub fn build(selection: &Selection) -> Result<Config, GenerateError> {
    let mut steps = Vec::new();
    for name in &selection.databases {
        steps.push(step(name, find(Kind::Database, name)?.cmd));
    }
    steps.push(step("package", PACKAGE_CMD));
    for (kind, requested) in [
        (Kind::Compressor, &selection.compressors),
        (Kind::Encryptor, &selection.encryptors),
        (Kind::Storage, &selection.storages),
        (Kind::Notifier, &selection.notifiers),
    ] {
        for name in requested {
            steps.push(step(name, find(kind, name)?.cmd));
        }
    }

    let trigger = selection
        .trigger
        .clone()
        .unwrap_or_else(|| DEFAULT_TRIGGER.to_string());
    Ok(Config {
        backup_version: env!("CARGO_PKG_VERSION").to_string(),
        jobs: vec![ConfigJob {
            label: Some(format!("Backup job '{trigger}'")),
            trigger,
            archive_format: None,
            env: None,
            steps: Some(steps),
        }],
    })
}

/// Render the selected fragments as YAML.
///
/// # Errors
///
/// Returns `GenerateError` if a fragment is unknown or serialization fails.
pub fn render(selection: &Selection) -> Result<String, GenerateError> {
    let config = build(selection)?;
    let body = serde_yaml::to_string(&config)?;
    Ok(format!(
        "# Generated by backup-runner {}\n# The packaged archive is {PACKAGE}\n{body}",
        env!("CARGO_PKG_VERSION")
    ))
}

/// Human readable list of every template, grouped by kind
#[must_use]
pub fn describe_templates() -> String {
    [
        Kind::Database,
        Kind::Compressor,
        Kind::Encryptor,
        Kind::Storage,
        Kind::Notifier,
    ]
    .iter()
    .map(|kind| format!("{kind}s: {}", names(*kind).join(", ")))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Write `contents` to `path`. An existing file is only replaced when `force` is set
/// or `confirm` agrees; returns whether the file was written.
///
/// # Errors
///
/// Returns `GenerateError::Io` if the directory or file cannot be written.
pub fn write(
    path: &Path,
    contents: &str,
    force: bool,
    confirm: impl FnOnce(&Path) -> bool,
) -> Result<bool, GenerateError> {
    if path.exists() && !force && !confirm(path) {
        info!("Leaving existing config {} untouched", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!("Wrote config {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection {
            databases: vec!["postgresql".to_string(), "redis".to_string()],
            compressors: vec!["gzip".to_string()],
            storages: vec!["local".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_steps_follow_pipeline_order() {
        let config = build(&selection()).unwrap();
        let names: Vec<_> = config.jobs[0]
            .steps
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["postgresql", "redis", "package", "gzip", "local"]);
        assert_eq!(config.jobs[0].trigger, DEFAULT_TRIGGER);
    }

    #[test]
    fn test_rendered_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        write(&path, &render(&selection()).unwrap(), false, |_| false).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.triggers(), vec![DEFAULT_TRIGGER]);
        assert_eq!(config.jobs[0].steps.as_ref().unwrap()[2].cmd, PACKAGE_CMD);
    }

    #[test]
    fn test_unknown_template() {
        let result = build(&Selection {
            storages: vec!["tape".to_string()],
            ..Default::default()
        });
        match result {
            Err(GenerateError::UnknownTemplate {
                kind,
                name,
                available,
            }) => {
                assert_eq!(kind, Kind::Storage);
                assert_eq!(name, "tape");
                assert_eq!(available, "local, rsync, scp");
            }
            other => panic!("Expected UnknownTemplate, got: {other:?}"),
        }
    }

    #[test]
    fn test_existing_file_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "keep me").unwrap();

        assert!(!write(&path, "new", false, |_| false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
        assert!(write(&path, "new", false, |_| true).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_describe_templates() {
        insta::assert_snapshot!(describe_templates(), @r"
        databases: mysql, postgresql, mongodb, redis
        compressors: gzip, bzip2
        encryptors: openssl, gpg
        storages: local, rsync, scp
        notifiers: mail
        ");
    }
}
