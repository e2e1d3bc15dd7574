//! External tools that jobs and the `decrypt` command shell out to

use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("unknown dependency '{0}'")]
    Unknown(String),
    #[error("'{name}' is required but was not found on PATH. {guidance}")]
    Missing {
        name: &'static str,
        guidance: &'static str,
    },
}

#[derive(Debug)]
pub struct Dependency {
    pub name: &'static str,
    pub required_for: &'static str,
    pub guidance: &'static str,
}

pub const CATALOG: &[Dependency] = &[
    Dependency {
        name: "tar",
        required_for: "packaging archives",
        guidance: "Install GNU tar or bsdtar with your package manager.",
    },
    Dependency {
        name: "gzip",
        required_for: "the gzip compressor",
        guidance: "Install gzip with your package manager.",
    },
    Dependency {
        name: "bzip2",
        required_for: "the bzip2 compressor",
        guidance: "Install bzip2 with your package manager.",
    },
    Dependency {
        name: "openssl",
        required_for: "the openssl encryptor and decrypt",
        guidance: "Install OpenSSL (package 'openssl').",
    },
    Dependency {
        name: "gpg",
        required_for: "the gpg encryptor and decrypt",
        guidance: "Install GnuPG (package 'gnupg').",
    },
    Dependency {
        name: "mysqldump",
        required_for: "the mysql database template",
        guidance: "Install the MySQL or MariaDB client tools.",
    },
    Dependency {
        name: "pg_dumpall",
        required_for: "the postgresql database template",
        guidance: "Install the PostgreSQL client tools.",
    },
    Dependency {
        name: "mongodump",
        required_for: "the mongodb database template",
        guidance: "Install the MongoDB database tools.",
    },
    Dependency {
        name: "redis-cli",
        required_for: "the redis database template",
        guidance: "Install the Redis command line client.",
    },
    Dependency {
        name: "rsync",
        required_for: "the rsync storage template",
        guidance: "Install rsync with your package manager.",
    },
    Dependency {
        name: "scp",
        required_for: "the scp storage template",
        guidance: "Install an OpenSSH client.",
    },
    Dependency {
        name: "mail",
        required_for: "the mail notifier template",
        guidance: "Install a mailx implementation (e.g. 's-nail' or 'mailutils').",
    },
];

#[must_use]
pub fn get(name: &str) -> Option<&'static Dependency> {
    CATALOG.iter().find(|dep| dep.name == name)
}

/// Find an executable named `binary` in `dirs`
pub fn find_in<I>(binary: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    dirs.into_iter()
        .map(|dir| dir.as_ref().join(binary))
        .find(|candidate| is_executable(candidate))
}

/// Find an executable named `binary` on `PATH`
#[must_use]
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    find_in(binary, std::env::split_paths(&path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolve a catalogued dependency to its executable.
///
/// # Errors
///
/// Returns `DependencyError::Unknown` for names outside the catalog, or
/// `DependencyError::Missing` with installation guidance when it is not on `PATH`.
pub fn load(name: &str) -> Result<PathBuf, DependencyError> {
    let dep = get(name).ok_or_else(|| DependencyError::Unknown(name.to_string()))?;
    let path = find_in_path(dep.name).ok_or(DependencyError::Missing {
        name: dep.name,
        guidance: dep.guidance,
    })?;
    debug!("Using {} at {}", dep.name, path.display());
    Ok(path)
}
