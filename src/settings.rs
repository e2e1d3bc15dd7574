//! Filesystem locations used by a backup run

use std::path::{Path, PathBuf};

use crate::trigger;

/// Name of the directory created under `$HOME` when no root is given
pub const ROOT_DIR_NAME: &str = "Backup";
pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const LOG_FILE_NAME: &str = "backup.log";

/// Resolved locations of the configuration file and the data/log/cache/tmp roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub data: PathBuf,
    pub log: PathBuf,
    pub cache: PathBuf,
    pub tmp: PathBuf,
}

impl Paths {
    /// Standard layout below a single root directory
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config_file: root.join(CONFIG_FILE_NAME),
            data: root.join("data"),
            log: root.join("log"),
            cache: root.join(".cache"),
            tmp: root.join(".tmp"),
        }
    }

    /// `$HOME/Backup`, or `./Backup` when the home directory is unknown
    #[must_use]
    pub fn default_root() -> PathBuf {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default()
            .join(ROOT_DIR_NAME)
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.log.join(LOG_FILE_NAME)
    }

    /// Per-trigger working directory, or `None` if `trigger` would not stay a direct
    /// child of the data root
    #[must_use]
    pub fn work_dir(&self, trigger: &str) -> Option<PathBuf> {
        trigger::is_valid_name(trigger).then(|| self.data.join(trigger))
    }
}

/// Path overrides supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub tmp: Option<PathBuf>,
}

impl Overrides {
    /// Merge the overrides over the default layout
    #[must_use]
    pub fn resolve(self) -> Paths {
        let base = Paths::under(&self.root.unwrap_or_else(Paths::default_root));
        Paths {
            config_file: self.config_file.unwrap_or(base.config_file),
            data: self.data.unwrap_or(base.data),
            log: self.log.unwrap_or(base.log),
            cache: self.cache.unwrap_or(base.cache),
            tmp: self.tmp.unwrap_or(base.tmp),
            root: base.root,
        }
    }
}
