use std::io::Write;
use std::time::Instant;

use chrono::Local;
use log::{Log, Metadata, Record};
use parking_lot::Mutex;

struct BackupLogger {
    console: bool,
    file: Option<Mutex<std::fs::File>>,
    filter: log::LevelFilter,
    start: Instant,
}

impl BackupLogger {
    fn format(&self, record: &Record) -> String {
        let elapsed = self.start.elapsed().as_secs_f64();
        format!(
            "[{}] [{elapsed:.3}s] [{}] {}: {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for BackupLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        if self.console {
            eprintln!("{line}");
        }
        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{line}");
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Parse `RUST_LOG` as a single level, defaulting to `Info`
fn level_from_env() -> log::LevelFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// Initialize the global logger. Output goes to stderr unless `quiet`, and is
/// appended to `log_file` when one is given.
///
/// # Errors
///
/// Returns `log::SetLoggerError` if a logger was already installed.
pub fn init(quiet: bool, log_file: Option<std::fs::File>) -> Result<(), log::SetLoggerError> {
    let filter = level_from_env();
    let logger = BackupLogger {
        console: !quiet,
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

/// Open `path` for appending, creating it and its directory if needed
///
/// # Errors
///
/// Returns the underlying I/O error if the directory or file cannot be created.
pub fn open_log_file(path: &std::path::Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
