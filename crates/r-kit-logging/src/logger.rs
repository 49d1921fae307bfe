//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use r_kit_common::config::LoggerSettings;
use tracing::{debug, warn};

use crate::console::{Console, TerminalConsole};
use crate::errors::{LoggerError, Result};
use crate::level::{Category, LogColor, Severity};
use crate::record::LogRecord;

/// Configuration owned by a single logger instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggerConfig {
    /// Least severe category still emitted.
    pub min_level: Severity,
    /// Optional file receiving every emitted line.
    pub log_file: Option<PathBuf>,
    /// Create `log_file` (and its parent directories) at construction.
    pub auto_create: bool,
}

impl LoggerConfig {
    /// Build a configuration with the given floor and no file.
    pub fn new(min_level: Severity) -> Self {
        Self {
            min_level,
            log_file: None,
            auto_create: false,
        }
    }

    /// Attach a log file.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>, auto_create: bool) -> Self {
        self.log_file = Some(path.into());
        self.auto_create = auto_create;
        self
    }

    /// Configured log file, ignoring empty paths.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl TryFrom<&LoggerSettings> for LoggerConfig {
    type Error = LoggerError;

    fn try_from(settings: &LoggerSettings) -> Result<Self> {
        Ok(Self {
            min_level: settings.min_level.parse()?,
            log_file: settings.file.clone(),
            auto_create: settings.auto_create,
        })
    }
}

/// Leveled console logger with an optional append-only log file.
///
/// Every failure while writing is reported through `tracing::warn!` and
/// swallowed; logging never interrupts the caller.
pub struct Logger {
    config: LoggerConfig,
    console: Mutex<Box<dyn Console>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Create a logger writing to the terminal.
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_console(config, TerminalConsole)
    }

    /// Create a logger writing to a custom console.
    pub fn with_console(config: LoggerConfig, console: impl Console + 'static) -> Self {
        Self::with_boxed_console(config, Box::new(console))
    }

    pub(crate) fn with_boxed_console(config: LoggerConfig, console: Box<dyn Console>) -> Self {
        if config.auto_create {
            if let Some(path) = config.log_file() {
                if !path.exists() {
                    if let Err(err) = create_empty(path) {
                        warn!(path = %path.display(), error = %err, "unable to create log file");
                    }
                }
            }
        }
        Self {
            config,
            console: Mutex::new(console),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Emit a message. Returns `true` when the message passed the level filter.
    ///
    /// Only `category` is compared against the configured floor; `level` is
    /// a descriptive tag that is rendered but never filtered on.
    pub fn write_log(
        &self,
        message: &str,
        category: Category,
        level: Severity,
        color: Option<LogColor>,
    ) -> bool {
        if !category.passes(self.config.min_level) {
            debug!(
                category = %category,
                min_level = %self.config.min_level,
                "log message suppressed by level filter"
            );
            return false;
        }
        let record = LogRecord::new(message, category, level, color);
        self.emit(&record);
        true
    }

    /// Shorthand for an `Info` message.
    pub fn info(&self, message: &str) -> bool {
        self.write_log(message, Category::Info, Severity::Info, None)
    }

    /// Shorthand for an `Error` message.
    pub fn error(&self, message: &str) -> bool {
        self.write_log(message, Category::Error, Severity::Error, None)
    }

    /// Shorthand for a `Warning` message.
    pub fn warning(&self, message: &str) -> bool {
        self.write_log(message, Category::Warning, Severity::Warning, None)
    }

    /// Shorthand for a `Success` message.
    pub fn success(&self, message: &str) -> bool {
        self.write_log(message, Category::Success, Severity::Info, None)
    }

    /// Shorthand for a `Processing` message.
    pub fn processing(&self, message: &str) -> bool {
        self.write_log(message, Category::Processing, Severity::Info, None)
    }

    fn emit(&self, record: &LogRecord) {
        let line = record.render();
        if let Err(err) = self.write_console(&line, record.color) {
            warn!(error = %err, "failed to write log line to console");
        }
        if let Some(path) = self.config.log_file() {
            if path.exists() {
                if let Err(err) = append_line(path, &line) {
                    warn!(error = %err, "failed to append log line");
                }
            }
        }
    }

    pub(crate) fn write_console(&self, line: &str, color: LogColor) -> Result<()> {
        self.console
            .lock()
            .write_line(line, color)
            .map_err(LoggerError::console)
    }
}

pub(crate) fn create_empty(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| LoggerError::file(parent, err))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| LoggerError::file(path, err))?;
    Ok(())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|err| LoggerError::file(path, err))?;
    writeln!(file, "{line}").map_err(|err| LoggerError::file(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use std::io;
    use tempfile::tempdir;

    struct BrokenConsole;

    impl Console for BrokenConsole {
        fn write_line(&mut self, _text: &str, _color: LogColor) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn file_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn auto_create_makes_empty_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        let _logger = Logger::with_console(
            LoggerConfig::new(Severity::Info).with_log_file(&path, true),
            BufferConsole::new(),
        );
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn without_auto_create_file_is_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let console = BufferConsole::new();
        let logger = Logger::with_console(
            LoggerConfig::new(Severity::Info).with_log_file(&path, false),
            console.clone(),
        );
        assert!(logger.info("console only"));
        assert!(!path.exists());
        assert_eq!(console.lines().len(), 1);
    }

    #[test]
    fn warning_floor_suppresses_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let console = BufferConsole::new();
        let logger = Logger::with_console(
            LoggerConfig::new(Severity::Warning).with_log_file(&path, true),
            console.clone(),
        );

        assert!(!logger.write_log("quiet", Category::Info, Severity::Info, None));
        assert!(console.lines().is_empty());
        assert!(file_lines(&path).is_empty());

        assert!(logger.write_log("loud", Category::Error, Severity::Info, None));
        assert_eq!(console.lines().len(), 1);
        let lines = file_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("[Info] [Error] - loud"));
    }

    #[test]
    fn level_tag_does_not_filter() {
        let console = BufferConsole::new();
        let logger = Logger::with_console(LoggerConfig::new(Severity::Error), console.clone());
        assert!(logger.write_log("tagged debug", Category::Error, Severity::Debug, None));
        assert!(!logger.write_log("tagged critical", Category::Info, Severity::Critical, None));
        assert_eq!(console.lines().len(), 1);
    }

    #[test]
    fn identical_messages_are_not_deduplicated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = Logger::with_console(
            LoggerConfig::new(Severity::Debug).with_log_file(&path, true),
            BufferConsole::new(),
        );
        logger.success("deployed");
        logger.success("deployed");
        let lines = file_lines(&path);
        assert_eq!(lines.len(), 2);
        let strip = |line: &str| line.split_once("] ").map(|(_, rest)| rest.to_owned());
        assert_eq!(strip(&lines[0]), strip(&lines[1]));
        assert_eq!(strip(&lines[0]).unwrap(), "[Info] [Success] - deployed");
    }

    #[test]
    fn console_receives_resolved_colour() {
        let console = BufferConsole::new();
        let logger = Logger::with_console(LoggerConfig::new(Severity::Debug), console.clone());
        logger.processing("working");
        logger.write_log("custom", Category::Info, Severity::Info, Some(LogColor::Cyan));
        let entries = console.entries();
        assert_eq!(entries[0].1, LogColor::Yellow);
        assert_eq!(entries[1].1, LogColor::Cyan);
    }

    #[test]
    fn console_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = Logger::with_console(
            LoggerConfig::new(Severity::Info).with_log_file(&path, true),
            BrokenConsole,
        );
        assert!(logger.error("still recorded"));
        assert_eq!(file_lines(&path).len(), 1);
    }

    #[test]
    fn settings_convert_to_config() {
        let settings = LoggerSettings {
            min_level: "Warning".to_owned(),
            file: Some(PathBuf::from("logs/run.log")),
            auto_create: false,
            transcript: false,
        };
        let config = LoggerConfig::try_from(&settings).unwrap();
        assert_eq!(config.min_level, Severity::Warning);
        assert_eq!(config.log_file(), Some(Path::new("logs/run.log")));

        let bad = LoggerSettings {
            min_level: "loud".to_owned(),
            ..LoggerSettings::default()
        };
        assert!(LoggerConfig::try_from(&bad).is_err());
    }
}
