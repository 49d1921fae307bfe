//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use r_kit_common::config::LoggerSettings;
use r_kit_common::time::log_timestamp;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::console::{Console, TerminalConsole};
use crate::errors::{LoggerError, Result};
use crate::level::LogColor;
use crate::logger::{create_empty, Logger, LoggerConfig};

const BANNER_RULE: &str = "**********************";

/// Transcript file sitting next to `log_file`: same directory, stem suffixed
/// with `_transcript`, same extension.
///
/// `/x/run.log` becomes `/x/run_transcript.log`.
pub fn derive_transcript_path(log_file: &Path) -> PathBuf {
    let stem = log_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match log_file.extension() {
        Some(ext) => format!("{stem}_transcript.{}", ext.to_string_lossy()),
        None => format!("{stem}_transcript"),
    };
    log_file.with_file_name(file_name)
}

/// An open transcript file.
struct TranscriptSession {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TranscriptSession {
    fn start(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| LoggerError::file(path, err))?;
        let mut session = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        session.banner("Transcript started", "Start time")?;
        Ok(session)
    }

    fn banner(&mut self, event: &str, clock_label: &str) -> Result<()> {
        let text = format!(
            "{BANNER_RULE}\n{event}, output file is {}\n{clock_label}: {}\n{BANNER_RULE}",
            self.path.display(),
            log_timestamp()
        );
        self.write_line(&text)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|err| LoggerError::file(&self.path, err))
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    fn finish(mut self) -> Result<()> {
        self.banner("Transcript ended", "End time")
    }
}

/// Console wrapper copying every line into the active transcript session.
struct TeeConsole {
    inner: Box<dyn Console>,
    session: Arc<Mutex<Option<TranscriptSession>>>,
}

impl Console for TeeConsole {
    fn write_line(&mut self, text: &str, color: LogColor) -> io::Result<()> {
        let console_result = self.inner.write_line(text, color);
        // The lock is released before warning: diagnostics may be mirrored
        // into this same session through a `TranscriptWriter`.
        let recorded = match self.session.lock().as_mut() {
            Some(session) => session.write_line(text),
            None => Ok(()),
        };
        if let Err(err) = recorded {
            warn!(error = %err, "failed to record transcript line");
        }
        console_result
    }
}

/// Writer feeding raw process output into the active transcript session.
///
/// Implements [`MakeWriter`], so a `tracing_subscriber::fmt` layer can mirror
/// diagnostics into the transcript. Output arriving while no session is open
/// is discarded.
#[derive(Clone)]
pub struct TranscriptWriter {
    session: Arc<Mutex<Option<TranscriptSession>>>,
}

impl std::fmt::Debug for TranscriptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptWriter")
            .field("recording", &self.session.lock().is_some())
            .finish()
    }
}

impl Write for TranscriptWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(session) = self.session.lock().as_mut() {
            session.write_raw(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.session.lock().as_mut() {
            Some(session) => session.writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for TranscriptWriter {
    type Writer = TranscriptWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// [`Logger`] that also records the whole session to a transcript file.
///
/// The transcript captures every line written through this logger's console,
/// filtered log lines and [`TranscriptLogger::record`] output alike, between a
/// start and an end banner. Diagnostics reach it through
/// [`TranscriptLogger::make_writer`].
pub struct TranscriptLogger {
    logger: Logger,
    transcript_path: Option<PathBuf>,
    session: Arc<Mutex<Option<TranscriptSession>>>,
}

impl std::fmt::Debug for TranscriptLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptLogger")
            .field("logger", &self.logger)
            .field("transcript_path", &self.transcript_path)
            .field("recording", &self.is_recording())
            .finish()
    }
}

impl TranscriptLogger {
    /// Create a transcript logger writing to the terminal.
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_console(config, TerminalConsole)
    }

    /// Create a transcript logger writing to a custom console.
    pub fn with_console(config: LoggerConfig, console: impl Console + 'static) -> Self {
        let transcript_path = config.log_file().map(derive_transcript_path);
        let may_use_files = config
            .log_file()
            .map(|path| path.exists() || config.auto_create)
            .unwrap_or(false);

        let session = Arc::new(Mutex::new(None));
        let tee = TeeConsole {
            inner: Box::new(console),
            session: Arc::clone(&session),
        };
        let logger = Logger::with_boxed_console(config, Box::new(tee));
        let transcript = Self {
            logger,
            transcript_path,
            session,
        };

        if may_use_files {
            if let Some(path) = &transcript.transcript_path {
                if let Err(err) = transcript.start(path) {
                    warn!(path = %path.display(), error = %err, "unable to start transcript");
                }
            }
        }
        transcript
    }

    fn start(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            create_empty(path)?;
        }
        let session = TranscriptSession::start(path)?;
        *self.session.lock() = Some(session);
        info!(path = %path.display(), "transcript started");
        Ok(())
    }

    /// Derived transcript path, present whenever a log file is configured.
    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }

    /// Whether a transcript session is currently open.
    pub fn is_recording(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Underlying base logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Writer that copies output into this logger's transcript session.
    ///
    /// Hand it to `r_kit_common::init_tracing_with_mirror` (or any
    /// `tracing_subscriber::fmt` layer) so diagnostics emitted elsewhere in
    /// the process land in the transcript too.
    pub fn make_writer(&self) -> TranscriptWriter {
        TranscriptWriter {
            session: Arc::clone(&self.session),
        }
    }

    /// Write arbitrary session output to the console, capturing it in the
    /// transcript. No level filter applies.
    pub fn record(&self, text: &str) {
        if let Err(err) = self.logger.write_console(text, LogColor::White) {
            warn!(error = %err, "failed to write session output to console");
        }
    }

    /// End the transcript session. Returns `true` if a session was open.
    pub fn stop_transcript(&self) -> bool {
        let Some(session) = self.session.lock().take() else {
            return false;
        };
        let path = session.path.clone();
        match session.finish() {
            Ok(()) => info!(path = %path.display(), "transcript stopped"),
            Err(err) => warn!(error = %err, "failed to close transcript"),
        }
        true
    }
}

/// Logger built from `[logger]` settings: the transcript variant when
/// `transcript = true`, the base logger otherwise.
#[derive(Debug)]
pub enum ConfiguredLogger {
    /// Base logger.
    Plain(Logger),
    /// Logger recording a session transcript.
    Transcript(TranscriptLogger),
}

impl ConfiguredLogger {
    /// Build from settings, writing to the terminal.
    pub fn from_settings(settings: &LoggerSettings) -> Result<Self> {
        Self::from_settings_with_console(settings, TerminalConsole)
    }

    /// Build from settings with a custom console.
    pub fn from_settings_with_console(
        settings: &LoggerSettings,
        console: impl Console + 'static,
    ) -> Result<Self> {
        let config = LoggerConfig::try_from(settings)?;
        Ok(if settings.transcript {
            ConfiguredLogger::Transcript(TranscriptLogger::with_console(config, console))
        } else {
            ConfiguredLogger::Plain(Logger::with_console(config, console))
        })
    }

    /// The transcript logger, when that variant was configured.
    pub fn transcript(&self) -> Option<&TranscriptLogger> {
        match self {
            ConfiguredLogger::Plain(_) => None,
            ConfiguredLogger::Transcript(logger) => Some(logger),
        }
    }
}

impl Deref for ConfiguredLogger {
    type Target = Logger;

    fn deref(&self) -> &Self::Target {
        match self {
            ConfiguredLogger::Plain(logger) => logger,
            ConfiguredLogger::Transcript(logger) => logger.logger(),
        }
    }
}

impl Deref for TranscriptLogger {
    type Target = Logger;

    fn deref(&self) -> &Self::Target {
        &self.logger
    }
}

impl Drop for TranscriptLogger {
    fn drop(&mut self) {
        self.stop_transcript();
    }
}
