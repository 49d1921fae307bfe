//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Operator-facing logging for scripted runs.
//!
//! [`Logger`] renders leveled, timestamped, colourised lines to a console and
//! appends them to an optional log file. [`TranscriptLogger`] composes a
//! [`Logger`] and additionally records the whole session to a transcript file
//! next to the log file. I/O problems never reach the caller: they are
//! reported as `tracing` warnings.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod console;
pub mod errors;
pub mod level;
pub mod logger;
pub mod record;
pub mod transcript;

pub use console::{BufferConsole, Console, TerminalConsole};
pub use errors::{LoggerError, Result};
pub use level::{Category, LogColor, Severity};
pub use logger::{Logger, LoggerConfig};
pub use record::LogRecord;
pub use transcript::{derive_transcript_path, ConfiguredLogger, TranscriptLogger, TranscriptWriter};

/// Initialize a baseline tracing subscriber suitable for development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic() {
        init();
        init();
    }
}
