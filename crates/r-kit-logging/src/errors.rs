//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

/// Result alias used by the logger internals.
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Failures raised inside the logger.
///
/// The public write path downgrades every variant to a `tracing` warning;
/// only configuration conversion surfaces them to callers.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Console or file I/O failed.
    #[error("I/O error on {target}: {source}")]
    Io {
        /// Console name or file path the operation touched.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A severity name did not match any recognised level.
    #[error("unknown log level '{0}'")]
    UnknownLevel(String),
}

impl LoggerError {
    pub(crate) fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        LoggerError::Io {
            target: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn console(source: std::io::Error) -> Self {
        LoggerError::Io {
            target: "console".to_owned(),
            source,
        }
    }
}
