//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the kit components."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TracingConfig;

const DEFAULT_FILTER: &str = "info";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available console formats for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    StructuredJson,
}

/// Initialize the tracing subscriber from the `[tracing]` configuration section.
///
/// * `filter` selects the directive (e.g. `info`, `debug,r_kit_provision=trace`).
///   When unset the standard `RUST_LOG` variable is honoured, finally defaulting
///   to `info`.
/// * When `directory` is set a daily rolling JSON file is written next to the
///   console output. The writer guards live for the rest of the process.
///
/// Installing a second subscriber is a no-op, so repeated calls are harmless.
pub fn init_tracing(service_name: &str, config: &TracingConfig) -> Result<()> {
    init_tracing_with_mirror(service_name, config, None)
}

/// [`init_tracing`] plus an optional plain-text copy of every event written to
/// `mirror`, e.g. a session transcript.
pub fn init_tracing_with_mirror(
    service_name: &str,
    config: &TracingConfig,
    mirror: Option<BoxMakeWriter>,
) -> Result<()> {
    let filter = build_filter(config.filter.as_deref());

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = STDOUT_GUARD.set(stdout_guard);

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = daily(directory, format!("{service_name}.log"));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    let has_mirror = mirror.is_some();
    let mirror_layer = mirror.map(|writer| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .boxed()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .with(mirror_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        diagnostics_dir = ?config.directory,
        mirrored = has_mirror,
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}

fn build_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid tracing filter ({err}); defaulting to {DEFAULT_FILTER}");
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_with_directory_creates_it() {
        let dir = tempdir().unwrap();
        let diagnostics = dir.path().join("diag");
        let config = TracingConfig {
            format: LogFormat::StructuredJson,
            filter: Some("debug".to_owned()),
            directory: Some(diagnostics.clone()),
        };
        init_tracing("kit-test", &config).unwrap();
        assert!(diagnostics.is_dir());
        // second initialisation must not fail
        init_tracing("kit-test", &TracingConfig::default()).unwrap();
    }
}
