//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the kit components."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the R-Kit workspace.
//! This crate exposes configuration loading, tracing bootstrap, and the
//! time formatting helpers consumed by the provisioner and the logger.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    KitConfig, LoadedKitConfig, LoggerSettings, PackagePin, ProvisionSettings, TracingConfig,
};
pub use logging::{init_tracing, init_tracing_with_mirror, LogFormat};
pub use time::{format_delay, log_timestamp};
