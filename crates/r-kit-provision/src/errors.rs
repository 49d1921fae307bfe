//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for a single provisioning attempt.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Failures of one provisioning attempt.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Querying installed versions failed.
    #[error("failed to look up installed versions of {package}: {source:#}")]
    LookupFailure {
        /// Package being provisioned.
        package: String,
        /// Error reported by the package source.
        #[source]
        source: anyhow::Error,
    },
    /// Installing from the default source failed.
    #[error("failed to install {package}: {source:#}")]
    InstallFailure {
        /// Package being provisioned.
        package: String,
        /// Error reported by the package source.
        #[source]
        source: anyhow::Error,
    },
    /// Loading an installed package or a local path failed.
    #[error("failed to load {package}: {source:#}")]
    LoadFailure {
        /// Package being provisioned.
        package: String,
        /// Error reported by the package source.
        #[source]
        source: anyhow::Error,
    },
    /// An explicit local path does not exist. Never retried.
    #[error("local path {path} for {package} does not exist")]
    PathNotFound {
        /// Package being provisioned.
        package: String,
        /// Path that was checked.
        path: PathBuf,
    },
    /// The package source panicked during an attempt.
    #[error("package source panicked while provisioning {package}: {message}")]
    Panicked {
        /// Package being provisioned.
        package: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ProvisionError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProvisionError::PathNotFound { .. })
    }
}
