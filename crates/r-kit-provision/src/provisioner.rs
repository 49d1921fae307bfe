//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;

use indexmap::IndexMap;
use r_kit_common::config::PackagePin;
use tracing::{error, info, warn};

use crate::errors::{ProvisionError, Result};
use crate::request::{PackageRequest, ProvisionOptions};
use crate::retry::RetryPolicy;
use crate::source::{select_installed, LoadTarget, PackageSource};

/// How a successful attempt got the package loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStep {
    /// A matching version was already installed and was loaded.
    AlreadyInstalled {
        /// Installed version that matched.
        version: String,
    },
    /// The package was installed from the default source, then loaded.
    Installed {
        /// Version requested from the source, `None` for latest.
        version: Option<String>,
    },
    /// The package was loaded from an explicit path.
    LoadedFromPath {
        /// Path that was loaded.
        path: PathBuf,
    },
}

/// Final result for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Loaded after `attempts` attempts.
    Succeeded {
        /// Attempts used, including the successful one.
        attempts: u64,
        /// How the package was obtained.
        step: ProvisionStep,
    },
    /// Every attempt failed.
    FailedAfterRetries {
        /// Attempts made.
        attempts: u64,
        /// Error of the final attempt.
        last_error: String,
    },
    /// The explicit local path does not exist; no further attempts were made.
    PathNotFound {
        /// Path that was checked.
        path: PathBuf,
    },
}

impl ProvisionOutcome {
    /// Whether the package ended up loaded.
    pub fn is_success(&self) -> bool {
        matches!(self, ProvisionOutcome::Succeeded { .. })
    }
}

/// Outcome paired with its package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    /// Package name as requested.
    pub name: String,
    /// Final result.
    pub outcome: ProvisionOutcome,
}

/// Aggregate result of one provisioning call, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// One entry per requested name.
    pub outcomes: Vec<PackageOutcome>,
}

impl ProvisionReport {
    /// Whether every package was loaded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_success())
    }

    /// Packages that were loaded.
    pub fn succeeded(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_success())
    }

    /// Packages that were not loaded.
    pub fn failures(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    /// Outcome for `name`, if it was requested.
    pub fn get(&self, name: &str) -> Option<&ProvisionOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.outcome)
    }
}

/// Drives a [`PackageSource`] until each requested package is loaded or its
/// retry budget is spent.
///
/// Names are processed one after another; a failure for one never stops the
/// rest. Retries block the calling thread for the configured delay.
#[derive(Debug)]
pub struct Provisioner<S> {
    source: S,
}

impl<S: PackageSource> Provisioner<S> {
    /// Create a provisioner over `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Access the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consume the provisioner, returning the source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Provision every name in `names` with the same options.
    pub fn provision<I, N>(&self, names: I, options: &ProvisionOptions) -> ProvisionReport
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let requests = names.into_iter().map(|name| options.request_for(name));
        self.run(requests)
    }

    /// Provision packages declared in configuration, each with its own pin.
    pub fn provision_manifest(
        &self,
        packages: &IndexMap<String, PackagePin>,
        defaults: &ProvisionOptions,
    ) -> ProvisionReport {
        let requests = packages
            .iter()
            .map(|(name, pin)| defaults.request_for_pin(name.clone(), pin));
        self.run(requests)
    }

    fn run(&self, requests: impl Iterator<Item = PackageRequest>) -> ProvisionReport {
        let outcomes = requests
            .map(|request| PackageOutcome {
                outcome: self.provision_one(&request),
                name: request.name,
            })
            .collect();
        ProvisionReport { outcomes }
    }

    /// Provision a single package, retrying up to `max_retries` times.
    pub fn provision_one(&self, request: &PackageRequest) -> ProvisionOutcome {
        let policy = RetryPolicy::from(request);
        let total = policy.total_attempts();
        let mut last_error = String::new();

        for attempt in 1..=total {
            match self.guarded_attempt(request) {
                Ok(step) => {
                    return ProvisionOutcome::Succeeded {
                        attempts: attempt,
                        step,
                    }
                }
                Err(ProvisionError::PathNotFound { package, path }) => {
                    error!(
                        package = %package,
                        path = %path.display(),
                        "local path does not exist; giving up on package"
                    );
                    return ProvisionOutcome::PathNotFound { path };
                }
                Err(err) => {
                    error!(
                        package = %request.name,
                        attempt,
                        total_attempts = total,
                        error = %err,
                        "provisioning attempt failed"
                    );
                    last_error = err.to_string();
                    if policy.has_next(attempt) {
                        warn!(package = %request.name, "{}", policy.message(attempt));
                        thread::sleep(policy.delay);
                    }
                }
            }
        }

        error!(
            package = %request.name,
            attempts = total,
            "package could not be provisioned"
        );
        ProvisionOutcome::FailedAfterRetries {
            attempts: total,
            last_error,
        }
    }

    fn guarded_attempt(&self, request: &PackageRequest) -> Result<ProvisionStep> {
        panic::catch_unwind(AssertUnwindSafe(|| self.attempt(request))).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(ProvisionError::Panicked {
                package: request.name.clone(),
                message,
            })
        })
    }

    fn attempt(&self, request: &PackageRequest) -> Result<ProvisionStep> {
        let name = request.name.as_str();
        let version = request.exact_version.as_deref();

        let installed = self
            .source
            .find_installed(name)
            .map_err(|source| ProvisionError::LookupFailure {
                package: name.to_owned(),
                source,
            })?;

        if let Some(found) = select_installed(&installed, version) {
            info!(package = name, version = %found.version, "package already installed");
            self.source
                .load(LoadTarget::Name(name), version, request.force)
                .map_err(|source| ProvisionError::LoadFailure {
                    package: name.to_owned(),
                    source,
                })?;
            info!(package = name, version = %found.version, "package imported");
            return Ok(ProvisionStep::AlreadyInstalled {
                version: found.version,
            });
        }

        if let Some(path) = &request.local_path {
            if !path.exists() {
                return Err(ProvisionError::PathNotFound {
                    package: name.to_owned(),
                    path: path.clone(),
                });
            }
            self.source
                .load(LoadTarget::Path(path), None, request.force)
                .map_err(|source| ProvisionError::LoadFailure {
                    package: name.to_owned(),
                    source,
                })?;
            info!(package = name, path = %path.display(), "package imported from local path");
            return Ok(ProvisionStep::LoadedFromPath { path: path.clone() });
        }

        self.source
            .install(name, version, request.force, request.scope)
            .map_err(|source| ProvisionError::InstallFailure {
                package: name.to_owned(),
                source,
            })?;
        info!(
            package = name,
            version = version.unwrap_or("latest"),
            scope = %request.scope,
            "package installed"
        );
        self.source
            .load(LoadTarget::Name(name), version, request.force)
            .map_err(|source| ProvisionError::LoadFailure {
                package: name.to_owned(),
                source,
            })?;
        info!(package = name, "package imported");
        Ok(ProvisionStep::Installed {
            version: version.map(str::to_owned),
        })
    }
}
