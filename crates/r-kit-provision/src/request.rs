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
use std::time::Duration;

use anyhow::anyhow;
use r_kit_common::config::{PackagePin, ProvisionSettings};

use crate::source::InstallScope;

/// Options shared by every name passed to one provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Exact version to require.
    pub version: Option<String>,
    /// Load from this path instead of installing.
    pub local_path: Option<PathBuf>,
    /// Reinstall / reload even if already present.
    pub force: bool,
    /// Retries after the first attempt.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Install scope.
    pub scope: InstallScope,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            version: None,
            local_path: None,
            force: false,
            retries: 3,
            retry_delay: Duration::from_secs(5),
            scope: InstallScope::CurrentUser,
        }
    }
}

impl ProvisionOptions {
    /// Require an exact version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Load from a local path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Force reinstall and reload.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Retry budget and delay.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Install scope.
    pub fn with_scope(mut self, scope: InstallScope) -> Self {
        self.scope = scope;
        self
    }

    /// Build the request for a single package name.
    pub fn request_for(&self, name: impl Into<String>) -> PackageRequest {
        PackageRequest {
            name: name.into(),
            exact_version: self.version.clone(),
            local_path: self.local_path.clone(),
            force: self.force,
            max_retries: self.retries,
            retry_delay: self.retry_delay,
            scope: self.scope,
        }
    }

    /// Build the request for a package declared in configuration. The pin
    /// replaces the shared version and path; its `force` overrides when set.
    pub fn request_for_pin(&self, name: impl Into<String>, pin: &PackagePin) -> PackageRequest {
        PackageRequest {
            name: name.into(),
            exact_version: pin.version.clone(),
            local_path: pin.path.clone(),
            force: pin.force.unwrap_or(self.force),
            max_retries: self.retries,
            retry_delay: self.retry_delay,
            scope: self.scope,
        }
    }
}

impl TryFrom<&ProvisionSettings> for ProvisionOptions {
    type Error = anyhow::Error;

    fn try_from(settings: &ProvisionSettings) -> anyhow::Result<Self> {
        let scope = settings
            .scope
            .parse()
            .map_err(|err: String| anyhow!("invalid provision settings: {}", err))?;
        Ok(Self {
            version: None,
            local_path: None,
            force: settings.force,
            retries: settings.retries,
            retry_delay: settings.retry_delay,
            scope,
        })
    }
}

/// Everything needed to provision one package. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Package name.
    pub name: String,
    /// Exact version to require.
    pub exact_version: Option<String>,
    /// Load from this path instead of installing.
    pub local_path: Option<PathBuf>,
    /// Reinstall / reload even if already present.
    pub force: bool,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Install scope.
    pub scope: InstallScope,
}

impl PackageRequest {
    /// First attempt plus retries.
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_inherits_options() {
        let options = ProvisionOptions::default()
            .with_version("1.2.0")
            .with_force(true)
            .with_retries(4, Duration::from_secs(65))
            .with_scope(InstallScope::AllUsers);
        let request = options.request_for("alpha");
        assert_eq!(request.name, "alpha");
        assert_eq!(request.exact_version.as_deref(), Some("1.2.0"));
        assert!(request.force);
        assert_eq!(request.total_attempts(), 5);
        assert_eq!(request.scope, InstallScope::AllUsers);
    }

    #[test]
    fn pin_overrides_version_path_and_force() {
        let options = ProvisionOptions::default().with_version("9.9.9");
        let pin = PackagePin {
            version: None,
            path: Some(PathBuf::from("vendor/beta")),
            force: Some(true),
        };
        let request = options.request_for_pin("beta", &pin);
        assert!(request.exact_version.is_none());
        assert_eq!(request.local_path, Some(PathBuf::from("vendor/beta")));
        assert!(request.force);
    }

    #[test]
    fn settings_convert() {
        let settings = ProvisionSettings {
            retries: 0,
            scope: "all-users".to_owned(),
            ..ProvisionSettings::default()
        };
        let options = ProvisionOptions::try_from(&settings).unwrap();
        assert_eq!(options.retries, 0);
        assert_eq!(options.retry_delay, Duration::from_secs(5));
        assert_eq!(options.scope, InstallScope::AllUsers);
        assert_eq!(options.request_for("x").total_attempts(), 1);
        assert_eq!(
            ProvisionOptions::default()
                .with_retries(u32::MAX, Duration::ZERO)
                .request_for("x")
                .total_attempts(),
            u64::from(u32::MAX) + 1
        );
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let settings = ProvisionSettings {
            scope: "everyone".to_owned(),
            ..ProvisionSettings::default()
        };
        let err = ProvisionOptions::try_from(&settings).unwrap_err();
        assert!(err.to_string().contains("everyone"));
    }
}
