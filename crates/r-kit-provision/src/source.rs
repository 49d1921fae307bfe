//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::version;

/// Where an install lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InstallScope {
    /// Only visible to the invoking user.
    #[default]
    CurrentUser,
    /// Visible machine-wide.
    AllUsers,
}

impl InstallScope {
    /// Configuration spelling of the scope.
    pub fn as_str(self) -> &'static str {
        match self {
            InstallScope::CurrentUser => "current-user",
            InstallScope::AllUsers => "all-users",
        }
    }
}

impl fmt::Display for InstallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current-user" | "currentuser" => Ok(InstallScope::CurrentUser),
            "all-users" | "allusers" => Ok(InstallScope::AllUsers),
            other => Err(format!("unknown install scope: {}", other)),
        }
    }
}

/// One installed copy of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// Package name.
    pub name: String,
    /// Installed version string.
    pub version: String,
}

impl InstalledPackage {
    /// Construct a new record.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// What to load: an installed package by name, or a package on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget<'a> {
    /// Installed package name.
    Name(&'a str),
    /// Explicit filesystem location.
    Path(&'a Path),
}

impl fmt::Display for LoadTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadTarget::Name(name) => f.write_str(name),
            LoadTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The package manager the provisioner drives.
///
/// Implementations perform no retries of their own; every retry decision is
/// taken by the [`crate::Provisioner`].
pub trait PackageSource {
    /// All installed versions of `name`, in any order. Empty when absent.
    fn find_installed(&self, name: &str) -> Result<Vec<InstalledPackage>>;

    /// Install `name` from the default source, at `version` or the latest.
    fn install(
        &self,
        name: &str,
        version: Option<&str>,
        force: bool,
        scope: InstallScope,
    ) -> Result<()>;

    /// Load a package into the running process.
    fn load(&self, target: LoadTarget<'_>, version: Option<&str>, force: bool) -> Result<()>;
}

impl<S: PackageSource + ?Sized> PackageSource for &S {
    fn find_installed(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        (**self).find_installed(name)
    }

    fn install(
        &self,
        name: &str,
        version: Option<&str>,
        force: bool,
        scope: InstallScope,
    ) -> Result<()> {
        (**self).install(name, version, force, scope)
    }

    fn load(&self, target: LoadTarget<'_>, version: Option<&str>, force: bool) -> Result<()> {
        (**self).load(target, version, force)
    }
}

/// Pick the installed copy matching `version` exactly, or the highest one
/// when no version is requested.
pub fn select_installed(
    installed: &[InstalledPackage],
    version: Option<&str>,
) -> Option<InstalledPackage> {
    match version {
        Some(wanted) => installed
            .iter()
            .find(|candidate| version::same_version(&candidate.version, wanted))
            .cloned(),
        None => installed
            .iter()
            .max_by(|a, b| version::compare(&a.version, &b.version))
            .cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(versions: &[&str]) -> Vec<InstalledPackage> {
        versions
            .iter()
            .map(|v| InstalledPackage::new("pkg", *v))
            .collect()
    }

    #[test]
    fn highest_version_wins_without_pin() {
        let found = select_installed(&installed(&["1.9.0", "1.10.0", "1.2"]), None).unwrap();
        assert_eq!(found.version, "1.10.0");
    }

    #[test]
    fn exact_pin_must_match() {
        let list = installed(&["1.0.0", "2.0.0"]);
        assert_eq!(
            select_installed(&list, Some("2.0.0")).unwrap().version,
            "2.0.0"
        );
        assert!(select_installed(&list, Some("3.0.0")).is_none());
        assert!(select_installed(&[], None).is_none());
    }

    #[test]
    fn scope_parses_both_spellings() {
        assert_eq!(
            "AllUsers".parse::<InstallScope>().unwrap(),
            InstallScope::AllUsers
        );
        assert_eq!(
            "current-user".parse::<InstallScope>().unwrap(),
            InstallScope::CurrentUser
        );
        assert!("machine".parse::<InstallScope>().is_err());
    }
}
