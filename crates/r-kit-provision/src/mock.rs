//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::source::{InstallScope, InstalledPackage, LoadTarget, PackageSource};
use crate::version;

/// A call observed by [`MockPackageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    /// `find_installed(name)`.
    FindInstalled {
        /// Package name.
        name: String,
    },
    /// `install(name, version, force, scope)`.
    Install {
        /// Package name.
        name: String,
        /// Requested version.
        version: Option<String>,
        /// Force flag.
        force: bool,
        /// Install scope.
        scope: InstallScope,
    },
    /// `load(target, version, force)`.
    Load {
        /// Rendered load target (name or path).
        target: String,
        /// Requested version.
        version: Option<String>,
        /// Force flag.
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operation {
    Lookup,
    Install,
    Load,
}

/// Scriptable in-memory package source, useful for tests and examples.
///
/// Installs succeed for any package listed in the feed; lookups, installs and
/// loads can be made to fail a fixed number of times (or always) per package.
#[derive(Debug, Default)]
pub struct MockPackageSource {
    feed: IndexMap<String, Vec<String>>,
    installed: Mutex<IndexMap<String, Vec<String>>>,
    loaded: Mutex<IndexMap<String, Option<String>>>,
    failures: Mutex<HashMap<(String, Operation), u32>>,
    panics: Vec<String>,
    calls: Mutex<Vec<SourceCall>>,
}

impl MockPackageSource {
    /// Construct an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `version` of `name` in the feed.
    pub fn with_available(mut self, name: &str, version: &str) -> Self {
        self.feed
            .entry(name.to_owned())
            .or_default()
            .push(version.to_owned());
        self
    }

    /// Mark `version` of `name` as already installed.
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.installed
            .lock()
            .entry(name.to_owned())
            .or_default()
            .push(version.to_owned());
        self
    }

    /// Fail the next `times` lookups of `name`.
    pub fn failing_lookups(self, name: &str, times: u32) -> Self {
        self.script(name, Operation::Lookup, times)
    }

    /// Fail the next `times` installs of `name`.
    pub fn failing_installs(self, name: &str, times: u32) -> Self {
        self.script(name, Operation::Install, times)
    }

    /// Fail the next `times` loads of `name` (or of a path ending in `name`).
    pub fn failing_loads(self, name: &str, times: u32) -> Self {
        self.script(name, Operation::Load, times)
    }

    /// Panic whenever `name` is looked up.
    pub fn panicking_on(mut self, name: &str) -> Self {
        self.panics.push(name.to_owned());
        self
    }

    fn script(self, name: &str, operation: Operation, times: u32) -> Self {
        self.failures
            .lock()
            .insert((name.to_owned(), operation), times);
        self
    }

    fn take_failure(&self, name: &str, operation: Operation) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(&(name.to_owned(), operation)) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().clone()
    }

    /// Number of calls of each kind made for `name`: (lookups, installs, loads).
    pub fn call_counts(&self, name: &str) -> (usize, usize, usize) {
        self.calls
            .lock()
            .iter()
            .fold((0, 0, 0), |(lookups, installs, loads), call| match call {
                SourceCall::FindInstalled { name: n } if n == name => (lookups + 1, installs, loads),
                SourceCall::Install { name: n, .. } if n == name => (lookups, installs + 1, loads),
                SourceCall::Load { target, .. } if target.ends_with(name) => {
                    (lookups, installs, loads + 1)
                }
                _ => (lookups, installs, loads),
            })
    }

    /// Loaded packages and the version each was loaded at.
    pub fn loaded(&self) -> IndexMap<String, Option<String>> {
        self.loaded.lock().clone()
    }

    /// Installed versions of `name`.
    pub fn installed_versions(&self, name: &str) -> Vec<String> {
        self.installed
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl PackageSource for MockPackageSource {
    fn find_installed(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        self.calls.lock().push(SourceCall::FindInstalled {
            name: name.to_owned(),
        });
        if self.panics.iter().any(|p| p == name) {
            panic!("scripted panic for {name}");
        }
        if self.take_failure(name, Operation::Lookup) {
            return Err(anyhow!("repository unreachable while querying {name}"));
        }
        Ok(self
            .installed_versions(name)
            .into_iter()
            .map(|v| InstalledPackage::new(name, v))
            .collect())
    }

    fn install(
        &self,
        name: &str,
        version: Option<&str>,
        force: bool,
        scope: InstallScope,
    ) -> Result<()> {
        self.calls.lock().push(SourceCall::Install {
            name: name.to_owned(),
            version: version.map(str::to_owned),
            force,
            scope,
        });
        if self.take_failure(name, Operation::Install) {
            return Err(anyhow!("download of {name} interrupted"));
        }
        let published = self
            .feed
            .get(name)
            .ok_or_else(|| anyhow!("no package named {name} in the feed"))?;
        let chosen = match version {
            Some(wanted) => published
                .iter()
                .find(|v| version::same_version(v, wanted))
                .ok_or_else(|| anyhow!("{name} {wanted} is not published"))?
                .clone(),
            None => version::highest(published.iter().map(String::as_str))
                .ok_or_else(|| anyhow!("{name} has no published versions"))?
                .to_owned(),
        };
        let mut installed = self.installed.lock();
        let versions = installed.entry(name.to_owned()).or_default();
        if !versions.contains(&chosen) {
            versions.push(chosen);
        }
        Ok(())
    }

    fn load(&self, target: LoadTarget<'_>, version: Option<&str>, force: bool) -> Result<()> {
        let rendered = target.to_string();
        self.calls.lock().push(SourceCall::Load {
            target: rendered.clone(),
            version: version.map(str::to_owned),
            force,
        });
        let key = match target {
            LoadTarget::Name(name) => name.to_owned(),
            LoadTarget::Path(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or(rendered),
        };
        if self.take_failure(&key, Operation::Load) {
            return Err(anyhow!("module {key} failed to initialise"));
        }
        self.loaded
            .lock()
            .insert(key, version.map(str::to_owned));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_lookup() {
        let source = MockPackageSource::new()
            .with_available("alpha", "1.0.0")
            .with_available("alpha", "1.4.0");
        source
            .install("alpha", None, false, InstallScope::CurrentUser)
            .unwrap();
        assert_eq!(source.installed_versions("alpha"), vec!["1.4.0"]);
        assert!(source
            .install("alpha", Some("2.0.0"), false, InstallScope::CurrentUser)
            .is_err());
        assert!(source
            .install("missing", None, false, InstallScope::CurrentUser)
            .is_err());
    }

    #[test]
    fn scripted_failures_are_consumed() {
        let source = MockPackageSource::new()
            .with_installed("alpha", "1.0.0")
            .failing_lookups("alpha", 1);
        assert!(source.find_installed("alpha").is_err());
        assert_eq!(source.find_installed("alpha").unwrap().len(), 1);
        assert_eq!(source.call_counts("alpha"), (2, 0, 0));
    }

    #[test]
    fn permanent_failures_never_run_out() {
        let source = MockPackageSource::new().failing_loads("alpha", u32::MAX);
        for _ in 0..5 {
            assert!(source.load(LoadTarget::Name("alpha"), None, false).is_err());
        }
        assert!(source.loaded().is_empty());
    }
}
