//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::source::{InstallScope, InstalledPackage, LoadTarget, PackageSource};
use crate::version;

const STAGING_SUFFIX: &str = ".partial";

/// Filesystem-backed package manager.
///
/// Layout:
/// * feed: `<feed>/<name>/<version>/...`, the default install source
/// * store: `<store>/<scope>/<name>/<version>/...`
///
/// Loading records `name -> version` in an in-process table; a package stays
/// loaded at one version unless a load is forced.
#[derive(Debug)]
pub struct DirectoryPackageSource {
    feed: PathBuf,
    store: PathBuf,
    loaded: Mutex<IndexMap<String, LoadedModule>>,
}

/// A package registered as loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Loaded version, when loaded from the store.
    pub version: Option<String>,
    /// Directory or file the package was loaded from.
    pub location: PathBuf,
}

impl DirectoryPackageSource {
    /// Create a source reading from `feed` and installing under `store`.
    pub fn new(feed: impl Into<PathBuf>, store: impl Into<PathBuf>) -> Self {
        Self {
            feed: feed.into(),
            store: store.into(),
            loaded: Mutex::new(IndexMap::new()),
        }
    }

    /// Root of installs for a scope.
    pub fn scope_root(&self, scope: InstallScope) -> PathBuf {
        self.store.join(scope.as_str())
    }

    /// Snapshot of the loaded-module table.
    pub fn loaded(&self) -> IndexMap<String, LoadedModule> {
        self.loaded.lock().clone()
    }

    /// Versions published in the feed for `name`.
    pub fn published_versions(&self, name: &str) -> Result<Vec<String>> {
        version_dirs(&self.feed.join(name))
    }

    fn installed_location(&self, name: &str, version: &str) -> Option<PathBuf> {
        [InstallScope::CurrentUser, InstallScope::AllUsers]
            .into_iter()
            .map(|scope| self.scope_root(scope).join(name).join(version))
            .find(|path| path.is_dir())
    }

    fn register(&self, name: String, module: LoadedModule, force: bool) -> Result<()> {
        let mut loaded = self.loaded.lock();
        if let Some(existing) = loaded.get(&name) {
            if existing.version != module.version && !force {
                return Err(anyhow!(
                    "{} is already loaded at version {}; force is required to replace it",
                    name,
                    existing.version.as_deref().unwrap_or("<path>")
                ));
            }
        }
        debug!(package = %name, location = %module.location.display(), "module registered");
        loaded.insert(name, module);
        Ok(())
    }
}

impl PackageSource for DirectoryPackageSource {
    fn find_installed(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        let mut found = Vec::new();
        for scope in [InstallScope::CurrentUser, InstallScope::AllUsers] {
            for version in version_dirs(&self.scope_root(scope).join(name))? {
                if !found.iter().any(|p: &InstalledPackage| p.version == version) {
                    found.push(InstalledPackage::new(name, version));
                }
            }
        }
        Ok(found)
    }

    fn install(
        &self,
        name: &str,
        version: Option<&str>,
        force: bool,
        scope: InstallScope,
    ) -> Result<()> {
        let published = self.published_versions(name)?;
        if published.is_empty() {
            return Err(anyhow!(
                "no package named {} in feed {}",
                name,
                self.feed.display()
            ));
        }
        let chosen = match version {
            Some(wanted) => published
                .iter()
                .find(|candidate| version::same_version(candidate, wanted))
                .cloned()
                .ok_or_else(|| anyhow!("{} {} is not published in the feed", name, wanted))?,
            None => version::highest(published.iter().map(String::as_str))
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("{} has no published versions", name))?,
        };

        let source = self.feed.join(name).join(&chosen);
        let package_root = self.scope_root(scope).join(name);
        let target = package_root.join(&chosen);
        if target.exists() && !force {
            debug!(package = name, version = %chosen, "already present in store");
            return Ok(());
        }

        // Copies land in a hidden staging directory and only become visible
        // to `find_installed` once complete.
        let staging = package_root.join(format!(".{}{}", chosen, STAGING_SUFFIX));
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("unable to clear {}", staging.display()))?;
        }
        if let Err(err) = copy_tree(&source, &staging) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "unable to remove partial install");
            }
            return Err(err);
        }
        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("unable to remove {}", target.display()))?;
        }
        fs::rename(&staging, &target).with_context(|| {
            format!(
                "unable to move {} into place at {}",
                staging.display(),
                target.display()
            )
        })?;
        Ok(())
    }

    fn load(&self, target: LoadTarget<'_>, version: Option<&str>, force: bool) -> Result<()> {
        match target {
            LoadTarget::Name(name) => {
                let installed: Vec<String> = self
                    .find_installed(name)?
                    .into_iter()
                    .map(|p| p.version)
                    .collect();
                let chosen = match version {
                    Some(wanted) => installed
                        .iter()
                        .find(|candidate| version::same_version(candidate, wanted))
                        .cloned()
                        .ok_or_else(|| anyhow!("{} {} is not installed", name, wanted))?,
                    None => version::highest(installed.iter().map(String::as_str))
                        .map(str::to_owned)
                        .ok_or_else(|| anyhow!("{} is not installed", name))?,
                };
                let location = self
                    .installed_location(name, &chosen)
                    .ok_or_else(|| anyhow!("{} {} vanished from the store", name, chosen))?;
                self.register(
                    name.to_owned(),
                    LoadedModule {
                        version: Some(chosen),
                        location,
                    },
                    force,
                )
            }
            LoadTarget::Path(path) => {
                if !path.exists() {
                    return Err(anyhow!("{} does not exist", path.display()));
                }
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow!("cannot derive a module name from {}", path.display()))?;
                self.register(
                    name,
                    LoadedModule {
                        version: None,
                        location: path.to_path_buf(),
                    },
                    force,
                )
            }
        }
    }
}

fn version_dirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut versions = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("unable to read {}", dir.display()))? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !file_name.starts_with('.') {
            versions.push(file_name);
        }
    }
    Ok(versions)
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("unexpected path {}", entry.path().display()))?;
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("unable to create {}", destination.display()))?;
        } else {
            fs::copy(entry.path(), &destination).with_context(|| {
                format!(
                    "unable to copy {} to {}",
                    entry.path().display(),
                    destination.display()
                )
            })?;
        }
    }
    Ok(())
}
