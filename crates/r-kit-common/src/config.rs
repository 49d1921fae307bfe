//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the kit components."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Severity names accepted by `logger.min_level`, most severe first.
pub const LOG_LEVEL_NAMES: [&str; 5] = ["critical", "error", "warning", "info", "debug"];

/// Scope names accepted by `provision.scope`.
pub const SCOPE_NAMES: [&str; 2] = ["current-user", "all-users"];

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_scope() -> String {
    "current-user".to_owned()
}

fn default_min_level() -> String {
    "info".to_owned()
}

fn default_auto_create() -> bool {
    true
}

/// Primary configuration document for the kit utilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitConfig {
    #[serde(default)]
    pub provision: ProvisionSettings,
    #[serde(default)]
    pub logger: LoggerSettings,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Metadata describing where a [`KitConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedKitConfig {
    pub config: KitConfig,
    pub source: PathBuf,
}

impl KitConfig {
    /// Load configuration from the first candidate path that exists.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedKitConfig> {
        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedKitConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<KitConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.provision.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for KitConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: KitConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Defaults and package pins for the provisioner.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionSettings {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay", rename = "delay_seconds")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub retry_delay: Duration,
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub packages: IndexMap<String, PackagePin>,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            force: false,
            scope: default_scope(),
            packages: IndexMap::new(),
        }
    }
}

impl ProvisionSettings {
    pub fn validate(&self) -> Result<()> {
        if !SCOPE_NAMES.contains(&self.scope.to_lowercase().as_str()) {
            return Err(anyhow!(
                "unknown install scope '{}'; expected one of {}",
                self.scope,
                SCOPE_NAMES.join(", ")
            ));
        }
        for (name, pin) in &self.packages {
            if name.trim().is_empty() {
                return Err(anyhow!("package names cannot be empty"));
            }
            if pin.version.is_some() && pin.path.is_some() {
                return Err(anyhow!(
                    "package '{}' declares both a version and a local path",
                    name
                ));
            }
        }
        Ok(())
    }
}

/// Per-package pin declared under `[provision.packages.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePin {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub force: Option<bool>,
}

/// Settings for the tiered console/file logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    #[serde(default = "default_min_level")]
    pub min_level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_auto_create")]
    pub auto_create: bool,
    #[serde(default)]
    pub transcript: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            file: None,
            auto_create: default_auto_create(),
            transcript: false,
        }
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVEL_NAMES.contains(&self.min_level.to_lowercase().as_str()) {
            return Err(anyhow!(
                "unknown log level '{}'; expected one of {}",
                self.min_level,
                LOG_LEVEL_NAMES.join(", ")
            ));
        }
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                return Err(anyhow!("logger.file cannot be empty when present"));
            }
        }
        Ok(())
    }
}

/// Settings for the diagnostics subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub directory: Option<PathBuf>,
}
