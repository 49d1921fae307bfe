//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Best-effort package provisioning.
//!
//! A [`Provisioner`] makes sure each requested package is installed through a
//! [`PackageSource`] and then loaded, retrying failed attempts with a fixed
//! delay. Every state transition is reported through `tracing`, and the
//! caller receives a [`ProvisionReport`] with one outcome per package.

pub mod directory;
pub mod errors;
pub mod mock;
pub mod provisioner;
pub mod request;
pub mod retry;
pub mod source;
pub mod version;

pub use directory::DirectoryPackageSource;
pub use errors::{ProvisionError, Result};
pub use mock::{MockPackageSource, SourceCall};
pub use provisioner::{
    PackageOutcome, ProvisionOutcome, ProvisionReport, ProvisionStep, Provisioner,
};
pub use request::{PackageRequest, ProvisionOptions};
pub use retry::{retry_message, RetryPolicy};
pub use source::{InstallScope, InstalledPackage, LoadTarget, PackageSource};

/// Crate prelude collecting the most commonly used types.
pub mod prelude {
    pub use super::provisioner::{ProvisionOutcome, ProvisionReport, Provisioner};
    pub use super::request::ProvisionOptions;
    pub use super::source::{InstallScope, PackageSource};
}
