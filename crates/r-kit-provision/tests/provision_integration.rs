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
use std::path::Path;
use std::time::Duration;

use r_kit_provision::prelude::*;
use r_kit_provision::{DirectoryPackageSource, MockPackageSource, ProvisionStep};
use tempfile::tempdir;

fn publish(feed: &Path, name: &str, version: &str) {
    let dir = feed.join(name).join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.toml"), format!("name = \"{name}\"")).unwrap();
}

#[test]
fn directory_source_installs_then_reuses() {
    let root = tempdir().unwrap();
    let feed = root.path().join("feed");
    publish(&feed, "alpha", "0.9.0");
    publish(&feed, "alpha", "0.10.0");
    publish(&feed, "beta", "2.1.0");

    let provisioner = Provisioner::new(DirectoryPackageSource::new(&feed, root.path().join("store")));
    let options = ProvisionOptions::default().with_retries(1, Duration::ZERO);

    let first = provisioner.provision(["alpha", "beta"], &options);
    assert!(first.all_succeeded());
    assert_eq!(
        first.get("alpha"),
        Some(&ProvisionOutcome::Succeeded {
            attempts: 1,
            step: ProvisionStep::Installed { version: None }
        })
    );

    let second = provisioner.provision(["alpha"], &options);
    assert_eq!(
        second.get("alpha"),
        Some(&ProvisionOutcome::Succeeded {
            attempts: 1,
            step: ProvisionStep::AlreadyInstalled {
                version: "0.10.0".into()
            }
        })
    );

    let loaded = provisioner.source().loaded();
    assert_eq!(loaded["alpha"].version.as_deref(), Some("0.10.0"));
    assert_eq!(loaded["beta"].version.as_deref(), Some("2.1.0"));
}

#[test]
fn unknown_package_exhausts_budget_without_blocking_others() {
    let root = tempdir().unwrap();
    let feed = root.path().join("feed");
    publish(&feed, "beta", "1.0.0");
    let provisioner = Provisioner::new(DirectoryPackageSource::new(&feed, root.path().join("store")));

    let report = provisioner.provision(
        ["ghost", "beta"],
        &ProvisionOptions::default().with_retries(2, Duration::ZERO),
    );
    match report.get("ghost").unwrap() {
        ProvisionOutcome::FailedAfterRetries { attempts, last_error } => {
            assert_eq!(*attempts, 3);
            assert!(last_error.contains("ghost"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(report.get("beta").unwrap().is_success());
    assert_eq!(report.succeeded().count(), 1);
}

#[test]
fn retry_delay_is_applied_between_attempts_only() {
    let source = MockPackageSource::new().failing_lookups("alpha", u32::MAX);
    let provisioner = Provisioner::new(&source);
    let started = std::time::Instant::now();
    let report = provisioner.provision(
        ["alpha"],
        &ProvisionOptions::default().with_retries(1, Duration::from_millis(1000)),
    );
    let elapsed = started.elapsed();
    assert!(!report.all_succeeded());
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1900));
    assert_eq!(source.call_counts("alpha"), (2, 0, 0));
}

#[cfg(unix)]
#[test]
fn broken_feed_entry_never_reports_success() {
    let root = tempdir().unwrap();
    let feed = root.path().join("feed");
    publish(&feed, "alpha", "1.0.0");
    std::os::unix::fs::symlink(
        root.path().join("nowhere"),
        feed.join("alpha").join("1.0.0").join("dangling.toml"),
    )
    .unwrap();
    let provisioner = Provisioner::new(DirectoryPackageSource::new(&feed, root.path().join("store")));

    let report = provisioner.provision(
        ["alpha"],
        &ProvisionOptions::default().with_retries(2, Duration::ZERO),
    );
    match report.get("alpha").unwrap() {
        ProvisionOutcome::FailedAfterRetries { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(provisioner.source().loaded().is_empty());
}
