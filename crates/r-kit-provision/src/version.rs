//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Version ordering for installed packages.
//!
//! Package managers in the wild publish `1`, `1.2`, `1.2.3` and the odd
//! free-form tag. Numeric versions are padded to three components and
//! compared as semver; anything else sorts below them, lexically.

use std::cmp::Ordering;

use semver::Version;

/// Parse a possibly partial version (`1`, `1.2`, `v1.2.3`).
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(|c: char| c == 'v' || c == 'V');
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }
    let (core, suffix) = match trimmed.find(|c: char| c == '-' || c == '+') {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

/// Total order over version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Whether two spellings denote the same version (`1.2` and `1.2.0` do).
pub fn same_version(a: &str, b: &str) -> bool {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(left), Some(right)) => left == right,
        _ => a.trim() == b.trim(),
    }
}

/// Highest version of a list, if any.
pub fn highest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare(a, b))
}
