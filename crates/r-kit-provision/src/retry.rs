//! ---
//! ems_section: "07-resilience-fault-tolerance"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Package install-and-load provisioning with retries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use r_kit_common::time::format_delay;

use crate::request::PackageRequest;

/// Fixed-delay retry budget for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Construct a policy.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// First attempt plus retries. Widened so `u32::MAX` retries still
    /// yields one more attempt.
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    /// Whether another attempt follows `attempt` (1-indexed).
    pub fn has_next(&self, attempt: u64) -> bool {
        attempt < self.total_attempts()
    }

    /// Operator message announcing the wait after `attempt` failed.
    pub fn message(&self, attempt: u64) -> String {
        retry_message(attempt, self.total_attempts(), self.delay)
    }
}

impl From<&PackageRequest> for RetryPolicy {
    fn from(request: &PackageRequest) -> Self {
        Self::new(request.max_retries, request.retry_delay)
    }
}

/// `Retrying in <delay> (attempt <attempt> of <total>)`.
pub fn retry_message(attempt: u64, total_attempts: u64, delay: Duration) -> String {
    format!(
        "Retrying in {} (attempt {} of {})",
        format_delay(delay),
        attempt,
        total_attempts
    )
}
