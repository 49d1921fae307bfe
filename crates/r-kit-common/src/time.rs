//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the kit components."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Local};

/// Timestamp layout used by every rendered log line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a wait interval for operator-facing messages.
///
/// Delays of a minute or more are split into minutes and remaining seconds,
/// dropping the seconds part when it is zero (`1 min`, `1 min 5 sec`).
/// Shorter delays are plain seconds (`45 sec`). Sub-second precision is
/// truncated.
pub fn format_delay(delay: Duration) -> String {
    let total = delay.as_secs();
    if total >= 60 {
        let minutes = total / 60;
        let seconds = total % 60;
        if seconds == 0 {
            format!("{minutes} min")
        } else {
            format!("{minutes} min {seconds} sec")
        }
    } else {
        format!("{total} sec")
    }
}

/// Current local time in [`LOG_TIMESTAMP_FORMAT`].
pub fn log_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Format an arbitrary local instant in [`LOG_TIMESTAMP_FORMAT`].
pub fn format_timestamp(instant: &DateTime<Local>) -> String {
    instant.format(LOG_TIMESTAMP_FORMAT).to_string()
}

/// Convert a duration into nanoseconds as a float, for summary statistics.
pub fn duration_to_nanos_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000_000_000.0
}
