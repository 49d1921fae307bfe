//! ---
//! ems_section: "06-performance-realtime"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timed invocation and repeat-run benchmarking."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Wall-clock timing of caller-supplied work.
//!
//! [`time_it`] and [`time_call`] run a unit of work once and hand back its
//! output together with the elapsed time. A failing unit of work never
//! propagates: its message lands in [`InvocationResult::error_message`].
//! [`bench`] repeats a call and summarises the samples.

pub mod bench;
pub mod errors;
pub mod invoke;

pub use bench::{bench, BenchmarkReport, TimingSamples, TimingSummary};
pub use errors::{Result, TimingError};
pub use invoke::{time_call, time_it, Arguments, Invocable, InvocationResult};
