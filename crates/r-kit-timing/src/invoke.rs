//! ---
//! ems_section: "06-performance-realtime"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timed invocation and repeat-run benchmarking."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt::Display;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use serde_with::{serde_as, DurationSecondsWithFrac};
use tracing::error;

use crate::errors::{Result, TimingError};

/// Argument binding handed to an [`Invocable`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Arguments {
    /// No arguments.
    #[default]
    None,
    /// Arguments bound by name.
    Named(Map<String, Value>),
    /// Arguments bound by position.
    Positional(Vec<Value>),
}

impl Arguments {
    /// Pick the binding for a call. Named arguments must be a JSON object and
    /// win over positional ones when both are supplied.
    pub fn resolve(named: Option<&Value>, positional: Option<&[Value]>) -> Result<Self> {
        match (named, positional) {
            (Some(Value::Object(map)), _) => Ok(Arguments::Named(map.clone())),
            (Some(other), _) => Err(TimingError::InvalidArgument(format!(
                "named arguments must be a mapping, got {}",
                json_kind(other)
            ))),
            (None, Some(values)) => Ok(Arguments::Positional(values.to_vec())),
            (None, None) => Ok(Arguments::None),
        }
    }

    /// Named argument `name`, if bound by name.
    pub fn named(&self, name: &str) -> Option<&Value> {
        match self {
            Arguments::Named(map) => map.get(name),
            _ => None,
        }
    }

    /// Positional argument `index`, if bound by position.
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            Arguments::Positional(values) => values.get(index),
            _ => None,
        }
    }

    /// Argument by name or, failing that, by position.
    pub fn get(&self, name: &str, index: usize) -> Option<&Value> {
        self.named(name).or_else(|| self.positional(index))
    }

    /// Number of bound arguments.
    pub fn len(&self) -> usize {
        match self {
            Arguments::None => 0,
            Arguments::Named(map) => map.len(),
            Arguments::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A unit of work that can be timed.
pub trait Invocable {
    /// Run the work once.
    fn invoke(&self, args: Arguments) -> anyhow::Result<Value>;
}

impl<F> Invocable for F
where
    F: Fn(Arguments) -> anyhow::Result<Value>,
{
    fn invoke(&self, args: Arguments) -> anyhow::Result<Value> {
        self(args)
    }
}

/// Output of one timed call. Exactly one of `output`/`error_message` is set.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult<T = Value> {
    pub output: Option<T>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub elapsed: Option<Duration>,
    pub error_message: Option<String>,
}

impl<T> InvocationResult<T> {
    fn completed(output: T, elapsed: Duration) -> Self {
        Self {
            output: Some(output),
            elapsed: Some(elapsed),
            error_message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            output: None,
            elapsed: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Time a dynamically bound unit of work.
///
/// Validation failures (no work, named arguments that are not a mapping) are
/// returned as [`TimingError::InvalidArgument`]. Failures of the work itself
/// are captured in the result and logged, never returned.
pub fn time_it(
    work: Option<&dyn Invocable>,
    named: Option<&Value>,
    positional: Option<&[Value]>,
) -> Result<InvocationResult> {
    let work = work.ok_or_else(|| {
        TimingError::InvalidArgument("work must be a callable unit of work".to_owned())
    })?;
    let args = Arguments::resolve(named, positional)?;
    Ok(time_call(|| work.invoke(args)))
}

/// Time a closure. The clock covers the call only.
pub fn time_call<T, E, F>(work: F) -> InvocationResult<T>
where
    E: Display,
    F: FnOnce() -> std::result::Result<T, E>,
{
    let started = Instant::now();
    let outcome = work();
    let elapsed = started.elapsed();
    match outcome {
        Ok(output) => InvocationResult::completed(output, elapsed),
        Err(err) => {
            let message = err.to_string();
            error!(error = %message, "timed work failed");
            InvocationResult::failed(message)
        }
    }
}
