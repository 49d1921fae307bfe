//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use crossterm::style::Color;

use crate::errors::LoggerError;

/// Recognised severities. A lower priority number means a more severe message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    /// Priority 1.
    Critical,
    /// Priority 2.
    Error,
    /// Priority 3.
    Warning,
    /// Priority 4.
    #[default]
    Info,
    /// Priority 5.
    Debug,
}

impl Severity {
    /// Numeric rank used by the minimum-level filter.
    pub fn priority(self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::Error => 2,
            Severity::Warning => 3,
            Severity::Info => 4,
            Severity::Debug => 5,
        }
    }

    /// Display name used in rendered lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
            Severity::Debug => "Debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            _ => Err(LoggerError::UnknownLevel(s.to_owned())),
        }
    }
}

/// Message category. Drives the default colour and the minimum-level filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Category {
    /// Neutral informational output.
    #[default]
    Info,
    /// A failed operation.
    Error,
    /// A completed operation.
    Success,
    /// Work in progress.
    Processing,
    /// Something the operator should look at.
    Warning,
    /// Unrecoverable condition.
    Critical,
    /// Verbose troubleshooting output.
    Debug,
    /// Any other caller-defined label.
    Custom(String),
}

impl Category {
    /// Display name used in rendered lines.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Info => "Info",
            Category::Error => "Error",
            Category::Success => "Success",
            Category::Processing => "Processing",
            Category::Warning => "Warning",
            Category::Critical => "Critical",
            Category::Debug => "Debug",
            Category::Custom(label) => label,
        }
    }

    /// The severity a category ranks as, if it appears in the severity table.
    ///
    /// `Success`, `Processing` and custom labels have no rank and are never
    /// filtered out.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Category::Critical => Some(Severity::Critical),
            Category::Error => Some(Severity::Error),
            Category::Warning => Some(Severity::Warning),
            Category::Info => Some(Severity::Info),
            Category::Debug => Some(Severity::Debug),
            Category::Success | Category::Processing | Category::Custom(_) => None,
        }
    }

    /// Colour used when the caller does not pick one.
    pub fn default_color(&self) -> LogColor {
        match self {
            Category::Error => LogColor::Red,
            Category::Success => LogColor::Green,
            Category::Processing => LogColor::Yellow,
            Category::Warning => LogColor::Orange,
            _ => LogColor::White,
        }
    }

    /// Whether a message in this category passes a `min_level` floor.
    pub fn passes(&self, min_level: Severity) -> bool {
        match self.severity() {
            Some(severity) => severity.priority() <= min_level.priority(),
            None => true,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "info" => Category::Info,
            "error" => Category::Error,
            "success" => Category::Success,
            "processing" => Category::Processing,
            "warning" => Category::Warning,
            "critical" => Category::Critical,
            "debug" => Category::Debug,
            _ => Category::Custom(label.to_owned()),
        }
    }
}

/// Console colours available to log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogColor {
    /// Neutral.
    White,
    /// Errors.
    Red,
    /// Success.
    Green,
    /// Processing.
    Yellow,
    /// Warnings.
    Orange,
    /// Highlights.
    Cyan,
    /// Dimmed output.
    Gray,
}

impl LogColor {
    /// Terminal colour used by [`crate::TerminalConsole`].
    pub fn terminal(self) -> Color {
        match self {
            LogColor::White => Color::White,
            LogColor::Red => Color::Red,
            LogColor::Green => Color::Green,
            LogColor::Yellow => Color::Yellow,
            LogColor::Orange => Color::Rgb {
                r: 255,
                g: 165,
                b: 0,
            },
            LogColor::Cyan => Color::Cyan,
            LogColor::Gray => Color::Grey,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_rank_critical_first() {
        let ranks: Vec<u8> = [
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Info,
            Severity::Debug,
        ]
        .iter()
        .map(|s| s.priority())
        .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("debug".parse::<Severity>().unwrap(), Severity::Debug);
        assert!(matches!(
            "verbose".parse::<Severity>(),
            Err(LoggerError::UnknownLevel(_))
        ));
    }

    #[test]
    fn warning_floor_filters_info_but_not_error() {
        assert!(!Category::Info.passes(Severity::Warning));
        assert!(!Category::Debug.passes(Severity::Warning));
        assert!(Category::Warning.passes(Severity::Warning));
        assert!(Category::Error.passes(Severity::Warning));
        assert!(Category::Critical.passes(Severity::Critical));
    }

    #[test]
    fn unranked_categories_always_pass() {
        assert!(Category::Success.passes(Severity::Critical));
        assert!(Category::Processing.passes(Severity::Critical));
        assert!(Category::Custom("Audit".into()).passes(Severity::Critical));
    }

    #[test]
    fn default_colours_follow_category() {
        assert_eq!(Category::Info.default_color(), LogColor::White);
        assert_eq!(Category::Error.default_color(), LogColor::Red);
        assert_eq!(Category::Success.default_color(), LogColor::Green);
        assert_eq!(Category::Processing.default_color(), LogColor::Yellow);
        assert_eq!(Category::Warning.default_color(), LogColor::Orange);
    }

    #[test]
    fn category_from_label() {
        assert_eq!(Category::from("success"), Category::Success);
        assert_eq!(Category::from("Audit"), Category::Custom("Audit".into()));
        assert_eq!(Category::from("Audit").as_str(), "Audit");
    }
}
