//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Local};
use r_kit_common::time::format_timestamp;

use crate::level::{Category, LogColor, Severity};

/// A single rendered log event. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Local time the record was created.
    pub timestamp: DateTime<Local>,
    /// Descriptive level tag.
    pub level: Severity,
    /// Category used for colour and filtering.
    pub category: Category,
    /// Message body.
    pub message: String,
    /// Resolved console colour.
    pub color: LogColor,
}

impl LogRecord {
    /// Build a record stamped with the current local time.
    pub fn new(
        message: impl Into<String>,
        category: Category,
        level: Severity,
        color: Option<LogColor>,
    ) -> Self {
        Self::at(Local::now(), message, category, level, color)
    }

    /// Build a record with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Local>,
        message: impl Into<String>,
        category: Category,
        level: Severity,
        color: Option<LogColor>,
    ) -> Self {
        let color = color.unwrap_or_else(|| category.default_color());
        Self {
            timestamp,
            level,
            category,
            message: message.into(),
            color,
        }
    }

    /// Uncoloured line: `[YYYY-MM-DD HH:MM:SS] [level] [category] - message`.
    pub fn render(&self) -> String {
        format!(
            "[{}] [{}] [{}] - {}",
            format_timestamp(&self.timestamp),
            self.level,
            self.category,
            self.message
        )
    }
}
