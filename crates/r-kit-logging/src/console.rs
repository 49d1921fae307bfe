//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tiered console and file logging with session transcripts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::sync::Arc;

use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use parking_lot::Mutex;

use crate::level::LogColor;

/// Destination for rendered, coloured log lines.
pub trait Console: Send {
    /// Write one line in the given colour.
    fn write_line(&mut self, text: &str, color: LogColor) -> io::Result<()>;
}

/// Colourised standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn write_line(&mut self, text: &str, color: LogColor) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        queue!(
            stdout,
            SetForegroundColor(color.terminal()),
            Print(text),
            ResetColor,
            Print("\n")
        )?;
        stdout.flush()
    }
}

/// In-memory console. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    lines: Arc<Mutex<Vec<(String, LogColor)>>>,
}

impl BufferConsole {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured lines without colour.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(text, _)| text.clone()).collect()
    }

    /// Captured lines together with their colour.
    pub fn entries(&self) -> Vec<(String, LogColor)> {
        self.lines.lock().clone()
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, text: &str, color: LogColor) -> io::Result<()> {
        self.lines.lock().push((text.to_owned(), color));
        Ok(())
    }
}
