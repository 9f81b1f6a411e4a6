//! Transition log sink
//!
//! The core never formats timestamps or touches storage. Each notable
//! transition (armed, event fired, hold cleared/stalled, interlock tripped,
//! session complete) is handed to a [`LogSink`] as one line.

use core::fmt::{self, Write};

use heapless::{String, Vec};

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Normal transition
    Info,
    /// Irregularity that degrades to a held or stalled state
    Warn,
    /// Hard fault (interlock trip, safing)
    Fault,
}

/// Append-only, human-readable line sink
pub trait LogSink {
    /// Append one line
    fn record(&mut self, severity: Severity, line: fmt::Arguments<'_>);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn record(&mut self, _severity: Severity, _line: fmt::Arguments<'_>) {}
}

/// Maximum length of a line kept by [`MemoryLog`]
pub const MEMORY_LINE_LEN: usize = 96;

/// Bounded in-memory sink, oldest lines dropped first
///
/// Used by hosts that want to replay the last few transitions and by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog<const N: usize> {
    lines: Vec<(Severity, String<MEMORY_LINE_LEN>), N>,
}

impl<const N: usize> MemoryLog<N> {
    /// Create an empty log
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines currently held, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|(_, line)| line.as_str())
    }

    /// Check whether any held line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|line| line.contains(needle))
    }

    /// Count held lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.lines().filter(|line| line.contains(needle)).count()
    }

    /// Number of lines at or above `severity`
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.lines.iter().filter(|(s, _)| *s >= severity).count()
    }

    /// Drop all lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl<const N: usize> LogSink for MemoryLog<N> {
    fn record(&mut self, severity: Severity, line: fmt::Arguments<'_>) {
        let mut text = String::new();
        // Overlong lines are truncated at capacity
        let _ = text.write_fmt(line);

        if self.lines.is_full() {
            self.lines.remove(0);
        }
        let _ = self.lines.push((severity, text));
    }
}
