//! Session log sink
//!
//! Every transition reported by the core becomes one line
//! `[YYYY-MM-DD HH:MM:SS.mmm] Auto: <message>`, appended to the session log
//! file and mirrored to `tracing`. Lines are also queued for the command
//! link so consoles see the same text.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ignis_core::traits::{LogSink, Severity};
use tracing::{error, info, warn};

/// Lines kept for the link before the oldest is dropped
const OUTBOX_LEN: usize = 32;

/// Timestamp format of a log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format one log line
pub fn format_line(at: &DateTime<Local>, message: &str) -> String {
    format!("[{}] Auto: {}", at.format(TIMESTAMP_FORMAT), message)
}

pub struct SessionLog {
    file: Option<LineWriter<File>>,
    path: Option<PathBuf>,
    outbox: VecDeque<String>,
    write_failed: bool,
}

impl SessionLog {
    /// Log to `tracing` only
    pub fn console() -> Self {
        Self {
            file: None,
            path: None,
            outbox: VecDeque::new(),
            write_failed: false,
        }
    }

    /// Append to `<dir>/<session>_autosequence.log`
    pub fn create(dir: &Path, session: &str) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_autosequence.log", session));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Session log at {}", path.display());
        Ok(Self {
            file: Some(LineWriter::new(file)),
            path: Some(path),
            outbox: VecDeque::new(),
            write_failed: false,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines not yet published on the link, oldest first
    pub fn drain_outbox(&mut self) -> impl Iterator<Item = String> + '_ {
        self.outbox.drain(..)
    }

    fn append(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(file, "{}", line) {
            // Report once; tracing still carries every line
            if !self.write_failed {
                error!("Session log write failed: {}", e);
                self.write_failed = true;
            }
        }
    }
}

impl LogSink for SessionLog {
    fn record(&mut self, severity: Severity, line: fmt::Arguments<'_>) {
        let mut message = String::new();
        let _ = message.write_fmt(line);

        match severity {
            Severity::Info => info!(target: "ignis::auto", "{}", message),
            Severity::Warn => warn!(target: "ignis::auto", "{}", message),
            Severity::Fault => error!(target: "ignis::auto", "{}", message),
        }

        let stamped = format_line(&Local::now(), &message);
        self.append(&stamped);

        if self.outbox.len() == OUTBOX_LEN {
            self.outbox.pop_front();
        }
        self.outbox.push_back(message);
    }
}
