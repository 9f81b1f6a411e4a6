//! Session record archive
//!
//! Records from the core carry monotonic milliseconds. They are mapped to
//! wall-clock time through an anchor taken at startup and written as a
//! postcard file next to the session log.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use ignis_core::record::{RecordKind, SessionRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ArchiveError;

/// Monotonic-to-wall-clock mapping
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    anchor_ms: i64,
    anchor: DateTime<Utc>,
}

impl WallClock {
    /// `now_ms` on the monotonic base corresponds to `now`
    pub fn new(now_ms: i64, now: DateTime<Utc>) -> Self {
        Self {
            anchor_ms: now_ms,
            anchor: now,
        }
    }

    pub fn to_wall(&self, mono_ms: i64) -> DateTime<Utc> {
        self.anchor + Duration::milliseconds(mono_ms - self.anchor_ms)
    }
}

/// One record with wall-clock bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRecord {
    pub name: String,
    pub kind: RecordKind,
    /// Unix epoch milliseconds
    pub start_unix_ms: i64,
    /// Unix epoch milliseconds
    pub end_unix_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionArchive {
    pub session: String,
    pub records: Vec<ArchivedRecord>,
}

impl SessionArchive {
    pub fn new(session: &str, records: &[SessionRecord], clock: &WallClock) -> Self {
        Self {
            session: session.to_string(),
            records: records
                .iter()
                .map(|r| ArchivedRecord {
                    name: r.name.as_str().to_string(),
                    kind: r.kind,
                    start_unix_ms: clock.to_wall(r.start_ms).timestamp_millis(),
                    end_unix_ms: clock.to_wall(r.end_ms).timestamp_millis(),
                })
                .collect(),
        }
    }

    /// Write `<dir>/<session>.records`, replacing any previous file
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ArchiveError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.records", self.session));
        let bytes = postcard::to_allocvec(self)?;
        fs::write(&path, bytes)?;
        for record in &self.records {
            info!(
                record = %record.name,
                start = record.start_unix_ms,
                end = record.end_unix_ms,
                "Archived record"
            );
        }
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self, ArchiveError> {
        let bytes = fs::read(path)?;
        Ok(postcard::from_bytes(&bytes)?)
    }
}
