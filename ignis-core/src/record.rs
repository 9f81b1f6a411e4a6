//! Session records
//!
//! Named time ranges handed to the data archive when a session completes,
//! shuts down or aborts. Times are in the caller's monotonic base
//! (`now_ms`).

use core::fmt::Write;

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum length of a record name
pub const RECORD_NAME_LEN: usize = 48;

/// Which range a record covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecordKind {
    /// Data recording start to stop
    FullDataset,
    /// Sequence start to final event, padded
    TestData,
    /// Padded range around an interlock trip
    Abort,
}

impl RecordKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            RecordKind::FullDataset => "full_dataset",
            RecordKind::TestData => "test_data",
            RecordKind::Abort => "abort",
        }
    }
}

/// One named, time-bounded record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionRecord {
    pub name: String<RECORD_NAME_LEN>,
    pub kind: RecordKind,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl SessionRecord {
    fn new(session: &str, kind: RecordKind, start_ms: i64, end_ms: i64) -> Self {
        let mut name = String::new();
        let _ = write!(name, "{}_{}", session, kind.suffix());
        Self {
            name,
            kind,
            start_ms,
            end_ms: end_ms.max(start_ms),
        }
    }
}

/// Range bookkeeping for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordTimes {
    recording: bool,
    data_start_ms: i64,
    data_stop_ms: i64,
    test_start_ms: i64,
    test_end_ms: i64,
    aborts: u16,
}

impl RecordTimes {
    /// Every range collapsed onto the creation instant
    pub const fn new(created_ms: i64) -> Self {
        Self {
            recording: false,
            data_start_ms: created_ms,
            data_stop_ms: created_ms,
            test_start_ms: created_ms,
            test_end_ms: created_ms,
            aborts: 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Returns true if recording was off
    pub fn start_recording(&mut self, now_ms: i64) -> bool {
        if self.recording {
            return false;
        }
        self.recording = true;
        self.data_start_ms = now_ms;
        true
    }

    /// Returns true if recording was on
    pub fn stop_recording(&mut self, now_ms: i64) -> bool {
        if !self.recording {
            return false;
        }
        self.recording = false;
        self.data_stop_ms = now_ms;
        true
    }

    pub fn mark_test_start(&mut self, now_ms: i64, pad_ms: i64) {
        self.test_start_ms = now_ms.saturating_sub(pad_ms);
    }

    pub fn mark_test_end(&mut self, now_ms: i64, pad_ms: i64) {
        self.test_end_ms = now_ms.saturating_add(pad_ms);
    }

    /// Range around a trip at `now_ms`, numbered per session
    ///
    /// Named `<session>_abort_<n>` so repeated aborts stay distinct.
    pub fn abort_record(&mut self, session: &str, now_ms: i64, pad_ms: i64) -> SessionRecord {
        self.aborts = self.aborts.saturating_add(1);
        let mut name = String::new();
        let _ = write!(name, "{}_{}_{}", session, RecordKind::Abort.suffix(), self.aborts);
        SessionRecord {
            name,
            kind: RecordKind::Abort,
            start_ms: now_ms.saturating_sub(pad_ms),
            end_ms: now_ms.saturating_add(pad_ms),
        }
    }

    /// Both records; a recording still in progress ends at `now_ms`
    pub fn records(&self, session: &str, now_ms: i64) -> Vec<SessionRecord, 2> {
        let data_stop = if self.recording {
            now_ms
        } else {
            self.data_stop_ms
        };
        let mut out = Vec::new();
        let _ = out.push(SessionRecord::new(
            session,
            RecordKind::FullDataset,
            self.data_start_ms,
            data_stop,
        ));
        let _ = out.push(SessionRecord::new(
            session,
            RecordKind::TestData,
            self.test_start_ms,
            self.test_end_ms,
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_names() {
        let times = RecordTimes::new(0);
        let records = times.records("hotfire_3", 0);
        assert_eq!(records[0].name.as_str(), "hotfire_3_full_dataset");
        assert_eq!(records[1].name.as_str(), "hotfire_3_test_data");
    }

    #[test]
    fn test_padded_test_window() {
        let mut times = RecordTimes::new(0);
        times.mark_test_start(100_000, 30_000);
        times.mark_test_end(125_000, 30_000);
        let r = &times.records("s", 200_000)[1];
        assert_eq!((r.start_ms, r.end_ms), (70_000, 155_000));
    }

    #[test]
    fn test_open_recording_ends_now() {
        let mut times = RecordTimes::new(0);
        assert!(times.start_recording(5_000));
        assert!(!times.start_recording(6_000));
        let r = &times.records("s", 9_000)[0];
        assert_eq!((r.start_ms, r.end_ms), (5_000, 9_000));

        assert!(times.stop_recording(10_000));
        let r = &times.records("s", 50_000)[0];
        assert_eq!(r.end_ms, 10_000);
    }

    #[test]
    fn test_abort_records_numbered() {
        let mut times = RecordTimes::new(0);
        let first = times.abort_record("hotfire_3", 60_000, 30_000);
        assert_eq!(first.name.as_str(), "hotfire_3_abort_1");
        assert_eq!(first.kind, RecordKind::Abort);
        assert_eq!((first.start_ms, first.end_ms), (30_000, 90_000));

        let second = times.abort_record("hotfire_3", 90_000, 30_000);
        assert_eq!(second.name.as_str(), "hotfire_3_abort_2");
    }
}
