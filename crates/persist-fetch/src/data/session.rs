use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FetchError, Result};

use super::progress::{FetchPhase, Progress};

/// Counters that parameterise backoff, plus the control-path pause count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounters {
    /// Consecutive failed connection attempts; cleared by a successful one.
    pub connect_failures: u32,
    /// Reconnects caused by failed reads over the whole session.
    pub reconnects: u32,
    /// Voluntary reconnects taken at the checkpoint.
    pub passive_naps: u32,
    /// Explicit pauses. Never used to escalate backoff.
    pub pauses: u32,
}

/// State of one in-progress download.
///
/// `bytes_written` only grows, and always equals the bytes committed to the
/// staging file, so it is the offset every new connection resumes from.
#[derive(Debug, Clone)]
pub struct TransferSession {
    source_url:           String,
    expected_total_bytes: Option<u64>,
    bytes_written:        u64,
    since_checkpoint:     u64,
    pub(crate) counters:  AttemptCounters,
}

impl TransferSession {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url:           source_url.into(),
            expected_total_bytes: None,
            bytes_written:        0,
            since_checkpoint:     0,
            counters:             AttemptCounters::default(),
        }
    }

    pub fn source_url(&self) -> &str { &self.source_url }

    pub fn expected_total_bytes(&self) -> Option<u64> { self.expected_total_bytes }

    pub fn bytes_written(&self) -> u64 { self.bytes_written }

    /// Bytes carried by the current connection.
    pub fn since_checkpoint(&self) -> u64 { self.since_checkpoint }

    pub fn counters(&self) -> &AttemptCounters { &self.counters }

    /// Offset to request from, `None` before anything was written.
    pub fn resume_offset(&self) -> Option<u64> {
        (self.bytes_written > 0).then_some(self.bytes_written)
    }

    /// Bytes still missing, once the total is known.
    pub fn remaining(&self) -> Option<u64> {
        self.expected_total_bytes
            .map(|total| total.saturating_sub(self.bytes_written))
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.expected_total_bytes, Some(total) if self.bytes_written >= total)
    }

    /// Record the size the server declares.
    ///
    /// The first value sticks for the life of the session; a later,
    /// different value means the resource changed underneath us.
    pub fn record_total(&mut self, total: u64) -> Result<()> {
        match self.expected_total_bytes {
            None => {
                self.expected_total_bytes = Some(total);
                Ok(())
            }
            Some(expected) if expected == total => Ok(()),
            Some(expected) => Err(FetchError::SizeMismatch {
                expected,
                actual: total,
            }),
        }
    }

    pub(crate) fn advance(&mut self, written: u64) {
        self.bytes_written += written;
        self.since_checkpoint += written;
    }

    pub(crate) fn start_connection(&mut self) { self.since_checkpoint = 0; }

    pub(crate) fn progress(&self, phase: FetchPhase) -> Progress {
        Progress {
            phase,
            bytes_downloaded: self.bytes_written,
            total_bytes: self.expected_total_bytes,
            reconnects: self.counters.reconnects,
            passive_naps: self.counters.passive_naps,
        }
    }
}

/// What a finished download reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Where the complete file now lives.
    pub path:         PathBuf,
    pub bytes:        u64,
    pub reconnects:   u32,
    pub passive_naps: u32,
    pub pauses:       u32,
    pub elapsed:      Duration,
}
