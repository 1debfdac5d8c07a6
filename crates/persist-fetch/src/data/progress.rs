use std::fmt;

/// Phases reported to the progress callback.
///
/// A session moves through `Connecting → Downloading → Committing → Completed`,
/// returning to `Connecting` (possibly through `Napping` or `Paused`) every
/// time the connection is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Opening a connection, including connect retries.
    #[default]
    Connecting,

    /// Streaming bytes into the staging file.
    Downloading,

    /// Resting with no connection open before reconnecting.
    Napping,

    /// Suspended by an explicit pause request.
    Paused,

    /// Moving the finished staging file to its destination.
    Committing,

    /// The destination holds the complete file.
    Completed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Connecting => write!(f, "Connecting"),
            FetchPhase::Downloading => write!(f, "Downloading"),
            FetchPhase::Napping => write!(f, "Napping"),
            FetchPhase::Paused => write!(f, "Paused"),
            FetchPhase::Committing => write!(f, "Committing"),
            FetchPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// Snapshot handed to progress callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub phase: FetchPhase,

    /// Bytes committed to the staging file.
    pub bytes_downloaded: u64,

    /// Size declared by the first response, once known.
    pub total_bytes: Option<u64>,

    /// Reconnects caused by failed reads so far.
    pub reconnects: u32,

    /// Voluntary reconnects taken at the checkpoint.
    pub passive_naps: u32,
}

impl Progress {
    /// Percentage of completion, `None` while the size is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                if self.is_completed() { 100.0 } else { 0.0 }
            } else {
                (self.bytes_downloaded as f64 / total as f64) * 100.0
            }
        })
    }

    #[must_use]
    pub fn is_completed(&self) -> bool { self.phase == FetchPhase::Completed }
}
