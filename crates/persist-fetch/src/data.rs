//! Configuration, progress and session types.
//!
//! Everything here is plain data; the transfer loop is the only code that
//! mutates a [`TransferSession`].

pub mod options;
pub mod progress;
pub mod session;

pub use options::{FetchOptions, GIB, KIB, NapOptions, ProxyOptions, Timeouts};
pub use progress::{FetchPhase, Progress};
pub use session::{AttemptCounters, DownloadOutcome, TransferSession};
