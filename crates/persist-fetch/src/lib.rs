//! Resumable single-file HTTP downloads over unreliable links.
//!
//! A download is one [`TransferSession`]: it streams into a staging file,
//! reconnects from the last committed byte whenever the connection dies,
//! and publishes the file to its destination only once it is complete.
//! Connection failures are retried without limit; only answers that
//! retrying cannot fix, such as a 404 or a resource that changed size,
//! end a session early.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Configuration, progress and session state
//! - [`core`] - Pure decisions: backoff, naps and range reconciliation
//! - [`effects`] - HTTP, control channel and the transfer loop
//!
//! # Example
//!
//! ```no_run
//! use persist_fetch::{Engine, FetchOptions, ReqwestClient, control};
//!
//! # async fn run() -> persist_fetch::Result<()> {
//! let options = FetchOptions::default();
//! let engine = Engine::new(ReqwestClient::new(&options)?, options)?;
//!
//! let (handle, signal) = control();
//! let download = engine.download_with_control("https://example.com/a.iso", "a.iso", signal);
//! handle.pause();
//! handle.resume();
//! let outcome = download.await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use crate::core::{
    ContentRange, Placement, ResponseHead, connect_retry_delay, cooldown, passive_nap,
    range_header, reconcile, reconnect_nap,
};
pub use data::{
    AttemptCounters, DownloadOutcome, FetchOptions, FetchPhase, GIB, KIB, NapOptions, Progress,
    ProxyOptions, Timeouts, TransferSession,
};
pub use effects::{
    BodyStream, BoxStream, Connection, ControlHandle, ControlSignal, ControlState, Engine,
    HttpClient, ReadFailure, TransferState, control,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, Result, TransportError, TransportErrorKind};
