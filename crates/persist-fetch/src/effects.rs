//! I/O: the HTTP seam, the control channel and the transfer loop.
//!
//! Every sleep and every network await in a session goes through a
//! [`ControlSignal`], so pause and cancel are observed within one chunk.

mod acquire;
mod control;
mod engine;
mod http;
mod reader;
mod transfer;

pub use control::{ControlHandle, ControlSignal, ControlState, control};
pub use engine::Engine;
pub use http::{BodyStream, BoxStream, Connection, HttpClient};
pub use transfer::{ReadFailure, TransferState};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
