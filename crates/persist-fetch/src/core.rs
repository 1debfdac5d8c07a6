//! Pure decisions: how long to wait, whether to nap, and whether a response
//! lines up with what is already on disk. Nothing here performs I/O; the
//! random source is always passed in.

mod backoff;
mod nap;
mod range;

pub use backoff::cooldown;
pub use nap::{connect_retry_delay, passive_nap, reconnect_nap};
pub use range::{ContentRange, Placement, ResponseHead, range_header, reconcile};
