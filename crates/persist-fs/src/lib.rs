//! Staging files and atomic publication.
//!
//! A download is written into a [`StagingFile`] beside its destination and
//! only moved into place by [`StagingFile::publish`] once complete, so the
//! destination path never holds a truncated file.

mod error;
mod publish;
mod space;
mod staging;

pub use error::{Error, Result};
pub use publish::publish;
pub use space::{ensure_space, usable_space};
pub use staging::{StagingFile, StagingOptions};
