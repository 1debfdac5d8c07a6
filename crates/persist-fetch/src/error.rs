//! Error types for persist-fetch.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS lookup, refused or reset connection before a response arrived.
    Connect,
    /// Connect or read timeout.
    Timeout,
    /// The response body broke off mid-stream.
    Body,
    /// The request could not be built at all (malformed URL, bad header).
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect error"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Body => write!(f, "body error"),
            TransportErrorKind::Request => write!(f, "request error"),
        }
    }
}

/// A failure reported by an [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind:    TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn body(message: impl Into<String>) -> Self { Self::new(TransportErrorKind::Body, message) }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Request, message)
    }

    /// Failures that retrying the same request can fix.
    pub fn is_transient(&self) -> bool { self.kind != TransportErrorKind::Request }
}

/// Terminal failures of a download session.
///
/// Transient transport problems never show up here; the engine retries them.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request to {url} failed")]
    Request {
        url:    String,
        #[source]
        source: TransportError,
    },

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("server did not declare a Content-Length for {url}")]
    MissingContentLength { url: String },

    #[error("remote size changed: expected {expected} bytes, server now implies {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("server resumed at byte {start}, past the requested offset {requested}")]
    RangeGap { requested: u64, start: u64 },

    #[error("invalid Content-Range header: {0}")]
    InvalidContentRange(String),

    #[error("destination is a directory: {}", .0.display())]
    DestinationIsDirectory(PathBuf),

    #[error("staging file error")]
    Staging(#[from] persist_fs::Error),

    #[error("download cancelled after {bytes_written} bytes, partial data kept at {}", staging.display())]
    Cancelled { staging: PathBuf, bytes_written: u64 },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    /// Returns `true` when the session ended because the caller asked it to.
    pub fn is_cancelled(&self) -> bool { matches!(self, FetchError::Cancelled { .. }) }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::timeout("read timed out");
        assert_eq!(err.to_string(), "timeout: read timed out");
    }

    #[test]
    fn test_only_request_errors_are_permanent() {
        assert!(TransportError::connect("refused").is_transient());
        assert!(TransportError::timeout("slow").is_transient());
        assert!(TransportError::body("reset").is_transient());
        assert!(!TransportError::request("relative URL").is_transient());
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = FetchError::SizeMismatch {
            expected: 1000,
            actual: 1200,
        };
        assert_eq!(
            err.to_string(),
            "remote size changed: expected 1000 bytes, server now implies 1200"
        );
    }
}
