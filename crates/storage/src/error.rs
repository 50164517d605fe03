//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// Could not reach the server an asset is downloaded from.
    #[display("network error")]
    Network,
    /// The asset download did not finish before the deadline.
    #[display("download timed out")]
    Timeout,
    /// The server an asset is downloaded from answered with a non-2xx status.
    #[display("unexpected HTTP status {_0}")]
    BadStatus(#[error(not(source))] u16),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Convert an HTTP client error into a storage error, keeping the
    /// original `reqwest` error as a child in the error tree.
    #[track_caller]
    pub fn http(err: reqwest::Error) -> Error {
        let kind = match err.is_timeout() {
            true => Self::Timeout,
            false => Self::Network,
        };
        exn::Exn::from(err).raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Network | Self::Timeout | Self::BackendError(_) => true,
            Self::BadStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the failure happened while *downloading* an asset,
    /// as opposed to storing it.
    pub fn is_download(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::BadStatus(_))
    }
}
