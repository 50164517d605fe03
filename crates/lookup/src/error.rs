//! Lookup Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::models::Isbn;
use derive_more::{Display, Error};

/// A lookup error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input does not look like an ISBN-10 or ISBN-13.
    #[display("invalid ISBN: {_0:?}")]
    InvalidIsbn(#[error(not(source))] String),
    /// The source answered, but does not know the book.
    #[display("book not found")]
    NotFound,
    /// Every configured source failed for this ISBN.
    #[display("no metadata found for ISBN {_0}")]
    NoMetadataFound(#[error(not(source))] Isbn),
    /// Connection-level failure talking to a provider.
    #[display("network error")]
    Network,
    /// The provider did not answer before the deadline.
    #[display("request timed out")]
    Timeout,
    /// The provider answered with a non-2xx status.
    #[display("unexpected HTTP status {_0}")]
    BadStatus(#[error(not(source))] u16),
    /// The provider answered with a body we could not decode.
    #[display("invalid response from provider")]
    InvalidResponse,
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ErrorKind {
    /// Convert an HTTP client error into a lookup error, keeping the
    /// original `reqwest` error as a child in the error tree.
    #[track_caller]
    pub fn http(err: reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse
        } else {
            Self::Network
        };
        exn::Exn::from(err).raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Timeout => true,
            Self::BadStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
