//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the lookup, database
//! and storage crates are kept as children of these.

use derive_more::{Display, Error};
use shelf_lookup::Isbn;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a catalog failure.
///
/// ### Caller Errors
/// - [`ErrorKind::InvalidIsbn`]
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::NoMetadataFound`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Lookup`]
/// - [`ErrorKind::Database`]
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The input does not look like an ISBN-10 or ISBN-13. Nothing was
    /// looked up or stored.
    #[display("invalid ISBN: {_0:?}")]
    InvalidIsbn(#[error(not(source))] String),
    /// There is no live record for the ISBN.
    #[display("book not found: {_0}")]
    NotFound(#[error(not(source))] Isbn),
    /// Every metadata source failed for the ISBN. Nothing was stored.
    #[display("no metadata found for ISBN {_0}")]
    NoMetadataFound(#[error(not(source))] Isbn),
    /// A metadata source could not be set up.
    #[display("metadata lookup error")]
    Lookup,
    /// The record store failed.
    #[display("database error")]
    Database,
    /// Cover storage failed. A record written just before is kept.
    #[display("cover storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoMetadataFound(_) | Self::Storage => true,
            Self::InvalidIsbn(_) | Self::NotFound(_) | Self::Lookup | Self::Database => false,
        }
    }
}
