//! The book catalog.
//!
//! [`Catalog`] ties the other crates together: it asks every configured
//! metadata source about an ISBN, reconciles their answers, keeps the
//! result in the record store and the cover in cover storage, and reads
//! both back as one record.

mod catalog;
pub mod error;
mod listing;

pub use crate::catalog::Catalog;
pub use crate::listing::Listing;
