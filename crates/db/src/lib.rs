//! SQLite structured store for catalogued books.
//!
//! This crate is the source of truth for book records. Cover images are
//! *not* stored here, only the URL they were downloaded from; the files
//! themselves live in cover storage (see `shelf-storage`).
//!
//! # Architecture
//! The store keeps two tables:
//! - **books**: one row per ISBN, holding every scalar field of a record.
//! - **authors**: the ordered author list of each book, one row per author.
//!
//! Deletion is soft: rows are flagged as deleted and hidden from every read,
//! and putting the same ISBN again brings the row back.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::Repository;
