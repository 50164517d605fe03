//! Repository for book records and their authors.
//!
//! A book and its author list are written and deleted as a unit: every
//! write touching both tables runs in a single transaction.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::BookRow;
use exn::ResultExt;
use shelf_lookup::models::{Info, Isbn};
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::instrument;

/// Repository for managing book records in the store.
///
/// # Soft Deletion
///
/// [`delete`](Self::delete) only flags rows. Flagged rows are invisible to
/// every read and to [`rename`](Self::rename), and a later
/// [`put`](Self::put) of the same ISBN overwrites and revives them.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            dry_run: false,
        }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In `dry_run` mode writes are logged and skipped, reads are untouched.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    fn now() -> i64 {
        UtcDateTime::now().unix_timestamp()
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Insert or overwrite the record for `info.isbn`.
    ///
    /// Every field is replaced, the author list included, and a soft-deleted
    /// record is revived. The creation time of an existing record is kept.
    #[instrument(skip_all, fields(isbn = %info.isbn))]
    pub async fn put(&self, info: &Info) -> Result<()> {
        if self.dry_run {
            tracing::info!(title = %info.title, "Skipping book write during dry run");
            return Ok(());
        }
        let row = BookRow::try_from(info)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/upsert_book.sql"))
            .bind(&row.isbn)
            .bind(row.title)
            .bind(row.description)
            .bind(row.published)
            .bind(row.language)
            .bind(row.image_source)
            .bind(Self::now())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/delete_authors.sql"))
            .bind(&row.isbn)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for (position, name) in info.authors.iter().enumerate() {
            let position = i64::try_from(position).or_raise(|| ErrorKind::InvalidData("author position"))?;
            sqlx::query(include_str!("../queries/insert_author.sql"))
                .bind(&row.isbn)
                .bind(position)
                .bind(name)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::info!(title = %info.title, authors = info.authors.len(), "Stored book");
        Ok(())
    }

    /// Soft-delete the record for `isbn`.
    ///
    /// Deleting an unknown or already deleted ISBN is not an error.
    #[instrument(skip(self), fields(isbn = %isbn))]
    pub async fn delete(&self, isbn: &Isbn) -> Result<()> {
        if self.dry_run {
            tracing::info!("Skipping book delete during dry run");
            return Ok(());
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let deleted = sqlx::query(include_str!("../queries/soft_delete_book.sql"))
            .bind(isbn.as_str())
            .bind(Self::now())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        sqlx::query(include_str!("../queries/soft_delete_authors.sql"))
            .bind(isbn.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        match deleted {
            0 => tracing::debug!("No live book to delete"),
            _ => tracing::info!("Deleted book"),
        }
        Ok(())
    }

    /// Change the title of a live record, leaving every other field as is.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if there is no live record
    /// for `isbn`.
    #[instrument(skip(self), fields(isbn = %isbn))]
    pub async fn rename(&self, isbn: &Isbn, title: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!("Skipping book rename during dry run");
            return Ok(());
        }
        let renamed = sqlx::query(include_str!("../queries/rename_book.sql"))
            .bind(isbn.as_str())
            .bind(title)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if renamed == 0 {
            exn::bail!(ErrorKind::NotFound(isbn.clone()));
        }
        tracing::info!("Renamed book");
        Ok(())
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Get the live record for `isbn`.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if it was never stored or
    /// has been deleted. The returned record has no image path.
    pub async fn get(&self, isbn: &Isbn) -> Result<Info> {
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_book.sql"))
            .bind(isbn.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::NotFound(isbn.clone())),
        }
    }

    /// List every live record, oldest first.
    pub async fn get_all(&self) -> Result<Vec<Info>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/list_books.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Info::try_from).collect()
    }

    /// List every live record whose title contains `title`, oldest first.
    ///
    /// Matching is case-sensitive and literal (`%` and `_` have no special
    /// meaning). An empty `title` matches every record.
    pub async fn search(&self, title: &str) -> Result<Vec<Info>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/search_books.sql"))
            .bind(title)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Info::try_from).collect()
    }
}
