use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::future::join_all;
use shelf_config::{Config, SourceConfig};
use shelf_db::{Database, Repository};
use shelf_lookup::error::ErrorKind as LookupErrorKind;
use shelf_lookup::source::{GoogleBooks, Ndl};
use shelf_lookup::{Info, Isbn, SourceHandle, reconcile};
use shelf_storage::backend::LocalBackend;
use shelf_storage::{AssetStore, BackendHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The book catalog.
///
/// Cheap to clone: every clone shares the same connection pool, storage
/// backend and sources.
///
/// A book's record and its cover are written one after the other, not
/// atomically. If the process dies in between, the record is kept without a
/// cover, and putting the ISBN again fetches it.
#[derive(Clone)]
pub struct Catalog {
    sources: Arc<[SourceHandle]>,
    repository: Repository,
    assets: AssetStore,
    lookup_timeout: Duration,
}

impl Catalog {
    /// `sources` are in order of precedence: when two sources know the same
    /// field, the first one wins. Every lookup is abandoned after
    /// `lookup_timeout`.
    pub fn new(
        sources: impl IntoIterator<Item = SourceHandle>,
        repository: Repository,
        assets: AssetStore,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            repository,
            assets,
            lookup_timeout,
        }
    }

    /// Build a catalog from configuration: instantiate the sources, open (and
    /// migrate) the database, and set up cover storage on the local
    /// filesystem. Missing directories are created.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.lookup_timeout();
        let sources = config
            .sources
            .iter()
            .map(|source| Self::source(source, timeout))
            .collect::<Result<Vec<_>>>()?;

        let path = &config.database.path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
        }
        let database = Database::connect(path).await.or_raise(|| ErrorKind::Database)?;

        let backend: BackendHandle =
            Arc::new(LocalBackend::new("covers", &config.assets.path).or_raise(|| ErrorKind::Storage)?);
        let assets = AssetStore::new(backend, &config.assets.url_prefix, timeout).or_raise(|| ErrorKind::Storage)?;

        tracing::debug!(sources = sources.len(), database = %path.display(), "Catalog ready");
        Ok(Self::new(sources, Repository::from(&database), assets, timeout))
    }

    fn source(config: &SourceConfig, timeout: Duration) -> Result<SourceHandle> {
        let source: SourceHandle = match config {
            SourceConfig::Google { api_key, endpoint } => Arc::new(
                GoogleBooks::new(api_key.clone(), endpoint.clone(), timeout).or_raise(|| ErrorKind::Lookup)?,
            ),
            SourceConfig::Ndl { endpoint } => {
                Arc::new(Ndl::new(endpoint.clone(), timeout).or_raise(|| ErrorKind::Lookup)?)
            },
        };
        Ok(source)
    }

    /// Cover storage, for turning image paths into public paths.
    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Look `isbn` up in every source, store the reconciled record and
    /// download its cover.
    ///
    /// Returns the stored record. Its image path is always empty, even when a
    /// cover was stored; read the book back to resolve it.
    ///
    /// Fails with [`NoMetadataFound`](ErrorKind::NoMetadataFound), storing
    /// nothing, if no source knew the book. A cover that could not be
    /// downloaded is logged and otherwise ignored: the record is stored
    /// without one.
    #[instrument(skip(self))]
    pub async fn put(&self, isbn: &str) -> Result<Info> {
        let isbn = Self::parse(isbn)?;
        let mut info = self.lookup(&isbn).await?;

        self.repository.put(&info).await.or_raise(|| ErrorKind::Database)?;
        match &info.image.source {
            Some(source) => match self.assets.put(source, &isbn).await {
                Ok(_) => {},
                Err(err) if err.is_download() => {
                    tracing::warn!(%source, error = ?err, "Failed to download cover; storing book without one");
                    // An older cover would no longer match the record.
                    self.assets.delete(&isbn).await.or_raise(|| ErrorKind::Storage)?;
                },
                Err(err) => return Err(err.raise(ErrorKind::Storage)),
            },
            None => self.assets.delete(&isbn).await.or_raise(|| ErrorKind::Storage)?,
        }

        info.image.path = None;
        Ok(info)
    }

    /// Ask every source concurrently and reconcile the answers in source
    /// order.
    async fn lookup(&self, isbn: &Isbn) -> Result<Info> {
        let lookups = self.sources.iter().map(|source| async move {
            tracing::debug!(source = source.name(), "Looking up book");
            let result = match tokio::time::timeout(self.lookup_timeout, source.get_info(isbn)).await {
                Ok(result) => result,
                Err(elapsed) => Err(exn::Exn::from(elapsed).raise(LookupErrorKind::Timeout)),
            };
            (source.name(), result)
        });
        let results = join_all(lookups).await;

        reconcile(isbn, results).map_err(|err| {
            let kind = match &*err {
                LookupErrorKind::NoMetadataFound(isbn) => ErrorKind::NoMetadataFound(isbn.clone()),
                _ => ErrorKind::Lookup,
            };
            err.raise(kind)
        })
    }

    /// Delete the book and its cover. Deleting a book that isn't in the
    /// catalog is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, isbn: &str) -> Result<()> {
        let isbn = Self::parse(isbn)?;
        self.repository.delete(&isbn).await.or_raise(|| ErrorKind::Database)?;
        self.assets.delete(&isbn).await.or_raise(|| ErrorKind::Storage)
    }

    /// Change the title of a book, leaving everything else as is.
    ///
    /// Fails with [`NotFound`](ErrorKind::NotFound) if the book isn't in the
    /// catalog.
    #[instrument(skip(self))]
    pub async fn rename(&self, isbn: &str, title: &str) -> Result<()> {
        let isbn = Self::parse(isbn)?;
        match self.repository.rename(&isbn, title).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Err(err.raise(ErrorKind::NotFound(isbn))),
            Err(err) => Err(err.raise(ErrorKind::Database)),
        }
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// The book with the given ISBN, with its cover resolved, or `None` if
    /// it isn't in the catalog.
    pub async fn get(&self, isbn: &str) -> Result<Option<Info>> {
        let isbn = Self::parse(isbn)?;
        let mut info = match self.repository.get(&isbn).await {
            Ok(info) => info,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.raise(ErrorKind::Database)),
        };
        info.image.path = self.assets.get(&isbn).await.or_raise(|| ErrorKind::Storage)?;
        Ok(Some(info))
    }

    /// Every book, oldest first, with covers resolved.
    pub async fn get_all(&self) -> Result<Vec<Info>> {
        let books = self.repository.get_all().await.or_raise(|| ErrorKind::Database)?;
        self.resolve_covers(books).await
    }

    /// Every book whose title contains `title` (case-sensitive), oldest
    /// first, with covers resolved. An empty `title` matches every book.
    pub async fn search(&self, title: &str) -> Result<Vec<Info>> {
        let books = self.repository.search(title).await.or_raise(|| ErrorKind::Database)?;
        self.resolve_covers(books).await
    }

    async fn resolve_covers(&self, mut books: Vec<Info>) -> Result<Vec<Info>> {
        if books.is_empty() {
            return Ok(books);
        }
        let mut index = self.assets.index().await.or_raise(|| ErrorKind::Storage)?;
        for book in &mut books {
            book.image.path = index.remove(book.isbn.as_str());
        }
        Ok(books)
    }

    fn parse(isbn: &str) -> Result<Isbn> {
        isbn.parse::<Isbn>().or_raise(|| ErrorKind::InvalidIsbn(isbn.to_string()))
    }
}
