//! Cover image storage.
//!
//! Covers are stored flat, one file per book, named after the ISBN with an
//! extension derived from the `Content-Type` the image was served with:
//! `9784091932518.jpeg`, `4091932518.png`, or a bare `9784091932518` when the
//! type wasn't recognised. A book has at most one cover.

use crate::BackendHandle;
use crate::error::{ErrorKind, Result};
use reqwest::header::CONTENT_TYPE;
use shelf_lookup::Isbn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Downloads, locates and removes cover images.
#[derive(Clone)]
pub struct AssetStore {
    backend: BackendHandle,
    client: reqwest::Client,
    url_prefix: String,
}

impl AssetStore {
    /// `url_prefix` is where the storage root is served from (for example
    /// `/images`); see [`public_path`](Self::public_path). `timeout` bounds
    /// each download.
    pub fn new(backend: BackendHandle, url_prefix: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ErrorKind::http)?;
        Ok(Self {
            backend,
            client,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        })
    }

    /// Download the cover at `source` and store it as the cover of `isbn`,
    /// replacing any previous cover. Returns the stored path.
    ///
    /// Download failures are reported as [`Network`](ErrorKind::Network),
    /// [`Timeout`](ErrorKind::Timeout) or [`BadStatus`](ErrorKind::BadStatus)
    /// (see [`ErrorKind::is_download`]), anything else is a storage failure.
    #[instrument(skip(self), fields(isbn = %isbn, source = %source))]
    pub async fn put(&self, source: &Url, isbn: &Isbn) -> Result<PathBuf> {
        let response = self.client.get(source.clone()).send().await.map_err(ErrorKind::http)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::BadStatus(status.as_u16()));
        }
        let extension = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or("", extension_for);
        let data = response.bytes().await.map_err(ErrorKind::http)?;

        let path = PathBuf::from(format!("{isbn}{extension}"));
        self.backend.write(&path, &data).await?;
        for stale in self.find(isbn).await?.into_iter().filter(|stale| *stale != path) {
            self.remove(&stale).await?;
        }
        tracing::info!(path = %path.display(), bytes = data.len(), "Stored cover");
        Ok(path)
    }

    /// Path of the cover of `isbn`, if one is stored.
    pub async fn get(&self, isbn: &Isbn) -> Result<Option<PathBuf>> {
        Ok(self.find(isbn).await?.into_iter().next())
    }

    /// Every stored cover keyed by the file stem, for resolving many books
    /// with a single listing. Agrees with [`get`](Self::get) when a book has
    /// more than one cover.
    pub async fn index(&self) -> Result<HashMap<String, PathBuf>> {
        let mut files = self.backend.list().await?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let mut index = HashMap::with_capacity(files.len());
        for file in files {
            if let Some(stem) = file.stem().map(str::to_owned) {
                index.entry(stem).or_insert(file.path);
            }
        }
        Ok(index)
    }

    /// Remove every stored cover of `isbn`. Removing nothing is not an error.
    #[instrument(skip(self), fields(isbn = %isbn))]
    pub async fn delete(&self, isbn: &Isbn) -> Result<()> {
        for path in self.find(isbn).await? {
            self.remove(&path).await?;
            tracing::info!(path = %path.display(), "Deleted cover");
        }
        Ok(())
    }

    /// Path the stored file at `path` is served under.
    ///
    /// ```
    /// # use shelf_storage::{AssetStore, backend::LocalBackend};
    /// # use std::{path::Path, sync::Arc, time::Duration};
    /// # let dir = std::env::temp_dir().join("shelf-doctest-public-path");
    /// # let backend = Arc::new(LocalBackend::new("covers", &dir).unwrap());
    /// let assets = AssetStore::new(backend, "/images/", Duration::from_secs(5)).unwrap();
    /// assert_eq!(assets.public_path(Path::new("9784091932518.jpeg")), "/images/9784091932518.jpeg");
    /// ```
    pub fn public_path(&self, path: &Path) -> String {
        format!("{}/{}", self.url_prefix, path.to_string_lossy())
    }

    /// Every stored file whose name, minus extension, is the ISBN. Sorted,
    /// so that lookups are deterministic even if a crash left two behind.
    async fn find(&self, isbn: &Isbn) -> Result<Vec<PathBuf>> {
        let mut found: Vec<PathBuf> = self
            .backend
            .list()
            .await?
            .into_iter()
            .filter(|file| file.stem() == Some(isbn.as_str()))
            .map(|file| file.path)
            .collect();
        found.sort();
        Ok(found)
    }

    /// Delete a file, tolerating it having disappeared in the meantime.
    async fn remove(&self, path: &Path) -> Result<()> {
        match self.backend.delete(path).await {
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(()),
            result => result,
        }
    }
}

/// File extension (with the dot) for a `Content-Type` header value.
fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" => ".jpeg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::backend::StorageBackend;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISBN: &str = "9784091932518";

    fn isbn() -> Isbn {
        ISBN.parse().unwrap()
    }

    fn store() -> (tempfile::TempDir, Arc<LocalBackend>, AssetStore) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("covers", dir.path()).unwrap());
        let assets = AssetStore::new(backend.clone(), "/images", Duration::from_secs(5)).unwrap();
        (dir, backend, assets)
    }

    async fn serve(server: &MockServer, route: &str, content_type: &str, body: &[u8]) -> Url {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
            .mount(server)
            .await;
        Url::parse(&format!("{}{route}", server.uri())).unwrap()
    }

    #[rstest]
    #[case("image/jpeg", ".jpeg")]
    #[case("image/png", ".png")]
    #[case("image/webp", ".webp")]
    #[case("IMAGE/PNG; charset=binary", ".png")]
    #[case("image/gif", "")]
    #[case("text/html", "")]
    #[case("", "")]
    fn test_extension_for(#[case] content_type: &str, #[case] expected: &str) {
        assert_eq!(extension_for(content_type), expected);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let server = MockServer::start().await;
        let (dir, _backend, assets) = store();
        let source = serve(&server, "/cover", "image/jpeg", b"\xff\xd8\xff").await;

        let stored = assets.put(&source, &isbn()).await.unwrap();
        assert_eq!(stored, PathBuf::from("9784091932518.jpeg"));
        assert_eq!(std::fs::read(dir.path().join(&stored)).unwrap(), b"\xff\xd8\xff");
        assert_eq!(assets.get(&isbn()).await.unwrap(), Some(stored.clone()));
        assert_eq!(assets.public_path(&stored), "/images/9784091932518.jpeg");
    }

    #[tokio::test]
    async fn test_unknown_content_type_has_no_extension() {
        let server = MockServer::start().await;
        let (_dir, _backend, assets) = store();
        let source = serve(&server, "/cover.gif", "image/gif", b"GIF89a").await;
        assert_eq!(assets.put(&source, &isbn()).await.unwrap(), PathBuf::from(ISBN));
        assert_eq!(assets.get(&isbn()).await.unwrap(), Some(PathBuf::from(ISBN)));
    }

    #[tokio::test]
    async fn test_put_replaces_other_formats() {
        let server = MockServer::start().await;
        let (_dir, backend, assets) = store();
        backend.write(Path::new("9784091932518.png"), b"old").await.unwrap();
        backend.write(Path::new("4091932518.png"), b"other book").await.unwrap();
        let source = serve(&server, "/cover", "image/webp", b"RIFF").await;

        assets.put(&source, &isbn()).await.unwrap();
        let mut paths: Vec<_> = backend.list().await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("4091932518.png"), "9784091932518.webp".into()]);
    }

    #[tokio::test]
    async fn test_get_does_not_match_substrings() {
        let (_dir, backend, assets) = store();
        backend.write(Path::new("99784091932518.jpeg"), b"x").await.unwrap();
        backend.write(Path::new("9784091932518-old.jpeg"), b"x").await.unwrap();
        assert_eq!(assets.get(&isbn()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_download_failures() {
        let server = MockServer::start().await;
        let (_dir, backend, assets) = store();
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let source = Url::parse(&format!("{}/missing", server.uri())).unwrap();

        let err = assets.put(&source, &isbn()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BadStatus(404)));
        assert!(err.is_download());
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("covers", dir.path()).unwrap());
        let assets = AssetStore::new(backend, "/images", Duration::from_millis(100)).unwrap();
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let source = Url::parse(&format!("{}/slow", server.uri())).unwrap();

        let err = assets.put(&source, &isbn()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_index_matches_get() {
        let (_dir, backend, assets) = store();
        backend.write(Path::new("9784091932518.png"), b"x").await.unwrap();
        backend.write(Path::new("9784091932518.jpeg"), b"x").await.unwrap();
        backend.write(Path::new("4091932518"), b"x").await.unwrap();

        let index = assets.index().await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(ISBN), assets.get(&isbn()).await.unwrap().as_ref());
        assert_eq!(index.get("4091932518"), Some(&PathBuf::from("4091932518")));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, backend, assets) = store();
        backend.write(Path::new("9784091932518.jpeg"), b"x").await.unwrap();
        assets.delete(&isbn()).await.unwrap();
        assert_eq!(assets.get(&isbn()).await.unwrap(), None);
        assets.delete(&isbn()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lookups_during_other_writes() {
        let (_dir, backend, assets) = store();
        backend.write(Path::new("9784091932518.jpeg"), b"x").await.unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let churn = tokio::spawn({
            let backend = backend.clone();
            let stop = stop.clone();
            async move {
                while !stop.load(Ordering::Relaxed) {
                    for name in ["9781111111111.png", "9781111111111.jpeg"] {
                        backend.write(Path::new(name), b"other").await.unwrap();
                        backend.delete(Path::new(name)).await.unwrap();
                    }
                }
            }
        });

        let expected = PathBuf::from("9784091932518.jpeg");
        for _ in 0..200 {
            assert_eq!(assets.get(&isbn()).await.unwrap(), Some(expected.clone()));
            assert_eq!(assets.index().await.unwrap().get(ISBN), Some(&expected));
        }
        stop.store(true, Ordering::Relaxed);
        churn.await.unwrap();
    }
}
