//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation. Listings come out
/// sorted by path.
///
/// # Examples
///
/// ```
/// use shelf_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("9784091932518.jpeg", b"\xff\xd8\xff")]);
/// backend.delete(Path::new("9784091932518.jpeg")).await?;
/// assert!(backend.list().await?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    fail_writes: bool,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation: broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            fail_writes: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every write fail, as a full or read-only disk would.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Sorted paths of every stored file.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.storage.read().await.keys().cloned().collect()
    }

    /// Contents of a stored file.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path.as_ref()).ok()?;
        self.storage.read().await.get(&path).cloned()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock; never hold it across a yield.
            let entries: Vec<FileInfo> = {
                let guard = self.storage.read().await;
                guard.iter().map(|(path, data)| FileInfo::new(path.clone(), data.len() as u64)).collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        if self.fail_writes {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write() {
        let backend = MockBackend::default();
        backend.write(Path::new("./cover.jpeg"), b"hello").await.unwrap();
        assert_eq!(backend.contents("cover.jpeg").await.unwrap(), b"hello");
        assert_eq!(backend.contents("missing.jpeg").await, None);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let backend = MockBackend::default().with_failing_writes();
        let err = backend.write(Path::new("cover.jpeg"), b"hello").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(backend.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MockBackend::with_files([("cover.jpeg", b"data")]);
        backend.delete(Path::new("cover.jpeg")).await.unwrap();
        assert!(backend.paths().await.is_empty());
        let err = backend.delete(Path::new("cover.jpeg")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let backend = MockBackend::with_files([("b/2", b"bb".as_slice()), ("a/1", b"a".as_slice()), ("b/1", b"c".as_slice())]);
        let all: Vec<_> = backend.list().await.unwrap().into_iter().map(|f| (f.path, f.size)).collect();
        assert_eq!(all, vec![(PathBuf::from("a/1"), 1), ("b/1".into(), 1), ("b/2".into(), 2)]);
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", b"bad")]);
    }
}
