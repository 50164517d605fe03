//! Local filesystem storage backend.
//!
//! Files are stored under a configured directory and accessed through
//! `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, DirEntry};

/// Prefix of in-flight temporary files; they are hidden from listings.
const PARTIAL_PREFIX: &str = ".partial-";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory, which is created
/// if it doesn't exist yet.
///
/// # Examples
///
/// ```no_run
/// use shelf_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("covers", "/var/lib/shelf/images")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at the absolute path
    /// `root`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Happens once on start-up; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", absolute.display(), self.root.display()))
        })?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn is_partial(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(PARTIAL_PREFIX))
    }

    /// Sibling of `target` to write into before renaming over it.
    fn partial_path(target: &Path) -> PathBuf {
        let name = target.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        let unique = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        target.with_file_name(format!("{PARTIAL_PREFIX}{}-{unique}-{name}", std::process::id()))
    }

    /// Errors can't be `?`-ed inside the listing stream, so each directory
    /// entry is classified here instead.
    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            // Deleted or renamed over since the directory was read.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WalkEntry::Skip),
            Err(e) => exn::bail!(Self::map_io_error(e, &path)),
        };
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        let relative = self.relative_path(&path)?;
        if metadata.is_file() && !Self::is_partial(&relative) {
            return Ok(WalkEntry::File(FileInfo::new(relative, metadata.len())));
        }
        // Broken symlinks and in-flight writes.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        // The directory itself went away mid-listing.
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue 'dirs,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'dirs; },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let partial = Self::partial_path(&abs_path);
        if let Err(e) = fs::write(&partial, data).await {
            return Err(exn::Exn::from(Self::map_io_error(e, path)));
        }
        if let Err(e) = fs::rename(&partial, &abs_path).await {
            _ = fs::remove_file(&partial).await;
            return Err(exn::Exn::from(Self::map_io_error(e, path)));
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("covers", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("covers", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("covers", "relative/path").is_err());
        assert!(LocalBackend::new("covers", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("data/images");
        LocalBackend::new("covers", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, b"data").unwrap();
        assert!(LocalBackend::new("covers", &file).is_err());
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("9784091932518.jpeg");
        assert_eq!(backend.absolute_path("9784091932518.jpeg").unwrap(), expected);
        assert!(backend.absolute_path("../etc/passwd").is_err());
        assert_eq!(backend.relative_path(&expected).unwrap(), Path::new("9784091932518.jpeg"));
        assert!(backend.relative_path("/other/file.jpeg").is_err());
    }

    #[tokio::test]
    async fn test_write() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("./cover.png"), b"\x89PNG").await.unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("cover.png")).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_partials() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("a/b/cover.png"), b"first").await.unwrap();
        backend.write(Path::new("a/b/cover.png"), b"second").await.unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("a/b/cover.png")).unwrap(), b"second");
        let on_disk: Vec<_> = std::fs::read_dir(temp_dir.path().join("a/b")).unwrap().collect();
        assert_eq!(on_disk.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("file.jpeg"), b"data").await.unwrap();
        backend.delete(Path::new("file.jpeg")).await.unwrap();
        assert!(!temp_dir.path().join("file.jpeg").exists());
        let err = backend.delete(Path::new("file.jpeg")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list() {
        let (temp_dir, backend) = backend();
        assert!(backend.list().await.unwrap().is_empty());
        backend.write(Path::new("one.jpeg"), b"1").await.unwrap();
        backend.write(Path::new("two"), b"22").await.unwrap();
        backend.write(Path::new("nested/three.png"), b"333").await.unwrap();
        // Leftover from an interrupted write.
        std::fs::write(temp_dir.path().join(".partial-1-0-four.png"), b"4").unwrap();
        let mut files = backend.list().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let listed: Vec<_> = files.iter().map(|f| (f.path.to_str().unwrap(), f.size)).collect();
        assert_eq!(listed, vec![("nested/three.png", 3), ("one.jpeg", 1), ("two", 2)]);
        assert_eq!(files[1].stem(), Some("one"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_list_during_writes_and_deletes() {
        let (_temp_dir, backend) = backend();
        let backend = Arc::new(backend);
        backend.write(Path::new("9784091932518.jpeg"), b"kept").await.unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let churn = tokio::spawn({
            let backend = Arc::clone(&backend);
            let stop = Arc::clone(&stop);
            async move {
                while !stop.load(Ordering::Relaxed) {
                    for path in ["9781111111111.png", "nested/9782222222222.webp"] {
                        backend.write(Path::new(path), b"churn").await.unwrap();
                        backend.delete(Path::new(path)).await.unwrap();
                    }
                    _ = std::fs::remove_dir(backend.root.join("nested"));
                }
            }
        });

        for _ in 0..200 {
            let files = backend.list().await.unwrap();
            assert!(files.iter().any(|f| f.path == Path::new("9784091932518.jpeg")));
        }
        stop.store(true, Ordering::Relaxed);
        churn.await.unwrap();
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.write(Path::new("../escape"), b"data").await.is_err());
        assert!(backend.delete(Path::new("../../file")).await.is_err());
    }
}
