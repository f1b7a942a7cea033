//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that the file-removal provider
//! can be unit-tested without touching the real filesystem.  Production
//! code uses [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Abstraction over filesystem queries and removals.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns the immediate child paths inside `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be opened or read as a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Remove the file or directory tree at `path`.
    ///
    /// Calls `std::fs::remove_file` for files/symlinks and
    /// `std::fs::remove_dir_all` for directories.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_all(&self, path: &Path) -> std::io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|e| e.map(|entry| entry.path()).map_err(Into::into))
            .collect()
    }

    fn remove_all(&self, path: &Path) -> std::io::Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// Pre-configure existing paths and directory listings using the
/// builder-style methods, then pass `Arc::new(mock)` wherever a
/// [`FileSystemOps`] is accepted.  Removed paths are recorded and can be
/// inspected with [`removed_paths`](Self::removed_paths).
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    existing: Vec<PathBuf>,
    dirs: std::collections::HashMap<PathBuf, Vec<PathBuf>>,
    fail_removals: Vec<PathBuf>,
    removed: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as existing.
    #[must_use]
    pub fn with_existing(mut self, path: impl Into<PathBuf>) -> Self {
        self.existing.push(path.into());
        self
    }

    /// Configure the listing returned by `read_dir` for `path` (the
    /// entries are also marked as existing).
    #[must_use]
    pub fn with_dir_entries(mut self, path: impl Into<PathBuf>, entries: Vec<PathBuf>) -> Self {
        let dir = path.into();
        self.existing.push(dir.clone());
        self.existing.extend(entries.iter().cloned());
        self.dirs.insert(dir, entries);
        self
    }

    /// Make removal of `path` fail with a permission-denied error.
    #[must_use]
    pub fn with_failing_removal(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_removals.push(path.into());
        self
    }

    /// Return every path passed to `remove_all`, in call order.
    pub fn removed_paths(&self) -> Vec<PathBuf> {
        self.removed
            .lock()
            .map_or_else(|_| vec![], |guard| guard.clone())
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.existing.iter().any(|p| p == path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not a directory: {}", path.display()))
    }

    fn remove_all(&self, path: &Path) -> std::io::Result<()> {
        if self.fail_removals.iter().any(|p| p == path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "access is denied",
            ));
        }
        if let Ok(mut guard) = self.removed.lock() {
            guard.push(path.to_path_buf());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn system_ops_exists_for_temp_dir() {
        let ops = SystemFileSystemOps;
        assert!(ops.exists(&std::env::temp_dir()));
        assert!(!ops.exists(Path::new("/this/path/does/not/exist/12345")));
    }

    #[test]
    fn system_ops_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("victim.txt");
        std::fs::write(&file, "x").unwrap();
        let ops = SystemFileSystemOps;
        ops.remove_all(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn system_ops_remove_dir_tree() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a").join("b");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), "x").unwrap();
        let ops = SystemFileSystemOps;
        ops.remove_all(&dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn mock_ops_records_removals() {
        let ops = MockFileSystemOps::new().with_existing("/tmp/x");
        assert!(ops.exists(Path::new("/tmp/x")));
        ops.remove_all(Path::new("/tmp/x")).unwrap();
        assert_eq!(ops.removed_paths(), vec![PathBuf::from("/tmp/x")]);
    }

    #[test]
    fn mock_ops_failing_removal() {
        let ops = MockFileSystemOps::new().with_failing_removal("/tmp/locked");
        let err = ops.remove_all(Path::new("/tmp/locked")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn mock_ops_dir_entries() {
        let ops = MockFileSystemOps::new()
            .with_dir_entries("/cache", vec![PathBuf::from("/cache/a"), PathBuf::from("/cache/b")]);
        let entries = ops.read_dir(Path::new("/cache")).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(ops.exists(Path::new("/cache/a")));
    }
}
