//! Host file primitive abstraction.
//!
//! The trust boundary consumes three primitives: read, write, delete. They
//! are workspace-unaware and may fail for ordinary I/O reasons distinct
//! from validation failures. The `promote` step of the atomic write
//! protocol has a copy+delete default (the strongest guarantee a plain
//! read/write/delete host can offer); backends with real filesystem
//! access override it with a rename.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Failure from a host primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("file not found")]
    NotFound,
    #[error("{0}")]
    Io(String),
}

impl From<io::Error> for BackendError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            BackendError::NotFound
        } else {
            BackendError::Io(err.to_string())
        }
    }
}

/// The file primitives [`SecureFileOperations`](crate::SecureFileOperations)
/// is built on.
pub trait FileBackend: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BackendError>;
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BackendError>;
    fn delete(&self, path: &Path) -> Result<(), BackendError>;

    /// Move `from` over `to`, replacing it.
    ///
    /// The default is copy+delete, which is not crash-atomic; backends
    /// that can rename should override.
    fn promote(&self, from: &Path, to: &Path) -> Result<(), BackendError> {
        let bytes = self.read(from)?;
        self.write(to, &bytes)?;
        self.delete(from)
    }
}

/// Local filesystem backend. Parent directories are created on write so
/// the document pipeline can lay out its tree in one pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl FileBackend for LocalBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        Ok(std::fs::read(path)?)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, bytes)?)
    }

    fn delete(&self, path: &Path) -> Result<(), BackendError> {
        Ok(std::fs::remove_file(path)?)
    }

    /// Rename-based promotion: atomic on the same filesystem, a strictly
    /// stronger guarantee than the copy+delete default.
    fn promote(&self, from: &Path, to: &Path) -> Result<(), BackendError> {
        Ok(std::fs::rename(from, to)?)
    }
}

/// In-memory backend for deterministic tests of the atomic-write protocol
/// without disk access.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content of a stored file, if any.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// All stored paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl FileBackend for MemoryBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), BackendError> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(path)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_round_trips() {
        let backend = MemoryBackend::new();
        let path = Path::new("/ws/a.txt");
        assert_eq!(backend.read(path), Err(BackendError::NotFound));

        backend.write(path, b"hello").unwrap();
        assert_eq!(backend.read(path).unwrap(), b"hello");

        backend.delete(path).unwrap();
        assert_eq!(backend.read(path), Err(BackendError::NotFound));
    }

    #[test]
    fn default_promote_is_copy_then_delete() {
        let backend = MemoryBackend::new();
        let tmp = Path::new("/ws/a.txt.tmp.1.0");
        let target = Path::new("/ws/a.txt");

        backend.write(tmp, b"new").unwrap();
        backend.write(target, b"old").unwrap();
        backend.promote(tmp, target).unwrap();

        assert_eq!(backend.read(target).unwrap(), b"new");
        assert_eq!(backend.read(tmp), Err(BackendError::NotFound));
    }

    #[test]
    fn local_backend_promote_renames() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend;
        let tmp = dir.path().join("file.md.tmp.1.0");
        let target = dir.path().join("file.md");

        backend.write(&tmp, b"content").unwrap();
        backend.promote(&tmp, &target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"content");
        assert!(!tmp.exists());
    }

    #[test]
    fn local_backend_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend;
        let nested = dir.path().join("docs/adr/0001.md");

        backend.write(&nested, b"# ADR").unwrap();
        assert_eq!(std::fs::read(&nested).unwrap(), b"# ADR");
    }

    #[test]
    fn io_error_kinds_map_to_backend_errors() {
        let backend = LocalBackend;
        let missing = Path::new("/definitely/not/present/file.md");
        assert_eq!(backend.read(missing), Err(BackendError::NotFound));
        assert_eq!(backend.delete(missing), Err(BackendError::NotFound));
    }
}
