//! Content hashing and artifact naming for the atomic write protocol.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 of the content, lowercase hex.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hash of a file's intended content, captured before the write and
/// consumed by the read-back and post-promotion verification steps.
/// Transient: never persisted across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIntegrityRecord {
    pub path: PathBuf,
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl FileIntegrityRecord {
    #[must_use]
    pub fn capture(path: &Path, bytes: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            content_hash: content_hash(bytes),
            timestamp: Utc::now(),
        }
    }

    /// Whether `bytes` hash to the captured checksum.
    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        content_hash(bytes) == self.content_hash
    }
}

/// Temp artifact name for an in-flight write. The timestamp plus call
/// counter keeps concurrent calls on the same target from colliding.
#[must_use]
pub(crate) fn temp_path(target: &Path, timestamp_ms: i64, call: u64) -> PathBuf {
    PathBuf::from(format!("{}.tmp.{timestamp_ms}.{call}", target.display()))
}

/// Backup name for the pre-write content of `target`.
#[must_use]
pub(crate) fn backup_path(target: &Path, timestamp_ms: i64) -> PathBuf {
    PathBuf::from(format!("{}.backup.{timestamp_ms}", target.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_hex() {
        let hash = content_hash(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash(b"hello"));
        assert_ne!(hash, content_hash(b"hello!"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn record_matches_only_identical_bytes() {
        let record = FileIntegrityRecord::capture(Path::new("/ws/a.md"), b"content");
        assert!(record.matches(b"content"));
        assert!(!record.matches(b"Content"));
        assert!(!record.matches(b""));
    }

    #[test]
    fn artifact_names_embed_target_and_discriminators() {
        let target = Path::new("/ws/docs/PRD.md");
        assert_eq!(
            temp_path(target, 1700000000123, 7),
            PathBuf::from("/ws/docs/PRD.md.tmp.1700000000123.7")
        );
        assert_eq!(
            backup_path(target, 1700000000123),
            PathBuf::from("/ws/docs/PRD.md.backup.1700000000123")
        );
    }

    #[test]
    fn concurrent_calls_get_distinct_temp_names() {
        let target = Path::new("/ws/a.md");
        let a = temp_path(target, 1000, 0);
        let b = temp_path(target, 1000, 1);
        assert_ne!(a, b);
    }
}
