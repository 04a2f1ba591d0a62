//! Atomic, integrity-verified file operations.
//!
//! [`SecureFileOperations`] wraps a host-supplied [`FileBackend`] with the
//! path and content validators: no path reaches the backend without
//! passing [`PathValidator`](scribe_validate::PathValidator), and no
//! content reaches a write without passing
//! [`ContentValidator`](scribe_validate::ContentValidator). Writes go
//! through a temp-write / read-back-verify / promote protocol so the
//! visible file at the target path is always either the old content or
//! the fully-verified new content.

mod backend;
mod integrity;
mod ops;

pub use backend::{BackendError, FileBackend, LocalBackend, MemoryBackend};
pub use integrity::{FileIntegrityRecord, content_hash};
pub use ops::{
    EditOutcome, OperationReport, ReadOutcome, SecureFileOperations, WriteOptions, WriteOutcome,
};
