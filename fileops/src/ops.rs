//! Secure file operations: validated, atomic, integrity-verified.
//!
//! Each call is one logical unit of work. The layer guarantees
//! at-most-one-successful-atomic-swap per call; it does not serialize
//! concurrent callers against the same path. Callers needing that must
//! hold an external lock keyed by the resolved path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use scribe_audit::SecurityAuditLog;
use scribe_types::{
    EventKind, IntegrityError, SecurityError, SecurityEvent, SecurityResult, Severity,
    ValidationConfig, ValidationError,
};
use scribe_validate::{
    ContentValidator, PathValidator, PatternCatalog, SanitizeMode, ThreatScanner,
};
use serde_json::json;

use crate::backend::{BackendError, FileBackend};
use crate::integrity::{FileIntegrityRecord, backup_path, temp_path};

/// Per-call options for write and edit.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Replace an existing file. Off by default; a write to an existing
    /// path without it fails with `FileExists`.
    pub overwrite: bool,
    /// Copy the current content to `<path>.backup.<ts>` first.
    /// Best-effort: a backup failure is logged, not fatal.
    pub backup: bool,
}

impl WriteOptions {
    #[must_use]
    pub fn overwriting() -> Self {
        Self {
            overwrite: true,
            backup: false,
        }
    }

    #[must_use]
    pub fn with_backup(mut self) -> Self {
        self.backup = true;
        self
    }
}

/// Timing and volume metadata returned by every operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationReport {
    /// Time spent in path/content validation.
    pub validation: Duration,
    /// Time spent in backend calls and verification.
    pub operation: Duration,
    /// Payload bytes processed.
    pub bytes: usize,
}

/// Successful write result.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// SHA-256 of the content now at the target path.
    pub checksum: String,
    /// Where the previous content was backed up, when requested and
    /// successful.
    pub backup: Option<PathBuf>,
    pub report: OperationReport,
}

/// Successful edit result.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub path: PathBuf,
    pub checksum: String,
    /// Occurrences of the old string that were replaced.
    pub replacements: usize,
    pub report: OperationReport,
}

/// Successful read result.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub path: PathBuf,
    pub content: String,
    pub report: OperationReport,
}

/// Orchestrates path validation, content validation, and the atomic
/// write/edit/read protocol over a host [`FileBackend`].
pub struct SecureFileOperations<B: FileBackend> {
    backend: B,
    paths: PathValidator,
    content: ContentValidator,
    audit: Arc<SecurityAuditLog>,
    call_counter: AtomicU64,
}

impl<B: FileBackend> SecureFileOperations<B> {
    pub fn new(
        backend: B,
        config: Arc<ValidationConfig>,
        catalog: Arc<PatternCatalog>,
        audit: Arc<SecurityAuditLog>,
    ) -> SecurityResult<Self> {
        let paths = PathValidator::new(Arc::clone(&config), Arc::clone(&audit))?;
        let content = ContentValidator::new(config, catalog, Arc::clone(&audit));
        Ok(Self {
            backend,
            paths,
            content,
            audit,
            call_counter: AtomicU64::new(0),
        })
    }

    /// Replace the threat-scan hook used during content validation.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn ThreatScanner>) -> Self {
        self.content = self.content.with_scanner(scanner);
        self
    }

    /// Validate and atomically write `content` to `path`.
    pub fn write(
        &self,
        path: &str,
        content: &str,
        opts: WriteOptions,
    ) -> SecurityResult<WriteOutcome> {
        let started = Instant::now();
        let target = self.paths.resolve(path)?;
        let cleaned = self.content.validate(content, &target)?;
        let validation = started.elapsed();
        let context = file_context(&target);

        let op_started = Instant::now();
        let existing = self.probe(&target, &context)?;
        if existing.is_some() && !opts.overwrite {
            let err = SecurityError::Validation(ValidationError::FileExists);
            self.audit.record(SecurityEvent::new(
                EventKind::WriteRejected,
                err.severity(),
                &context,
                json!({ "tag": "file_exists" }),
            ));
            return Err(err);
        }

        let backup = if opts.backup {
            self.try_backup(&target, existing.as_deref(), &context)
        } else {
            None
        };

        let record = self.write_verified(&target, cleaned.as_bytes(), existing.as_deref(), &context)?;
        let operation = op_started.elapsed();

        self.audit.record(SecurityEvent::new(
            EventKind::FileWritten,
            Severity::Low,
            &context,
            json!({ "bytes": cleaned.len(), "checksum": record.content_hash }),
        ));
        self.audit.record_timing("write", operation);

        Ok(WriteOutcome {
            path: target,
            checksum: record.content_hash,
            backup,
            report: OperationReport {
                validation,
                operation,
                bytes: cleaned.len(),
            },
        })
    }

    /// Replace every occurrence of `old` with `new` in the file at `path`,
    /// through the same atomic protocol as [`write`](Self::write).
    ///
    /// `old` must match the current content verbatim, so it is checked for
    /// length and shape only, never content-filtered. The replacement text
    /// and the resulting document both pass content validation.
    pub fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        opts: WriteOptions,
    ) -> SecurityResult<EditOutcome> {
        let started = Instant::now();
        let target = self.paths.resolve(path)?;
        let context = file_context(&target);

        if old.is_empty() {
            let err = SecurityError::Validation(ValidationError::Empty);
            self.audit.record(SecurityEvent::new(
                EventKind::EditRejected,
                err.severity(),
                &context,
                json!({ "tag": "empty_old_string" }),
            ));
            return Err(err);
        }
        if old.len() > self.content.input().config().max_file_size {
            let err = SecurityError::Validation(ValidationError::FileTooLarge);
            self.audit.record(SecurityEvent::new(
                EventKind::EditRejected,
                err.severity(),
                &context,
                json!({ "tag": "old_string_too_large" }),
            ));
            return Err(err);
        }
        let cleaned_new =
            self.content
                .input()
                .validate_with(new, &context, SanitizeMode::Preserve)?;
        let validation = started.elapsed();

        let op_started = Instant::now();
        let current = match self.backend.read(&target) {
            Ok(bytes) => bytes,
            Err(BackendError::NotFound) => {
                let err = SecurityError::Validation(ValidationError::FileNotFound);
                self.audit.record(SecurityEvent::new(
                    EventKind::EditRejected,
                    err.severity(),
                    &context,
                    json!({ "tag": "file_not_found" }),
                ));
                return Err(err);
            }
            Err(err) => return Err(self.host_io(err, &context)),
        };
        let text = String::from_utf8_lossy(&current).into_owned();

        let replacements = text.matches(old).count();
        if replacements == 0 {
            let err = SecurityError::Validation(ValidationError::StringNotFound);
            self.audit.record(SecurityEvent::new(
                EventKind::EditRejected,
                err.severity(),
                &context,
                json!({ "tag": "string_not_found" }),
            ));
            return Err(err);
        }

        if opts.backup {
            self.try_backup(&target, Some(&current), &context);
        }

        // The spliced document passes full content validation (structural
        // checks included) before anything touches the backend.
        let updated = text.replace(old, &cleaned_new);
        let updated = self.content.validate(&updated, &target)?;
        let record = self.write_verified(&target, updated.as_bytes(), Some(&current), &context)?;

        let final_text = match self.backend.read(&target) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => return Err(self.host_io(err, &context)),
        };
        let old_gone = !final_text.contains(old) || cleaned_new.contains(old);
        let new_present = cleaned_new.is_empty() || final_text.contains(&cleaned_new);
        if !(old_gone && new_present) {
            let err = SecurityError::Integrity(IntegrityError::EditVerifyFailed);
            self.audit.record(SecurityEvent::new(
                EventKind::EditVerifyFailed,
                err.severity(),
                &context,
                json!({ "replacements": replacements }),
            ));
            return Err(err);
        }
        let operation = op_started.elapsed();

        self.audit.record(SecurityEvent::new(
            EventKind::FileEdited,
            Severity::Low,
            &context,
            json!({
                "bytes": updated.len(),
                "checksum": record.content_hash,
                "replacements": replacements,
            }),
        ));
        self.audit.record_timing("edit", operation);

        Ok(EditOutcome {
            path: target,
            checksum: record.content_hash,
            replacements,
            report: OperationReport {
                validation,
                operation,
                bytes: updated.len(),
            },
        })
    }

    /// Read the file at `path`.
    ///
    /// Returned content is rescanned for audit purposes only; a threat
    /// finding on read is logged but never blocks, since refusing to
    /// return already-resident content protects nothing.
    pub fn read(&self, path: &str) -> SecurityResult<ReadOutcome> {
        let started = Instant::now();
        let target = self.paths.resolve(path)?;
        let validation = started.elapsed();
        let context = file_context(&target);

        let op_started = Instant::now();
        let bytes = match self.backend.read(&target) {
            Ok(bytes) => bytes,
            Err(BackendError::NotFound) => {
                let err = SecurityError::Validation(ValidationError::FileNotFound);
                self.audit.record(SecurityEvent::new(
                    EventKind::ReadRejected,
                    err.severity(),
                    &context,
                    json!({ "tag": "file_not_found" }),
                ));
                return Err(err);
            }
            Err(err) => return Err(self.host_io(err, &context)),
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();
        self.content.input().audit_scan(&content, &context);
        let operation = op_started.elapsed();

        self.audit.record(SecurityEvent::new(
            EventKind::FileRead,
            Severity::Low,
            &context,
            json!({ "bytes": bytes.len() }),
        ));
        self.audit.record_timing("read", operation);

        Ok(ReadOutcome {
            path: target,
            content,
            report: OperationReport {
                validation,
                operation,
                bytes: bytes.len(),
            },
        })
    }

    /// The atomic core: temp-write, read back and verify, promote, then
    /// verify the final path. On any verification failure the temp
    /// artifact is removed and the original content (when known) is put
    /// back, so no partial state stays visible at the target.
    fn write_verified(
        &self,
        target: &Path,
        bytes: &[u8],
        previous: Option<&[u8]>,
        context: &str,
    ) -> SecurityResult<FileIntegrityRecord> {
        let record = FileIntegrityRecord::capture(target, bytes);
        let tmp = temp_path(
            target,
            Utc::now().timestamp_millis(),
            self.call_counter.fetch_add(1, Ordering::Relaxed),
        );

        if let Err(err) = self.backend.write(&tmp, bytes) {
            return Err(self.host_io(err, context));
        }
        let verified = match self.backend.read(&tmp) {
            Ok(readback) => record.matches(&readback),
            Err(_) => false,
        };
        if !verified {
            let _ = self.backend.delete(&tmp);
            let err = SecurityError::Integrity(IntegrityError::AtomicVerifyFailed);
            self.audit.record(SecurityEvent::new(
                EventKind::AtomicVerifyFailed,
                err.severity(),
                context,
                json!({ "expected": record.content_hash }),
            ));
            return Err(err);
        }

        if let Err(err) = self.backend.promote(&tmp, target) {
            let _ = self.backend.delete(&tmp);
            return Err(self.host_io(err, context));
        }

        let durable = match self.backend.read(target) {
            Ok(final_bytes) => record.matches(&final_bytes),
            Err(_) => false,
        };
        if !durable {
            if let Some(previous) = previous {
                // Best-effort restore so the target is not left corrupt.
                let _ = self.backend.write(target, previous);
            }
            let err = SecurityError::Integrity(IntegrityError::IntegrityMismatch);
            self.audit.record(SecurityEvent::new(
                EventKind::IntegrityMismatch,
                err.severity(),
                context,
                json!({ "expected": record.content_hash }),
            ));
            return Err(err);
        }

        Ok(record)
    }

    /// Existence probe through the host read primitive.
    fn probe(&self, target: &Path, context: &str) -> SecurityResult<Option<Vec<u8>>> {
        match self.backend.read(target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(BackendError::NotFound) => Ok(None),
            Err(err) => Err(self.host_io(err, context)),
        }
    }

    /// Best-effort backup of the current content.
    fn try_backup(
        &self,
        target: &Path,
        existing: Option<&[u8]>,
        context: &str,
    ) -> Option<PathBuf> {
        let previous = existing?;
        let destination = backup_path(target, Utc::now().timestamp_millis());
        match self.backend.write(&destination, previous) {
            Ok(()) => {
                self.audit.record(SecurityEvent::new(
                    EventKind::BackupCreated,
                    Severity::Low,
                    context,
                    json!({ "backup": destination.display().to_string() }),
                ));
                Some(destination)
            }
            Err(err) => {
                tracing::warn!(context, "backup failed, continuing with write: {err}");
                self.audit.record(SecurityEvent::new(
                    EventKind::BackupFailed,
                    Severity::Medium,
                    context,
                    json!({ "error": err.to_string() }),
                ));
                None
            }
        }
    }

    fn host_io(&self, err: BackendError, context: &str) -> SecurityError {
        let err = SecurityError::HostIo(err.to_string());
        self.audit.record(SecurityEvent::new(
            EventKind::HostIoFailure,
            err.severity(),
            context,
            json!({ "error": err.to_string() }),
        ));
        err
    }
}

fn file_context(target: &Path) -> String {
    format!("file:{}", target.display())
}
