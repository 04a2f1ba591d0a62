//! Audit event model.
//!
//! Events are append-only records owned by the audit log; they are never
//! mutated after creation. Details carry structured JSON so downstream
//! sinks can index them, but they must only ever contain lengths, tags,
//! checksums, and truncated already-sanitized samples, never raw input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity classification for audit events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// What happened. One variant per observable outcome in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InputAccepted,
    InputRejected,
    InputSanitized,
    ThreatDetected,
    ScanFailure,
    PathResolved,
    PathRejected,
    ContentRejected,
    WriteRejected,
    EditRejected,
    ReadRejected,
    HostIoFailure,
    FileWritten,
    FileEdited,
    FileRead,
    BackupCreated,
    BackupFailed,
    AtomicVerifyFailed,
    IntegrityMismatch,
    EditVerifyFailed,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::InputAccepted => "input_accepted",
            EventKind::InputRejected => "input_rejected",
            EventKind::InputSanitized => "input_sanitized",
            EventKind::ThreatDetected => "threat_detected",
            EventKind::ScanFailure => "scan_failure",
            EventKind::PathResolved => "path_resolved",
            EventKind::PathRejected => "path_rejected",
            EventKind::ContentRejected => "content_rejected",
            EventKind::WriteRejected => "write_rejected",
            EventKind::EditRejected => "edit_rejected",
            EventKind::ReadRejected => "read_rejected",
            EventKind::HostIoFailure => "host_io_failure",
            EventKind::FileWritten => "file_written",
            EventKind::FileEdited => "file_edited",
            EventKind::FileRead => "file_read",
            EventKind::BackupCreated => "backup_created",
            EventKind::BackupFailed => "backup_failed",
            EventKind::AtomicVerifyFailed => "atomic_verify_failed",
            EventKind::IntegrityMismatch => "integrity_mismatch",
            EventKind::EditVerifyFailed => "edit_verify_failed",
        }
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: EventKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Free-form caller label ("idea", "file:docs/PRD.md"). Used for audit
    /// correlation only, never for authorization decisions.
    pub context: String,
    /// Structured details: tags, lengths, checksums, truncated samples.
    pub details: serde_json::Value,
}

impl SecurityEvent {
    #[must_use]
    pub fn new(
        kind: EventKind,
        severity: Severity,
        context: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            severity,
            timestamp: Utc::now(),
            context: context.into(),
            details,
        }
    }
}

/// Truncate a sample for audit details without splitting a char boundary.
#[must_use]
pub fn truncate_sample(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}…")
}
