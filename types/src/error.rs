//! Error taxonomy for the trust boundary.
//!
//! Expected rejections (bad input, hostile paths, threat findings) are
//! values, not panics: every validator returns [`SecurityResult`] and
//! callers branch on it. Only genuinely unexpected conditions (a host
//! primitive failing mid-protocol, a post-write hash mismatch) surface
//! through the integrity/host variants.
//!
//! Display strings are deliberately generic. Raw input is never echoed back
//! through an error message; truncated, already-sanitized samples appear
//! only in audit event details.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Severity;

/// Result alias used across all validators and file operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Top-level error for every trust boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// Size/shape/structure violations. Recoverable by adjusting input.
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// A pattern or scan hit. Same recoverability class as validation,
    /// audited at higher severity, never auto-retried.
    #[error("threat detected: {tag}")]
    Threat { tag: ThreatTag },
    /// Traversal, escape, reserved names, bad extensions. Never partially
    /// honored.
    #[error("{0}")]
    Path(#[from] PathError),
    /// Post-write verification mismatch. The temp artifact is cleaned up
    /// and no partial state is left visible at the target.
    #[error("{0}")]
    Integrity(#[from] IntegrityError),
    /// Propagated verbatim from the host file primitives (permissions,
    /// disk full). Not a validation outcome.
    #[error("host I/O failure: {0}")]
    HostIo(String),
}

impl SecurityError {
    /// Audit severity for this failure.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            SecurityError::Validation(_) => Severity::Medium,
            SecurityError::Threat { tag } => tag.severity(),
            SecurityError::Path(err) => err.severity(),
            SecurityError::Integrity(err) => err.severity(),
            SecurityError::HostIo(_) => Severity::High,
        }
    }
}

/// Classification attached to a [`SecurityError::Threat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatTag {
    /// A match from the unconditional block set.
    DangerousPattern,
    /// A match from the context-dependent set, rejected in strict mode.
    SuspiciousPattern,
    /// The external scan hook flagged the input as unsafe.
    ExternalScan,
    /// The external scan hook failed or timed out; treated as a detection.
    ScanFailure,
    /// Dangerous HTML in a markdown payload.
    MarkdownHtml,
}

impl ThreatTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatTag::DangerousPattern => "dangerous_pattern",
            ThreatTag::SuspiciousPattern => "suspicious_pattern",
            ThreatTag::ExternalScan => "external_scan",
            ThreatTag::ScanFailure => "scan_failure",
            ThreatTag::MarkdownHtml => "markdown_html",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            ThreatTag::DangerousPattern => Severity::Critical,
            ThreatTag::SuspiciousPattern => Severity::High,
            ThreatTag::ExternalScan | ThreatTag::ScanFailure => Severity::High,
            ThreatTag::MarkdownHtml => Severity::High,
        }
    }
}

impl std::fmt::Display for ThreatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size/shape/structure rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input exceeds the maximum allowed size")]
    InputTooLarge,
    #[error("content exceeds the maximum allowed file size")]
    FileTooLarge,
    #[error("input contains null bytes")]
    NullBytes,
    #[error("input contains excessive control characters")]
    ControlCharacters,
    #[error("input must not be empty")]
    Empty,
    #[error("content is not well-formed JSON")]
    InvalidJson,
    #[error("target file already exists")]
    FileExists,
    #[error("target file does not exist")]
    FileNotFound,
    #[error("the string to replace was not found in the file")]
    StringNotFound,
}

/// Path rejections. Tag names mirror the audit vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,
    #[error("path contains a traversal sequence")]
    Traversal,
    #[error("path escapes the workspace root")]
    DirectoryEscape,
    #[error("path exceeds the maximum length")]
    LengthLimit,
    #[error("filename contains invalid characters")]
    InvalidFilename,
    #[error("filename is a reserved device name")]
    ReservedFilename,
    #[error("file extension is not allowed")]
    InvalidExtension,
    #[error("path matches a denied pattern")]
    DeniedPattern,
}

impl PathError {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            PathError::Empty => "empty_path",
            PathError::Traversal => "path_traversal",
            PathError::DirectoryEscape => "directory_escape",
            PathError::LengthLimit => "path_length_limit",
            PathError::InvalidFilename => "invalid_filename",
            PathError::ReservedFilename => "reserved_filename",
            PathError::InvalidExtension => "invalid_extension",
            PathError::DeniedPattern => "denied_pattern",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            PathError::Traversal => Severity::High,
            PathError::DirectoryEscape => Severity::Critical,
            PathError::DeniedPattern => Severity::High,
            _ => Severity::Medium,
        }
    }
}

/// Verification failures in the atomic write/edit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("temp file read-back did not match the written content")]
    AtomicVerifyFailed,
    #[error("final content hash did not match after promotion")]
    IntegrityMismatch,
    #[error("edit verification failed after write")]
    EditVerifyFailed,
}

impl IntegrityError {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            IntegrityError::AtomicVerifyFailed => Severity::High,
            IntegrityError::IntegrityMismatch => Severity::Critical,
            IntegrityError::EditVerifyFailed => Severity::High,
        }
    }
}
