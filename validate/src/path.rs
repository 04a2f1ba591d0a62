//! Canonical path containment enforcement.
//!
//! Resolution is purely lexical: no filesystem access, so the containment
//! guarantee is string containment against the workspace root, not
//! TOCTOU-safety against symlink races at the filesystem layer. Hosts that
//! need the stronger property must canonicalize at the point of use.
//!
//! Any `..` anywhere in the decoded candidate is treated as presumptively
//! hostile and rejected, even when it would resolve safely. Precision is
//! sacrificed for auditability.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use percent_encoding::percent_decode_str;
use scribe_audit::SecurityAuditLog;
use scribe_types::{
    EventKind, MAX_PATH_LENGTH, PathError, SecurityError, SecurityEvent, SecurityResult, Severity,
    ValidationConfig, truncate_sample,
};
use serde_json::json;

/// Bounded number of percent-decode passes; defends against double and
/// triple encoding of traversal sequences.
const DECODE_PASSES: usize = 3;

/// Filename characters rejected outright.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Device names reserved on Windows, rejected on every platform so the
/// workspace stays portable.
const RESERVED_FILENAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Resolves candidate paths to absolute, contained, policy-clean paths.
#[derive(Debug)]
pub struct PathValidator {
    config: Arc<ValidationConfig>,
    denied: GlobSet,
    audit: Arc<SecurityAuditLog>,
}

impl PathValidator {
    /// Build a validator for the config's workspace root.
    ///
    /// Fails if the root is not absolute or a denied-file glob does not
    /// compile; both are host configuration mistakes, surfaced eagerly.
    pub fn new(
        config: Arc<ValidationConfig>,
        audit: Arc<SecurityAuditLog>,
    ) -> SecurityResult<Self> {
        if !config.workspace_root.is_absolute() {
            return Err(PathError::DirectoryEscape.into());
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.denied_file_patterns {
            // Case-insensitive so "Secret.PEM" cannot slip past "*.pem".
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    SecurityError::HostIo(format!(
                        "invalid denied-file pattern '{pattern}': {e}"
                    ))
                })?;
            builder.add(glob);
        }
        let denied = builder
            .build()
            .map_err(|e| SecurityError::HostIo(e.to_string()))?;
        Ok(Self {
            config,
            denied,
            audit,
        })
    }

    /// Resolve a candidate path against the workspace root.
    ///
    /// On success the returned path is absolute, a lexical descendant of
    /// the root, within the length limit, with an allowlisted extension
    /// and a clean filename.
    pub fn resolve(&self, candidate: &str) -> SecurityResult<PathBuf> {
        match self.resolve_inner(candidate) {
            Ok(resolved) => {
                self.audit.record(SecurityEvent::new(
                    EventKind::PathResolved,
                    Severity::Low,
                    "path",
                    json!({ "path": resolved.display().to_string() }),
                ));
                Ok(resolved)
            }
            Err(err) => {
                self.audit.record(SecurityEvent::new(
                    EventKind::PathRejected,
                    err.severity(),
                    "path",
                    json!({
                        "tag": err.tag(),
                        // Controls are stripped before sampling so the log
                        // itself stays clean.
                        "candidate": truncate_sample(&printable(candidate), 80),
                    }),
                ));
                Err(err.into())
            }
        }
    }

    fn resolve_inner(&self, candidate: &str) -> Result<PathBuf, PathError> {
        if candidate.trim().is_empty() {
            return Err(PathError::Empty);
        }

        // Normalize separators, then peel percent-encoding with a bounded
        // number of passes.
        let mut path = candidate.replace('\\', "/");
        for _ in 0..DECODE_PASSES {
            let decoded = percent_decode_str(&path).decode_utf8_lossy().into_owned();
            if decoded == path {
                break;
            }
            path = decoded;
        }

        // `..` anywhere in the decoded string rejects, even if it would
        // normalize away.
        if path.contains("..") {
            return Err(PathError::Traversal);
        }
        let path = path.replace('\0', "");
        if path.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let joined = if Path::new(&path).is_absolute() {
            PathBuf::from(&path)
        } else {
            self.config.workspace_root.join(&path)
        };
        let normalized = normalize_lexically(&joined);

        if !normalized.starts_with(&self.config.workspace_root) {
            return Err(PathError::DirectoryEscape);
        }
        if normalized.as_os_str().len() > MAX_PATH_LENGTH {
            return Err(PathError::LengthLimit);
        }

        let filename = normalized
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(PathError::Empty)?;
        if filename
            .chars()
            .any(|c| INVALID_FILENAME_CHARS.contains(&c) || (c as u32) < 0x20)
        {
            return Err(PathError::InvalidFilename);
        }

        let stem = filename.split('.').next().unwrap_or(filename);
        if RESERVED_FILENAMES.contains(&stem.to_ascii_lowercase().as_str()) {
            return Err(PathError::ReservedFilename);
        }

        // Deny globs run before the extension allowlist so a hit on a
        // sensitive file reports as policy, not as a bad extension.
        let relative = normalized
            .strip_prefix(&self.config.workspace_root)
            .unwrap_or(&normalized);
        if self.denied.is_match(relative) {
            return Err(PathError::DeniedPattern);
        }

        let extension = normalized
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(PathError::InvalidExtension)?;
        if !self.config.extension_allowed(extension) {
            return Err(PathError::InvalidExtension);
        }

        Ok(normalized)
    }
}

/// Resolve `.` components without touching the filesystem. `..` never
/// reaches this point, but popping is kept so the function is total.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn printable(candidate: &str) -> String {
    candidate.chars().filter(|c| !c.is_control()).collect()
}
