//! File content validation prior to write.
//!
//! Cheapest checks first: the byte-size ceiling, then the general
//! input pipeline (in preserve mode, so structured payloads are not
//! entity-encoded), then format-specific structural checks keyed off the
//! target path's extension.

use std::path::Path;
use std::sync::Arc;

use scribe_audit::SecurityAuditLog;
use scribe_types::{
    EventKind, SecurityError, SecurityEvent, SecurityResult, Severity, ThreatTag,
    ValidationConfig, ValidationError,
};
use serde_json::json;

use crate::catalog::PatternCatalog;
use crate::input::{InputValidator, SanitizeMode};
use crate::scan::ThreatScanner;

/// Validates content blocks destined for files in the workspace.
#[derive(Debug)]
pub struct ContentValidator {
    input: InputValidator,
    audit: Arc<SecurityAuditLog>,
}

impl ContentValidator {
    #[must_use]
    pub fn new(
        config: Arc<ValidationConfig>,
        catalog: Arc<PatternCatalog>,
        audit: Arc<SecurityAuditLog>,
    ) -> Self {
        let input = InputValidator::new(config, catalog, Arc::clone(&audit));
        Self { input, audit }
    }

    /// Replace the threat-scan hook on the inner input validator.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn ThreatScanner>) -> Self {
        self.input = self.input.with_scanner(scanner);
        self
    }

    /// The inner input validator, shared with the read-path audit rescan.
    #[must_use]
    pub fn input(&self) -> &InputValidator {
        &self.input
    }

    /// Validate content for the given target path.
    ///
    /// Returns the sanitized content ready for write.
    pub fn validate(&self, content: &str, target_path: &Path) -> SecurityResult<String> {
        let context = format!("file:{}", target_path.display());

        if content.len() > self.input.config().max_file_size {
            let err = SecurityError::Validation(ValidationError::FileTooLarge);
            self.audit.record(SecurityEvent::new(
                EventKind::ContentRejected,
                err.severity(),
                &context,
                json!({
                    "bytes": content.len(),
                    "max": self.input.config().max_file_size,
                }),
            ));
            return Err(err);
        }

        let cleaned = self
            .input
            .validate_with(content, &context, SanitizeMode::Preserve)?;

        let extension = target_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => {
                if let Err(parse_err) = serde_json::from_str::<serde_json::Value>(&cleaned) {
                    let err = SecurityError::Validation(ValidationError::InvalidJson);
                    self.audit.record(SecurityEvent::new(
                        EventKind::ContentRejected,
                        err.severity(),
                        &context,
                        // Parser errors describe positions, not content.
                        json!({ "reason": parse_err.to_string() }),
                    ));
                    return Err(err);
                }
            }
            Some("md") => {
                if let Some(entry) = self.input.catalog().first_markdown_html(&cleaned) {
                    let err = SecurityError::Threat {
                        tag: ThreatTag::MarkdownHtml,
                    };
                    self.audit.record(SecurityEvent::new(
                        EventKind::ContentRejected,
                        Severity::High,
                        &context,
                        json!({ "tag": "markdown_html", "kind": entry.kind.as_str() }),
                    ));
                    return Err(err);
                }
            }
            _ => {}
        }

        Ok(cleaned)
    }
}
