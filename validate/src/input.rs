//! Free-text input validation and sanitization.
//!
//! The pipeline short-circuits at the first failure: size/shape gates,
//! the external threat scan (fail closed), the dangerous pattern screen,
//! the strictness-dependent suspicious screen, then sanitization. The
//! returned string is the only form of the input that may be interpolated
//! into a generated document or written to disk.
//!
//! Sanitization is idempotent: running it twice yields the same string.
//! The entity encoder recognizes its own output and does not re-encode.

use std::sync::Arc;

use scribe_audit::SecurityAuditLog;
use scribe_types::{
    EventKind, SecurityError, SecurityEvent, SecurityLevel, SecurityResult, Severity, ThreatTag,
    ValidationConfig, ValidationError, truncate_sample,
};
use serde_json::json;

use crate::catalog::PatternCatalog;
use crate::scan::{PhraseScanner, ThreatScanner};

/// Maximum chars of a sanitized sample recorded in audit details.
const SAMPLE_CHARS: usize = 80;

/// How much of the input may be control characters before it is treated
/// as binary/garbage injection, as a fraction denominator (1/10).
const CONTROL_DENSITY_DIVISOR: usize = 10;

/// What the sanitizer is allowed to do to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeMode {
    /// Full pipeline: strip controls, normalize newlines, collapse
    /// whitespace runs, entity-encode HTML metacharacters, trim. For
    /// free-text fields that get interpolated into generated documents.
    #[default]
    Display,
    /// Strip controls and normalize newlines only. For file payloads,
    /// where entity-encoding or whitespace collapsing would corrupt
    /// structured content (JSON strings, indented code blocks).
    Preserve,
}

/// Validates and sanitizes untrusted free text.
pub struct InputValidator {
    config: Arc<ValidationConfig>,
    catalog: Arc<PatternCatalog>,
    scanner: Arc<dyn ThreatScanner>,
    audit: Arc<SecurityAuditLog>,
}

impl std::fmt::Debug for InputValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputValidator")
            .field("level", &self.config.level)
            .field("threat_scan_enabled", &self.config.threat_scan_enabled)
            .finish_non_exhaustive()
    }
}

impl InputValidator {
    /// Build a validator with the built-in phrase scanner as the threat
    /// hook. The hook only runs when the config enables it.
    #[must_use]
    pub fn new(
        config: Arc<ValidationConfig>,
        catalog: Arc<PatternCatalog>,
        audit: Arc<SecurityAuditLog>,
    ) -> Self {
        let scanner = Arc::new(PhraseScanner::new(Arc::clone(&catalog)));
        Self {
            config,
            catalog,
            scanner,
            audit,
        }
    }

    /// Replace the threat-scan hook.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn ThreatScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ValidationConfig> {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<PatternCatalog> {
        &self.catalog
    }

    /// Validate and sanitize a free-text field.
    ///
    /// `context` is a caller label used only for audit correlation, never
    /// for authorization decisions.
    pub fn validate(&self, text: &str, context: &str) -> SecurityResult<String> {
        self.validate_with(text, context, SanitizeMode::Display)
    }

    /// Validate with an explicit sanitize mode. The content validator uses
    /// [`SanitizeMode::Preserve`] for file payloads.
    pub fn validate_with(
        &self,
        text: &str,
        context: &str,
        mode: SanitizeMode,
    ) -> SecurityResult<String> {
        // Basic size/shape gates, cheapest first.
        let char_count = text.chars().count();
        if char_count > self.config.max_input_size {
            return Err(self.reject(
                context,
                ValidationError::InputTooLarge.into(),
                json!({ "chars": char_count, "max": self.config.max_input_size }),
            ));
        }
        if text.contains('\0') {
            return Err(self.reject(
                context,
                ValidationError::NullBytes.into(),
                json!({ "chars": char_count }),
            ));
        }
        let control_count = text
            .chars()
            .filter(|c| c.is_control() && !matches!(c, '\n' | '\t' | '\r'))
            .count();
        if char_count > 0 && control_count * CONTROL_DENSITY_DIVISOR > char_count {
            return Err(self.reject(
                context,
                ValidationError::ControlCharacters.into(),
                json!({ "chars": char_count, "control_chars": control_count }),
            ));
        }

        // External threat scan. A hook failure is a detection, not a skip.
        if self.config.threat_scan_enabled {
            match self.scanner.scan(text) {
                Err(err) => {
                    tracing::warn!(context, "threat scan hook failed, failing closed: {err}");
                    return Err(self.reject(
                        context,
                        SecurityError::Threat {
                            tag: ThreatTag::ScanFailure,
                        },
                        json!({ "error": err.to_string() }),
                    ));
                }
                Ok(report) if !report.safe => {
                    return Err(self.reject(
                        context,
                        SecurityError::Threat {
                            tag: ThreatTag::ExternalScan,
                        },
                        json!({
                            "threats": report.threats,
                            "confidence": report.confidence,
                        }),
                    ));
                }
                Ok(_) => {}
            }
        }

        // Dangerous patterns block at every level.
        if let Some(entry) = self.catalog.first_dangerous(text) {
            let err = SecurityError::Threat {
                tag: ThreatTag::DangerousPattern,
            };
            self.audit.record(SecurityEvent::new(
                EventKind::ThreatDetected,
                entry.kind.severity(),
                context,
                json!({ "tag": "dangerous_pattern", "kind": entry.kind.as_str() }),
            ));
            return Err(err);
        }

        // Suspicious patterns block only in strict mode.
        let suspicious = self.catalog.suspicious_matches(text);
        if !suspicious.is_empty() {
            let kinds: Vec<&str> = suspicious.iter().map(|e| e.kind.as_str()).collect();
            if self.config.level == SecurityLevel::Strict {
                return Err(self.reject(
                    context,
                    SecurityError::Threat {
                        tag: ThreatTag::SuspiciousPattern,
                    },
                    json!({ "tag": "suspicious_pattern", "kinds": kinds }),
                ));
            }
            self.audit.record(SecurityEvent::new(
                EventKind::ThreatDetected,
                Severity::Low,
                context,
                json!({ "tag": "suspicious_pattern", "kinds": kinds, "blocking": false }),
            ));
        }

        let cleaned = sanitize(text, mode);
        if cleaned != text {
            self.audit.record(SecurityEvent::new(
                EventKind::InputSanitized,
                Severity::Low,
                context,
                json!({
                    "original_chars": char_count,
                    "sanitized_chars": cleaned.chars().count(),
                    "sample": truncate_sample(&cleaned, SAMPLE_CHARS),
                }),
            ));
        }
        self.audit.record(SecurityEvent::new(
            EventKind::InputAccepted,
            Severity::Low,
            context,
            json!({ "chars": cleaned.chars().count() }),
        ));
        Ok(cleaned)
    }

    /// Audit-only rescan for content already resident in the workspace.
    ///
    /// Used on the read path: a finding is logged at medium severity but
    /// never blocks, since refusing to return already-resident content
    /// protects nothing.
    pub fn audit_scan(&self, text: &str, context: &str) {
        let mut findings: Vec<String> = Vec::new();
        if let Some(entry) = self.catalog.first_dangerous(text) {
            findings.push(entry.kind.as_str().to_string());
        }
        if self.config.threat_scan_enabled {
            match self.scanner.scan(text) {
                Ok(report) if !report.safe => findings.extend(report.threats),
                Ok(_) => {}
                Err(err) => {
                    // Non-blocking path: record the hook failure and move on.
                    self.audit.record(SecurityEvent::new(
                        EventKind::ScanFailure,
                        Severity::Medium,
                        context,
                        json!({ "error": err.to_string(), "blocking": false }),
                    ));
                }
            }
        }
        if !findings.is_empty() {
            self.audit.record(SecurityEvent::new(
                EventKind::ThreatDetected,
                Severity::Medium,
                context,
                json!({ "findings": findings, "blocking": false }),
            ));
        }
    }

    /// Emit the single rejection event for this call and hand back the error.
    fn reject(
        &self,
        context: &str,
        err: SecurityError,
        details: serde_json::Value,
    ) -> SecurityError {
        let kind = match &err {
            SecurityError::Threat {
                tag: ThreatTag::ScanFailure,
            } => EventKind::ScanFailure,
            SecurityError::Threat { .. } => EventKind::ThreatDetected,
            _ => EventKind::InputRejected,
        };
        self.audit
            .record(SecurityEvent::new(kind, err.severity(), context, details));
        err
    }
}

/// Sanitize text. Idempotent in both modes.
#[must_use]
pub fn sanitize(text: &str, mode: SanitizeMode) -> String {
    let stripped = strip_controls(text);
    match mode {
        SanitizeMode::Preserve => stripped,
        SanitizeMode::Display => {
            let collapsed = collapse_runs(&stripped);
            let encoded = encode_entities(&collapsed);
            encoded.trim().to_string()
        }
    }
}

/// Normalize `\r\n`/`\r` to `\n` and strip every other control character
/// except `\n` and `\t`. NUL never survives.
fn strip_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Collapse runs of four or more spaces/newlines down to three.
fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' || c == '\n' {
            let mut count = 1usize;
            while chars.peek() == Some(&c) {
                chars.next();
                count += 1;
            }
            for _ in 0..count.min(3) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Entities this encoder emits; an `&` already starting one is left alone
/// so a second pass is a no-op.
const OWN_ENTITIES: &[&str] = &["amp;", "lt;", "gt;", "quot;", "#x27;"];

fn encode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, c) in text.char_indices() {
        match c {
            '&' => {
                let rest = &text[idx + 1..];
                if OWN_ENTITIES.iter().any(|entity| rest.starts_with(entity)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
