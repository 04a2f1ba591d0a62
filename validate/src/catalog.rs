//! Immutable, data-driven matcher sets for threat detection.
//!
//! The catalog is explicitly constructed and passed into validators rather
//! than living behind a module-level singleton, so a host can rebuild and
//! swap the rule set per environment and tests can run against a reduced
//! catalog. All matching is case-insensitive.
//!
//! Four sets, by consequence:
//! - *dangerous*: blocks at every strictness level
//! - *suspicious*: blocks in strict mode, otherwise logged
//! - *markdown-html*: dangerous HTML screened out of `.md` payloads
//! - *sensitive*: secrets/PII shapes, report-only (scanner and read audit)

use regex::{Regex, RegexBuilder};
use scribe_types::Severity;

/// What a pattern is evidence of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    SqlInjection,
    CommandInjection,
    TemplateInjection,
    CodeExecution,
    CrossSiteScripting,
    PathTraversal,
    DangerousHtml,
    Credential,
    PersonalData,
}

impl PatternKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::SqlInjection => "sql_injection",
            PatternKind::CommandInjection => "command_injection",
            PatternKind::TemplateInjection => "template_injection",
            PatternKind::CodeExecution => "code_execution",
            PatternKind::CrossSiteScripting => "xss",
            PatternKind::PathTraversal => "path_traversal",
            PatternKind::DangerousHtml => "dangerous_html",
            PatternKind::Credential => "credential",
            PatternKind::PersonalData => "personal_data",
        }
    }

    /// Audit severity when a pattern of this kind is the blocking finding.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            PatternKind::SqlInjection | PatternKind::CommandInjection => Severity::Critical,
            PatternKind::TemplateInjection
            | PatternKind::CodeExecution
            | PatternKind::CrossSiteScripting
            | PatternKind::PathTraversal
            | PatternKind::DangerousHtml
            | PatternKind::Credential => Severity::High,
            PatternKind::PersonalData => Severity::Medium,
        }
    }
}

/// Whether a match blocks unconditionally or only in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass {
    Dangerous,
    Suspicious,
}

/// One compiled matcher with its classification.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub regex: Regex,
    pub kind: PatternKind,
    pub class: PatternClass,
}

impl PatternEntry {
    /// Compile a case-insensitive entry.
    ///
    /// # Panics
    ///
    /// Panics on an invalid pattern; entries are built from static tables
    /// or host-controlled rule files, never from untrusted input.
    #[must_use]
    pub fn new(pattern: &str, kind: PatternKind, class: PatternClass) -> Self {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("pattern must compile");
        Self { regex, kind, class }
    }
}

/// Unconditional block set: template evaluation, injection idioms, code
/// execution calls, and encoded traversal markers.
const DANGEROUS: &[(&str, PatternKind)] = &[
    // Template evaluation syntax. The literal is rejected, never evaluated.
    (r"\{\{.*?\}\}", PatternKind::TemplateInjection),
    (r"\$\{.*?\}", PatternKind::TemplateInjection),
    (r"<%.*?%>", PatternKind::TemplateInjection),
    (r"\[\[.*?\]\]", PatternKind::TemplateInjection),
    // SQL injection idioms
    (r"';.*drop\s+table", PatternKind::SqlInjection),
    (r"';.*delete\s+from", PatternKind::SqlInjection),
    (r"';.*update\s+.*\bset\b", PatternKind::SqlInjection),
    (r"\bunion\s+select\b", PatternKind::SqlInjection),
    (r"\bor\s+1\s*=\s*1\b", PatternKind::SqlInjection),
    (r"\band\s+1\s*=\s*1\b", PatternKind::SqlInjection),
    // Shell / process access idioms
    (r";\s*(rm|del|format|shutdown)\b", PatternKind::CommandInjection),
    (r"\|\s*(rm|del|format)\b", PatternKind::CommandInjection),
    (r"&&\s*(rm|del|format)\b", PatternKind::CommandInjection),
    (r"`[^`]+`", PatternKind::CommandInjection),
    (r"\$\([^)]*\)", PatternKind::CommandInjection),
    // Code execution calls
    (r"\beval\s*\(", PatternKind::CodeExecution),
    (r"\bexec\s*\(", PatternKind::CodeExecution),
    (r"\bsystem\s*\(", PatternKind::CodeExecution),
    (r"\bshell_exec\s*\(", PatternKind::CodeExecution),
    (r"\bpassthru\s*\(", PatternKind::CodeExecution),
    (r"\bbase64_decode\s*\(", PatternKind::CodeExecution),
    // Encoded traversal markers (plain `..` is handled by the path
    // validator; these catch traversal smuggled through text fields)
    (r"%2e%2e%2f", PatternKind::PathTraversal),
    (r"%2e%2e%5c", PatternKind::PathTraversal),
    (r"\.\.%2f", PatternKind::PathTraversal),
    (r"\.\.%5c", PatternKind::PathTraversal),
    (r"%00", PatternKind::PathTraversal),
];

/// Context-dependent set: blocks only in strict mode.
const SUSPICIOUS: &[(&str, PatternKind)] = &[
    (r"<script[^>]*>", PatternKind::CrossSiteScripting),
    (r"<iframe[^>]*>", PatternKind::CrossSiteScripting),
    (r"<object[^>]*>", PatternKind::CrossSiteScripting),
    (r"<embed[^>]*>", PatternKind::CrossSiteScripting),
    (r"javascript\s*:", PatternKind::CrossSiteScripting),
    (r"vbscript\s*:", PatternKind::CrossSiteScripting),
    (r"\bdata:[a-z]+/[a-z0-9.+-]+", PatternKind::CrossSiteScripting),
    (r"\bon\w+\s*=", PatternKind::CrossSiteScripting),
    // Quoted-string concatenation, the classic smuggling shape for
    // splitting a payload across template markers
    (r#"['"]\s*\+\s*['"]"#, PatternKind::TemplateInjection),
];

/// Dangerous HTML screened out of markdown payloads before write.
const MARKDOWN_HTML: &[(&str, PatternKind)] = &[
    (r"<script[^>]*>", PatternKind::DangerousHtml),
    (r"<iframe[^>]*>", PatternKind::DangerousHtml),
    (r"<object[^>]*>", PatternKind::DangerousHtml),
    (r"<embed[^>]*>", PatternKind::DangerousHtml),
    (r"<form[^>]*>", PatternKind::DangerousHtml),
    (r"<input[^>]*>", PatternKind::DangerousHtml),
    (r"javascript\s*:", PatternKind::DangerousHtml),
    (r"vbscript\s*:", PatternKind::DangerousHtml),
    (r"\bdata:[a-z]+/[a-z0-9.+-]+", PatternKind::DangerousHtml),
    (r"\bon\w+\s*=", PatternKind::DangerousHtml),
];

/// Secrets and PII shapes. Report-only: matched by the built-in scanner
/// and by the read-path audit rescan, never a blocking set by themselves.
const SENSITIVE: &[(&str, PatternKind)] = &[
    (
        r#"password\s*[=:]\s*["']?[^\s"']{8,}"#,
        PatternKind::Credential,
    ),
    (
        r#"api[_-]?key\s*[=:]\s*["']?[A-Za-z0-9]{20,}"#,
        PatternKind::Credential,
    ),
    (
        r#"secret\s*[=:]\s*["']?[A-Za-z0-9]{16,}"#,
        PatternKind::Credential,
    ),
    (
        r#"token\s*[=:]\s*["']?[A-Za-z0-9]{20,}"#,
        PatternKind::Credential,
    ),
    (
        r#"access[_-]?key\s*[=:]\s*["']?[A-Za-z0-9]{16,}"#,
        PatternKind::Credential,
    ),
    // SSN shape
    (r"\b\d{3}-\d{2}-\d{4}\b", PatternKind::PersonalData),
    // Credit card shape
    (
        r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
        PatternKind::PersonalData,
    ),
    // Email address
    (
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        PatternKind::PersonalData,
    ),
];

/// Immutable pattern sets. Pure data and pure lookups; no state, no IO.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    dangerous: Vec<PatternEntry>,
    suspicious: Vec<PatternEntry>,
    markdown_html: Vec<PatternEntry>,
    sensitive: Vec<PatternEntry>,
}

impl PatternCatalog {
    /// The built-in rule set.
    #[must_use]
    pub fn builtin() -> Self {
        let compile = |table: &[(&str, PatternKind)], class: PatternClass| {
            table
                .iter()
                .map(|(pattern, kind)| PatternEntry::new(pattern, *kind, class))
                .collect()
        };
        Self {
            dangerous: compile(DANGEROUS, PatternClass::Dangerous),
            suspicious: compile(SUSPICIOUS, PatternClass::Suspicious),
            markdown_html: compile(MARKDOWN_HTML, PatternClass::Dangerous),
            sensitive: compile(SENSITIVE, PatternClass::Suspicious),
        }
    }

    /// Build a catalog from caller-supplied entries. Hosts use this to run
    /// a reduced or extended rule set without touching the builtin tables.
    #[must_use]
    pub fn from_entries(
        dangerous: Vec<PatternEntry>,
        suspicious: Vec<PatternEntry>,
        markdown_html: Vec<PatternEntry>,
        sensitive: Vec<PatternEntry>,
    ) -> Self {
        Self {
            dangerous,
            suspicious,
            markdown_html,
            sensitive,
        }
    }

    /// First match from the unconditional block set.
    #[must_use]
    pub fn first_dangerous(&self, text: &str) -> Option<&PatternEntry> {
        self.dangerous.iter().find(|entry| entry.regex.is_match(text))
    }

    /// All matches from the context-dependent set.
    #[must_use]
    pub fn suspicious_matches(&self, text: &str) -> Vec<&PatternEntry> {
        self.suspicious
            .iter()
            .filter(|entry| entry.regex.is_match(text))
            .collect()
    }

    /// First match from the markdown dangerous-HTML set.
    #[must_use]
    pub fn first_markdown_html(&self, text: &str) -> Option<&PatternEntry> {
        self.markdown_html
            .iter()
            .find(|entry| entry.regex.is_match(text))
    }

    /// All matches from the secrets/PII set.
    #[must_use]
    pub fn sensitive_matches(&self, text: &str) -> Vec<&PatternEntry> {
        self.sensitive
            .iter()
            .filter(|entry| entry.regex.is_match(text))
            .collect()
    }
}
