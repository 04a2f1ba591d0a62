//! Validation configuration shared by every validator.
//!
//! A [`ValidationConfig`] is built once at session start and shared read-only
//! (typically behind an `Arc`) by the input, path, and content validators and
//! by the secure file operations layer. It is never mutated after
//! construction.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum input size accepted by the input validator, in characters.
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1_000_000;

/// Maximum file content size accepted by the content validator, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum length of a resolved path, in bytes.
pub const MAX_PATH_LENGTH: usize = 255;

/// File extensions the path validator accepts by default.
///
/// The trust boundary serves a document pipeline: everything it writes is
/// prose, structured data, or schema files.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["json", "md", "sql", "txt", "yaml", "yml"];

/// Glob patterns for files that must never be touched, regardless of
/// containment. Matched case-insensitively against the workspace-relative
/// path.
pub const DEFAULT_DENIED_PATTERNS: &[&str] = &[
    "**/.env",
    "**/.env.*",
    "**/*.env",
    "**/.git/**",
    "**/.ssh/**",
    "**/.aws/**",
    "**/.netrc",
    "**/.npmrc",
    "**/*.pem",
    "**/*.key",
    "**/id_rsa*",
    "**/id_ed25519*",
];

/// How aggressively the validators treat context-dependent findings.
///
/// Dangerous patterns block at every level; this only changes the fate of
/// the suspicious set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Suspicious patterns reject.
    Strict,
    /// Suspicious patterns are logged but do not block.
    #[default]
    Balanced,
    /// Same blocking behavior as `Balanced`; reserved for hosts that also
    /// relax their own outer checks.
    Permissive,
}

impl SecurityLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Strict => "strict",
            SecurityLevel::Balanced => "balanced",
            SecurityLevel::Permissive => "permissive",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown security level (expected strict, balanced, or permissive)")]
pub struct SecurityLevelParseError;

impl FromStr for SecurityLevel {
    type Err = SecurityLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SecurityLevel::Strict),
            "balanced" => Ok(SecurityLevel::Balanced),
            "permissive" => Ok(SecurityLevel::Permissive),
            _ => Err(SecurityLevelParseError),
        }
    }
}

/// Immutable configuration for the whole trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Strictness level for context-dependent pattern findings.
    pub level: SecurityLevel,
    /// Maximum accepted input length, in characters.
    pub max_input_size: usize,
    /// Maximum accepted file content size, in bytes.
    pub max_file_size: usize,
    /// Lowercase file extensions (without the dot) that may be written.
    pub allowed_extensions: BTreeSet<String>,
    /// Absolute directory outside of which no file operation may have effect.
    pub workspace_root: PathBuf,
    /// Whether the external threat-scan hook runs during input validation.
    pub threat_scan_enabled: bool,
    /// Whether validators emit events to the audit log.
    pub log_events: bool,
    /// Case-insensitive globs over the workspace-relative path; a match
    /// rejects the path even when it is contained.
    pub denied_file_patterns: Vec<String>,
}

impl ValidationConfig {
    /// Build a config with defaults for the given workspace root.
    ///
    /// The root must be absolute; the path validator refuses to construct
    /// otherwise.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            level: SecurityLevel::default(),
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            workspace_root: workspace_root.into(),
            threat_scan_enabled: true,
            log_events: true,
            denied_file_patterns: DEFAULT_DENIED_PATTERNS
                .iter()
                .map(|pat| (*pat).to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: SecurityLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_threat_scan(mut self, enabled: bool) -> Self {
        self.threat_scan_enabled = enabled;
        self
    }

    /// Whether `ext` (without the dot, any case) is on the allowlist.
    #[must_use]
    pub fn extension_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions.contains(&ext.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_balanced_with_scanning_on() {
        let config = ValidationConfig::new("/ws");
        assert_eq!(config.level, SecurityLevel::Balanced);
        assert!(config.threat_scan_enabled);
        assert!(config.log_events);
        assert_eq!(config.max_input_size, DEFAULT_MAX_INPUT_SIZE);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let config = ValidationConfig::new("/ws");
        assert!(config.extension_allowed("md"));
        assert!(config.extension_allowed("MD"));
        assert!(config.extension_allowed("Json"));
        assert!(!config.extension_allowed("exe"));
        assert!(!config.extension_allowed("sh"));
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!(
            "STRICT".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::Strict
        );
        assert_eq!(
            "balanced".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::Balanced
        );
        assert!("paranoid".parse::<SecurityLevel>().is_err());
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ValidationConfig::new("/ws")
            .with_level(SecurityLevel::Strict)
            .with_threat_scan(false);
        assert_eq!(config.level, SecurityLevel::Strict);
        assert!(!config.threat_scan_enabled);
    }
}
