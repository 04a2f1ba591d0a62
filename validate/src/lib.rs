//! Input, path, and content validators for Scribe's trust boundary.
//!
//! Untrusted text, candidate paths, and content blocks all pass through
//! this crate before they may influence a file operation. The validators
//! share one immutable [`ValidationConfig`](scribe_types::ValidationConfig)
//! and one immutable [`PatternCatalog`], and emit every outcome to a shared
//! [`SecurityAuditLog`](scribe_audit::SecurityAuditLog).

mod catalog;
mod content;
mod input;
mod path;
mod scan;

pub use catalog::{PatternCatalog, PatternClass, PatternEntry, PatternKind};
pub use content::ContentValidator;
pub use input::{InputValidator, SanitizeMode, sanitize};
pub use path::PathValidator;
pub use scan::{PhraseScanner, ScanError, ScanReport, ThreatScanner};
