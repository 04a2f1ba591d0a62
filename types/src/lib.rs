//! Core domain types for Scribe's trust boundary.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the pipeline:
//! the validation config, the error taxonomy, and the audit event model.

mod config;
mod error;
mod event;

pub use config::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_DENIED_PATTERNS, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_INPUT_SIZE, MAX_PATH_LENGTH, SecurityLevel, ValidationConfig,
};
pub use error::{
    IntegrityError, PathError, SecurityError, SecurityResult, ThreatTag, ValidationError,
};
pub use event::{EventKind, SecurityEvent, Severity, truncate_sample};
