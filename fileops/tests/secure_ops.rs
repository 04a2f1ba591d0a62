//! End-to-end tests of the trust boundary over the local filesystem.

use std::sync::Arc;

use scribe_audit::SecurityAuditLog;
use scribe_fileops::{LocalBackend, SecureFileOperations, WriteOptions, content_hash};
use scribe_types::{
    EventKind, PathError, SecurityError, ThreatTag, ValidationConfig, ValidationError,
};
use scribe_validate::PatternCatalog;

fn stack(
    root: &std::path::Path,
) -> (SecureFileOperations<LocalBackend>, Arc<SecurityAuditLog>) {
    let audit = Arc::new(SecurityAuditLog::new(true));
    let ops = SecureFileOperations::new(
        LocalBackend,
        Arc::new(ValidationConfig::new(root)),
        Arc::new(PatternCatalog::builtin()),
        Arc::clone(&audit),
    )
    .expect("valid config");
    (ops, audit)
}

#[test]
fn document_tree_builds_under_the_workspace_root() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, _) = stack(dir.path());

    ops.write("docs/PRD.md", "# PRD\n\nGoals.\n", WriteOptions::default())
        .unwrap();
    ops.write(
        "docs/architecture/adr-0001.md",
        "# ADR 0001\n\nContext.\n",
        WriteOptions::default(),
    )
    .unwrap();
    ops.write(
        ".ai-context/summary.json",
        "{\"phase\": \"complete\"}",
        WriteOptions::default(),
    )
    .unwrap();

    assert!(dir.path().join("docs/PRD.md").is_file());
    assert!(dir.path().join("docs/architecture/adr-0001.md").is_file());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(".ai-context/summary.json")).unwrap(),
        "{\"phase\": \"complete\"}"
    );
}

#[test]
fn successful_write_leaves_no_temp_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, _) = stack(dir.path());

    let outcome = ops
        .write("docs/report.md", "content\n", WriteOptions::default())
        .unwrap();
    assert_eq!(outcome.checksum, content_hash(b"content\n"));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("docs"))
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".tmp."))
        .collect();
    assert!(leftovers.is_empty(), "temp residue: {leftovers:?}");
}

#[test]
fn hostile_inputs_cannot_leave_the_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, audit) = stack(dir.path());

    for candidate in [
        "../../../etc/passwd",
        "..\\..\\windows\\system32\\config.md",
        "%2e%2e%2f%2e%2e%2fescape.md",
        "/etc/cron.d/job.md",
    ] {
        let err = ops
            .write(candidate, "payload", WriteOptions::default())
            .unwrap_err();
        assert!(
            matches!(err, SecurityError::Path(_)),
            "{candidate:?} produced {err:?}"
        );
    }
    assert_eq!(audit.count(EventKind::PathRejected), 4);
    // The workspace is still empty.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn write_edit_read_lifecycle_with_backup() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, audit) = stack(dir.path());

    ops.write("plan.md", "status: draft\n", WriteOptions::default())
        .unwrap();
    let edit = ops
        .edit(
            "plan.md",
            "status: draft",
            "status: approved",
            WriteOptions::default().with_backup(),
        )
        .unwrap();
    assert_eq!(edit.replacements, 1);
    assert_eq!(audit.count(EventKind::BackupCreated), 1);

    let read = ops.read("plan.md").unwrap();
    assert_eq!(read.content, "status: approved\n");

    // The backup holds the pre-edit content.
    let backup = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .find(|entry| entry.file_name().to_string_lossy().contains(".backup."))
        .expect("backup file present");
    assert_eq!(
        std::fs::read_to_string(backup.path()).unwrap(),
        "status: draft\n"
    );
}

#[test]
fn overwrite_protection_is_enforced_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, _) = stack(dir.path());

    ops.write("out.md", "first", WriteOptions::default()).unwrap();
    let err = ops
        .write("out.md", "second", WriteOptions::default())
        .unwrap_err();
    assert_eq!(err, SecurityError::Validation(ValidationError::FileExists));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.md")).unwrap(),
        "first"
    );
}

#[test]
fn denied_files_are_untouchable_even_inside_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, _) = stack(dir.path());

    let err = ops
        .write("config/.env", "SECRET=1", WriteOptions::default())
        .unwrap_err();
    assert_eq!(err, SecurityError::Path(PathError::DeniedPattern));

    // Reading one is equally off-limits.
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config/.env"), "SECRET=1").unwrap();
    assert!(ops.read("config/.env").is_err());
}

#[test]
fn threatening_idea_text_never_reaches_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, audit) = stack(dir.path());

    let err = ops
        .write(
            "docs/idea.md",
            "Great app idea {{constructor.constructor('return this')()}}",
            WriteOptions::default(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        SecurityError::Threat {
            tag: ThreatTag::DangerousPattern
        }
    );
    assert!(audit.count(EventKind::ThreatDetected) >= 1);
    assert!(!dir.path().join("docs/idea.md").exists());
}

#[test]
fn markdown_html_screen_applies_on_the_real_write_path() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, _) = stack(dir.path());

    let err = ops
        .write(
            "docs/summary.md",
            "# Summary\n\n<iframe src=\"https://evil.example\"></iframe>\n",
            WriteOptions::default(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        SecurityError::Threat {
            tag: ThreatTag::MarkdownHtml
        }
    );
    assert!(!dir.path().join("docs/summary.md").exists());
}

#[test]
fn audit_log_sees_every_stage_of_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let (ops, audit) = stack(dir.path());

    ops.write("docs/PRD.md", "# PRD\n", WriteOptions::default())
        .unwrap();

    assert_eq!(audit.count(EventKind::PathResolved), 1);
    assert_eq!(audit.count(EventKind::InputAccepted), 1);
    assert_eq!(audit.count(EventKind::FileWritten), 1);

    let metrics = audit.metrics();
    assert!(metrics.total_events >= 3);
    assert!(metrics.rolling_average.contains_key("write"));
}
