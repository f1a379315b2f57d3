//! End-to-end tests over a corpus written to a temporary directory

#![allow(clippy::unwrap_used, clippy::expect_used)]

use skillhub_registry::{
    CorpusScanner, DisclosureLoader, FailureReason, LoaderConfig, ParseError, RefreshError,
    Registry, ScanError, SharedRegistry, ValidationError,
};
use skillhub_types::{DocumentKind, Tier};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn corpus() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    write(
        root,
        "plugins/python/skills/python-testing-patterns/SKILL.md",
        r#"---
name: python-testing-patterns
description: Pytest fixtures, mocking and parametrization.
summary:
  - Patch where the object is looked up
  - Prefer fixtures to setup methods
context_cost: low
load_when:
  - mocking python
  - pytest fixtures
requires: [python-basics]
---

# Python Testing Patterns

Use `unittest.mock.patch` as a context manager.
See also: `fixtures.md` for shared fixtures.
"#,
    );
    write(
        root,
        "plugins/python/skills/python-testing-patterns/fixtures.md",
        "# Fixtures\n\nconftest.py layouts.\n",
    );
    write(
        root,
        "plugins/python/skills/python-basics/SKILL.md",
        "---\nname: python-basics\ndescription: Python language essentials.\ncontext_cost: low\n---\nModules, packages, virtualenvs.\n",
    );
    write(
        root,
        "plugins/javascript/skills/javascript-testing-patterns/SKILL.md",
        r#"---
name: javascript-testing-patterns
description: Jest and Vitest patterns.
load_when: [mock functions, mocking, jest]
---
Use `vi.fn()` for mocks.
"#,
    );
    write(
        root,
        "plugins/review/agents/code-reviewer.md",
        "---\nname: code-reviewer\ndescription: Reviews diffs for defects.\nload_when: code review\n---\nYou are a meticulous reviewer.\n",
    );
    write(
        root,
        "plugins/tools/commands/deploy.md",
        "---\nname: deploy\ndescription: Deploy the current branch.\n---\nRun the deploy pipeline for $ARGUMENTS.\n",
    );
    // Not documents: plugin README and an extension file
    write(root, "plugins/python/README.md", "# Python plugin\n");

    dir
}

#[tokio::test]
async fn test_scan_builds_registry() {
    let dir = corpus();
    let report = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan");

    assert_eq!(report.files_scanned, 5);
    assert!(report.failures.is_empty());

    let registry = report.build_registry().expect("registry");
    assert_eq!(registry.len(), 5);
    assert_eq!(registry.find_by_kind(DocumentKind::Skill).count(), 3);
    assert_eq!(
        registry.get("code-reviewer").map(|d| d.kind),
        Some(DocumentKind::Agent)
    );
    assert!(registry
        .get_by_name(DocumentKind::Command, "deploy")
        .is_some());

    let testing = registry.get("python-testing-patterns").expect("skill");
    assert_eq!(testing.extended_files.len(), 1);
    assert!(testing.extended_files[0].size_bytes.is_some());
}

#[tokio::test]
async fn test_bad_documents_reported_good_ones_registered() {
    let dir = corpus();
    write(
        dir.path(),
        "plugins/broken/skills/no-description/SKILL.md",
        "---\nname: no-description\n---\nbody\n",
    );
    write(
        dir.path(),
        "plugins/broken/commands/fenced.md",
        "---\nname: fenced\ndescription: x\nsummary: |\n  ```sh\n  make\n  ```\n---\n",
    );

    let report = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan");

    assert_eq!(report.documents.len(), 5);
    assert_eq!(report.failures.len(), 2);
    let reasons: Vec<&FailureReason> = report.failures.iter().map(|f| &f.reason).collect();
    assert!(reasons.contains(&&FailureReason::Parse(ParseError::MissingField {
        field: "description"
    })));
    assert!(reasons.contains(&&FailureReason::Parse(ParseError::SummaryTooComplex {
        line: 1
    })));
    assert!(report.build_registry().is_ok());
}

#[tokio::test]
async fn test_mocking_python_scenario() {
    let dir = corpus();
    let registry = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan")
        .build_registry()
        .expect("registry");

    let loader = DisclosureLoader::new(&registry, &LoaderConfig::default());
    let plan = loader.load("mocking python", 4_000).expect("plan");

    let ids: Vec<&str> = plan.ids().collect();
    assert_eq!(
        ids,
        [
            "python-basics",
            "python-testing-patterns",
            "javascript-testing-patterns"
        ]
    );
    let python = plan.entry("python-testing-patterns").expect("python");
    let javascript = plan.entry("javascript-testing-patterns").expect("javascript");
    assert!(python.match_score > javascript.match_score);

    let entry = plan.entry("python-testing-patterns").expect("entry");
    assert_eq!(entry.tier, Tier::Extended);
    assert_eq!(entry.extensions, vec!["fixtures"]);

    let blocks = loader.render(&plan).expect("render");
    assert!(blocks
        .iter()
        .any(|b| b.text.contains("conftest.py layouts")));
}

#[tokio::test]
async fn test_dangling_reference_fails_build() {
    let dir = corpus();
    write(
        dir.path(),
        "plugins/cache/skills/caching/SKILL.md",
        "---\nname: caching\ndescription: Cache strategies.\nrequires: [redis-patterns]\n---\n",
    );

    let report = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan");
    let err = report.build_registry().expect_err("dangling");

    assert_eq!(
        err,
        ValidationError::DanglingReference {
            from: "caching".into(),
            missing: "redis-patterns".into(),
            relation: "requires",
        }
    );
}

#[tokio::test]
async fn test_same_name_under_two_plugins_fails_build() {
    let dir = corpus();
    let skill = "---\nname: mcp-builder\ndescription: Build MCP servers.\n---\n";
    write(dir.path(), "plugins/a/skills/mcp-builder/SKILL.md", skill);
    write(dir.path(), "plugins/b/skills/mcp-builder/SKILL.md", skill);

    let report = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan");

    match report.build_registry() {
        Err(ValidationError::DuplicateName {
            name, first, second, ..
        }) => {
            assert_eq!(name, "mcp-builder");
            assert!(first.ends_with("plugins/a/skills/mcp-builder/SKILL.md"));
            assert!(second.ends_with("plugins/b/skills/mcp-builder/SKILL.md"));
        }
        other => panic!("Expected DuplicateName, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_swaps_only_on_success() {
    let dir = corpus();
    let scanner = CorpusScanner::new().add_directory(dir.path());
    let shared = SharedRegistry::default();

    scanner.refresh(&shared).await.expect("refresh");
    let first = shared.snapshot();
    assert_eq!(first.len(), 5);

    write(
        dir.path(),
        "plugins/cache/skills/caching/SKILL.md",
        "---\nname: caching\ndescription: x\nrequires: redis-patterns\n---\n",
    );
    let result = scanner.refresh(&shared).await;
    assert!(matches!(result, Err(RefreshError::Validation(_))));
    assert_eq!(shared.snapshot().len(), 5);
    assert!(!shared.snapshot().contains("caching"));
}

#[tokio::test]
async fn test_missing_directory_is_empty_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = CorpusScanner::new()
        .add_directory(dir.path().join("nope"))
        .scan()
        .await
        .expect("scan");
    assert!(report.documents.is_empty());
    assert!(Registry::build(report.documents).expect("empty").is_empty());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_scan_timeout_registers_nothing() {
    let dir = corpus();
    let fifo = dir.path().join("plugins/review/agents/stalled.md");
    let status = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .expect("mkfifo");
    assert!(status.success());

    let result = CorpusScanner::new()
        .add_directory(dir.path())
        .with_timeout(Duration::from_millis(200))
        .scan()
        .await;

    match result {
        Err(e @ ScanError::Timeout { .. }) => {
            assert_eq!(e.to_string(), "corpus scan timeout after 200ms");
        }
        other => panic!("Expected Timeout, got {other:?}"),
    }

    // Release the blocked reader so the runtime can shut down
    drop(fs::OpenOptions::new().write(true).open(&fifo).expect("open fifo"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_loop_reported_not_followed() {
    let dir = corpus();
    std::os::unix::fs::symlink(
        dir.path().join("plugins"),
        dir.path().join("plugins/python/loop"),
    )
    .expect("symlink");

    let report = CorpusScanner::new()
        .add_directory(dir.path())
        .scan()
        .await
        .expect("scan");

    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.documents.len(), 5);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("plugins/python/loop"));
    assert!(report.build_registry().is_ok());
}
