//! Document parsing
//!
//! Each document is a Markdown file with YAML frontmatter. The frontmatter
//! carries the registry metadata; the body is Tier-2 content and any `.md`
//! files it points at become Tier-3 references.

use regex::Regex;
use serde::Deserialize;
use skillhub_types::{ContextCost, Document, DocumentKind, ExtensionRef};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::error::ParseError;

/// Maximum recommended name length
const MAX_NAME_LENGTH: usize = 64;
/// Maximum recommended description length
const MAX_DESCRIPTION_LENGTH: usize = 1024;

/// Raw frontmatter as written by authors
#[derive(Debug, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    summary: Option<OneOrMany>,
    #[serde(default, alias = "contextCost", alias = "context-cost")]
    context_cost: Option<String>,
    #[serde(default, alias = "loadWhen", alias = "load-when")]
    load_when: Option<OneOrMany>,
    #[serde(default)]
    requires: Option<OneOrMany>,
    #[serde(default)]
    enhances: Option<OneOrMany>,
    #[serde(default)]
    tags: Option<OneOrMany>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

/// A scalar string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Parse a raw document into a [`Document`].
///
/// Pure over its inputs: `path` is only used to derive the kind and to
/// resolve Tier-3 references, nothing is read from disk.
pub fn parse(raw: &str, path: &Path) -> Result<Document, ParseError> {
    let (yaml, body) = split_frontmatter(raw)?;

    let frontmatter: Frontmatter = serde_yaml::from_str(yaml)
        .map_err(|e| ParseError::MalformedMetadata(format!("invalid YAML frontmatter: {e}")))?;

    let name = required(frontmatter.name, "name")?;
    let description = required(frontmatter.description, "description")?;
    validate_metadata(&name, &description);

    let summary = match frontmatter.summary {
        Some(value) => parse_summary(value)?,
        None => Vec::new(),
    };

    let context_cost = match frontmatter.context_cost {
        Some(raw_cost) => raw_cost
            .parse::<ContextCost>()
            .map_err(|e| ParseError::MalformedMetadata(e.to_string()))?,
        None => ContextCost::default(),
    };

    let body = body.trim().to_string();
    let extended_files = extension_refs(&body, path)?;

    Ok(Document {
        id: name.clone(),
        kind: DocumentKind::from_path(path),
        name,
        description,
        summary,
        context_cost,
        load_when: string_set(frontmatter.load_when),
        requires: string_set(frontmatter.requires),
        enhances: string_set(frontmatter.enhances),
        tags: string_set(frontmatter.tags),
        body,
        extended_files,
        source_path: path.to_path_buf(),
        extra: frontmatter.extra,
    })
}

/// Split raw text into the YAML block and the body
fn split_frontmatter(raw: &str) -> Result<(&str, &str), ParseError> {
    let frontmatter_re =
        Regex::new(r"(?s)\A\x{feff}?---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n(.*))?\z")
            .map_err(|e| ParseError::MalformedMetadata(format!("Failed to compile regex: {e}")))?;

    let captures = frontmatter_re.captures(raw).ok_or_else(|| {
        ParseError::MalformedMetadata("no YAML frontmatter delimited by '---' found".to_string())
    })?;

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());
    Ok((yaml, body))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ParseError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingField { field })
}

/// Length and naming checks that only warn
fn validate_metadata(name: &str, description: &str) {
    if name.len() > MAX_NAME_LENGTH {
        warn!(
            "Document name '{}' exceeds {} characters (was {})",
            name,
            MAX_NAME_LENGTH,
            name.len()
        );
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        warn!(
            "Document name '{}' should contain only lowercase letters, numbers, and hyphens",
            name
        );
    }

    if description.len() > MAX_DESCRIPTION_LENGTH {
        warn!(
            "Document '{}' description exceeds {} characters (was {})",
            name,
            MAX_DESCRIPTION_LENGTH,
            description.len()
        );
    }
}

/// Flatten the summary into trimmed, non-empty bullet lines
fn parse_summary(value: OneOrMany) -> Result<Vec<String>, ParseError> {
    let raw_lines: Vec<String> = match value {
        OneOrMany::One(text) => text.lines().map(str::to_string).collect(),
        OneOrMany::Many(items) => items
            .iter()
            .flat_map(|item| item.lines())
            .map(str::to_string)
            .collect(),
    };

    let mut summary = Vec::new();
    for line in raw_lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains("```") || line.contains("~~~") {
            return Err(ParseError::SummaryTooComplex {
                line: summary.len() + 1,
            });
        }
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line)
            .trim();
        if !line.is_empty() {
            summary.push(line.to_string());
        }
    }

    Ok(summary)
}

/// Normalize a list-valued key: trimmed, non-empty, first occurrence wins
fn string_set(value: Option<OneOrMany>) -> Vec<String> {
    let items: Vec<String> = match value {
        None => return Vec::new(),
        Some(OneOrMany::One(text)) => text.split(',').map(str::to_string).collect(),
        Some(OneOrMany::Many(items)) => items,
    };

    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Collect Tier-3 references from the body in order of first mention
fn extension_refs(body: &str, path: &Path) -> Result<Vec<ExtensionRef>, ParseError> {
    let see_re = Regex::new(r"(?i)\bsee(?:\s+also)?:?\s+`?([A-Za-z0-9_./-]+\.md)\b`?")
        .map_err(|e| ParseError::MalformedMetadata(format!("Failed to compile regex: {e}")))?;
    let link_re = Regex::new(r"\[[^\]]*\]\(\s*<?([^)\s>#]+\.md)(?:#[^)\s>]*)?>?\s*\)")
        .map_err(|e| ParseError::MalformedMetadata(format!("Failed to compile regex: {e}")))?;

    let mut mentions: Vec<(usize, &str)> = see_re
        .captures_iter(body)
        .chain(link_re.captures_iter(body))
        .filter_map(|c| c.get(1))
        .map(|m| (m.start(), m.as_str()))
        .filter(|(_, target)| !target.contains("://") && !target.starts_with('/'))
        .collect();
    mentions.sort_by_key(|(pos, _)| *pos);

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let own = normalize(path);
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for (_, target) in mentions {
        let resolved = normalize(&base.join(target));
        if resolved == own || !seen.insert(resolved.clone()) {
            continue;
        }
        let Some(name) = resolved.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        refs.push(ExtensionRef {
            name: name.to_string(),
            path: resolved.clone(),
            size_bytes: None,
        });
    }

    Ok(refs)
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PYTHON_TESTING: &str = r#"---
name: python-testing-patterns
description: Pytest fixtures, mocking and parametrization. Use when writing Python tests.
summary: |
  - Prefer fixtures over setup methods
  - Patch where the object is looked up
context_cost: low
load_when:
  - mocking python
  - pytest fixtures
requires: [python-basics]
enhances: python-packaging, python-typing
tags: [python, testing]
version: 1.2.0
---

# Python Testing Patterns

Core guidance here. See also: `templates.md` for ready-made fixtures.
Advanced recipes live in [the examples](./examples.md#mocks).
"#;

    #[test]
    fn test_parse_full_document() {
        let doc = parse(PYTHON_TESTING, Path::new("plugins/python/skills/testing/SKILL.md"))
            .expect("parse");

        assert_eq!(doc.id, "python-testing-patterns");
        assert_eq!(doc.kind, DocumentKind::Skill);
        assert_eq!(
            doc.summary,
            vec![
                "Prefer fixtures over setup methods".to_string(),
                "Patch where the object is looked up".to_string()
            ]
        );
        assert_eq!(doc.context_cost, ContextCost::Low);
        assert_eq!(doc.load_when, vec!["mocking python", "pytest fixtures"]);
        assert_eq!(doc.requires, vec!["python-basics"]);
        assert_eq!(doc.enhances, vec!["python-packaging", "python-typing"]);
        assert_eq!(doc.tags, vec!["python", "testing"]);
        assert!(doc.body.starts_with("# Python Testing Patterns"));
        assert!(doc.extra.contains_key("version"));
        assert!(!doc.extra.contains_key("name"));
    }

    #[test]
    fn test_extension_references_recorded_not_inlined() {
        let doc = parse(PYTHON_TESTING, Path::new("skills/testing/SKILL.md")).unwrap();

        let names: Vec<&str> = doc.extended_files.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["templates", "examples"]);
        assert_eq!(
            doc.extended_files[1].path,
            PathBuf::from("skills/testing/examples.md")
        );
        assert!(doc.extended_files.iter().all(|e| e.size_bytes.is_none()));
        assert!(doc.body.contains("`templates.md`"));
    }

    #[test]
    fn test_defaults() {
        let raw = "---\nname: bare\ndescription: Nothing else declared\n---\nBody\n";
        let doc = parse(raw, Path::new("commands/bare.md")).unwrap();

        assert_eq!(doc.kind, DocumentKind::Command);
        assert_eq!(doc.context_cost, ContextCost::Medium);
        assert!(doc.summary.is_empty());
        assert!(doc.load_when.is_empty());
        assert!(doc.requires.is_empty());
        assert!(doc.enhances.is_empty());
        assert!(doc.extended_files.is_empty());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_missing_fields() {
        let no_name = "---\ndescription: x\n---\n";
        assert_eq!(
            parse(no_name, Path::new("a.md")).unwrap_err(),
            ParseError::MissingField { field: "name" }
        );

        let blank_description = "---\nname: a\ndescription: \"  \"\n---\n";
        assert_eq!(
            parse(blank_description, Path::new("a.md")).unwrap_err(),
            ParseError::MissingField {
                field: "description"
            }
        );
    }

    #[test]
    fn test_summary_with_code_fence_rejected() {
        let raw = "---\nname: a\ndescription: b\nsummary:\n  - fine\n  - \"```bash\"\n---\n";
        assert_eq!(
            parse(raw, Path::new("a.md")).unwrap_err(),
            ParseError::SummaryTooComplex { line: 2 }
        );
    }

    #[test]
    fn test_malformed_metadata() {
        assert!(matches!(
            parse("# Just markdown\n", Path::new("a.md")),
            Err(ParseError::MalformedMetadata(_))
        ));
        assert!(matches!(
            parse("---\nname: [unclosed\n---\n", Path::new("a.md")),
            Err(ParseError::MalformedMetadata(_))
        ));
        assert!(matches!(
            parse("---\nname: a\ndescription: b\ncontext_cost: huge\n---\n", Path::new("a.md")),
            Err(ParseError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_frontmatter_without_trailing_body() {
        let doc = parse("---\nname: a\ndescription: b\n---", Path::new("a.md")).unwrap();
        assert!(doc.body.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let path = Path::new("skills/testing/SKILL.md");
        assert_eq!(
            parse(PYTHON_TESTING, path).unwrap(),
            parse(PYTHON_TESTING, path).unwrap()
        );
    }

    #[test]
    fn test_string_set_dedupes() {
        let set = string_set(Some(OneOrMany::Many(vec![
            " a ".into(),
            "b".into(),
            "a".into(),
            String::new(),
        ])));
        assert_eq!(set, vec!["a", "b"]);
    }

    #[test]
    fn test_external_and_self_links_ignored() {
        let raw = "---\nname: a\ndescription: b\n---\n[web](https://x.io/readme.md) [self](SKILL.md) [up](../shared/style.md)\n";
        let doc = parse(raw, Path::new("skills/a/SKILL.md")).unwrap();
        assert_eq!(doc.extended_files.len(), 1);
        assert_eq!(doc.extended_files[0].path, PathBuf::from("skills/shared/style.md"));
    }
}
