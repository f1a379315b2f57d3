use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Value did not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    /// What was being parsed
    pub what: &'static str,
    /// Offending input
    pub value: String,
    /// Accepted spellings
    pub expected: &'static str,
}

/// Kind of a marketplace document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Knowledge document with tiered content
    Skill,
    /// LLM system prompt
    Agent,
    /// Prompt template invoked by name
    Command,
}

impl DocumentKind {
    /// All kinds, in catalog order
    pub const ALL: [Self; 3] = [Self::Skill, Self::Agent, Self::Command];

    /// Lowercase name used in paths and output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Agent => "agent",
            Self::Command => "command",
        }
    }

    /// Directory name that holds documents of this kind
    pub fn directory(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Agent => "agents",
            Self::Command => "commands",
        }
    }

    /// Derive the kind from a document path.
    ///
    /// The closest ancestor named `skills`, `agents` or `commands` decides;
    /// a `SKILL.md` file or a path with no such ancestor is a skill.
    pub fn from_path(path: &Path) -> Self {
        if path.file_name().is_some_and(|f| f == "SKILL.md") {
            return Self::Skill;
        }

        path.parent()
            .into_iter()
            .flat_map(Path::ancestors)
            .filter_map(|p| p.file_name().and_then(|f| f.to_str()))
            .find_map(|dir| Self::ALL.into_iter().find(|k| k.directory() == dir))
            .unwrap_or(Self::Skill)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| s.eq_ignore_ascii_case(k.as_str()) || s.eq_ignore_ascii_case(k.directory()))
            .ok_or_else(|| UnknownVariant {
                what: "document kind",
                value: s.to_string(),
                expected: "skill, agent, command",
            })
    }
}

/// Declared context-window cost class, cheapest first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContextCost {
    /// Small body, cheap to load
    Low,
    /// Default when undeclared
    #[default]
    Medium,
    /// Large body
    High,
}

impl ContextCost {
    /// Lowercase name as written in frontmatter
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ContextCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextCost {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownVariant {
                what: "context cost",
                value: s.trim().to_string(),
                expected: "low, medium, high",
            }),
        }
    }
}

/// Reference to a Tier-3 file mentioned by a document body.
///
/// Only the location is recorded; the content stays on disk until a plan
/// asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRef {
    /// File stem, e.g. `templates` for `templates.md`
    pub name: String,
    /// Path resolved against the document's directory
    pub path: PathBuf,
    /// File size recorded by the scanner, if the file exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl ExtensionRef {
    /// File name including extension
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|f| f.to_str())
    }
}

/// A parsed skill, agent or command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique in a registry
    pub id: String,
    /// Skill, agent or command
    pub kind: DocumentKind,
    /// Declared name
    pub name: String,
    /// One-line discovery text
    pub description: String,
    /// Tier-1 bullet points
    pub summary: Vec<String>,
    /// Declared cost class
    pub context_cost: ContextCost,
    /// Trigger phrases
    pub load_when: Vec<String>,
    /// Hard prerequisites (document ids)
    pub requires: Vec<String>,
    /// Soft complements (document ids)
    pub enhances: Vec<String>,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Tier-2 content
    pub body: String,
    /// Tier-3 references
    pub extended_files: Vec<ExtensionRef>,
    /// File the document was parsed from
    pub source_path: PathBuf,
    /// Frontmatter keys not consumed by the registry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Document {
    /// Whether the document can be found by trigger search
    pub fn has_triggers(&self) -> bool {
        !self.load_when.is_empty()
    }

    /// Find a Tier-3 reference by stem or file name (case-insensitive)
    pub fn extension(&self, name: &str) -> Option<&ExtensionRef> {
        self.extended_files.iter().find(|ext| {
            ext.name.eq_ignore_ascii_case(name)
                || ext.file_name().is_some_and(|f| f.eq_ignore_ascii_case(name))
        })
    }

    /// Whether the document carries the tag (case-insensitive)
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Generate a concise summary line
    /// Format: "- {name}: {description}"
    pub fn to_summary(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}
