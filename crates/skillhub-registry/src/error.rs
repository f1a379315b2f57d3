//! Error types for parsing, validation, resolution and scanning

use skillhub_types::DocumentKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors local to one document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Required frontmatter field absent or empty
    #[error("missing required field '{field}'")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// Summary line carries a code block
    #[error("summary line {line} contains a code fence; summaries must stay plain text")]
    SummaryTooComplex {
        /// 1-based summary line
        line: usize,
    },

    /// Frontmatter absent or not valid YAML of the expected shape
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),
}

/// Registry-wide invariant violations; any one aborts the build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two documents share a name (or id)
    #[error("duplicate {kind} name '{name}' declared in {} and {}", first.display(), second.display())]
    DuplicateName {
        /// Kind both documents share
        kind: DocumentKind,
        /// Conflicting name
        name: String,
        /// Source of the first document
        first: PathBuf,
        /// Source of the second document
        second: PathBuf,
    },

    /// A `requires`/`enhances` entry points at an unknown id
    #[error("document '{from}' {relation} '{missing}', which does not exist")]
    DanglingReference {
        /// Referencing document
        from: String,
        /// Referenced id
        missing: String,
        /// `requires` or `enhances`
        relation: &'static str,
    },

    /// The `requires` graph contains a cycle
    #[error("cyclic requires: {}", cycle.join(" -> "))]
    CyclicRequires {
        /// Cycle path, first id repeated at the end
        cycle: Vec<String>,
    },
}

/// Dependency expansion failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Cycle found at query time; the registry invariant is broken
    #[error("internal invariant violated, requires cycle: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Cycle path
        cycle: Vec<String>,
    },

    /// Seed or edge names a document the registry does not hold
    #[error("document '{id}' not found")]
    UnknownDocument {
        /// Unknown id
        id: String,
    },
}

/// Lookup of an unknown id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document '{id}' not found")]
pub struct NotFound {
    /// Requested id
    pub id: String,
}

/// Corpus scan failures (per-file and walk errors are reported, not raised)
#[derive(Debug, Error)]
pub enum ScanError {
    /// Scan exceeded its deadline; nothing was registered
    #[error("corpus scan timeout after {timeout:?}")]
    Timeout {
        /// Configured deadline
        timeout: Duration,
    },

    /// Background task panicked or was cancelled
    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures while materializing a plan into text
#[derive(Debug, Error)]
pub enum RenderError {
    /// Plan names a document missing from the registry
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Tier-3 file could not be read
    #[error("failed to read extension {}: {source}", path.display())]
    ReadExtension {
        /// Extension path
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Rescan-and-swap failures; the previous registry stays in place
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The scan itself failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The scanned corpus violates a registry invariant
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
