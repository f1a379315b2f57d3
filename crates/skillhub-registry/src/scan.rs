//! Corpus scanning
//!
//! Walks corpus directories, reads and parses every document concurrently
//! and reports per-file failures without aborting the scan. The whole scan
//! runs under a deadline; a timeout yields no documents at all.

use chrono::{DateTime, Utc};
use skillhub_types::Document;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::cost::{CostEstimator, CostMismatch};
use crate::error::{ParseError, RefreshError, ScanError, ValidationError};
use crate::parser;
use crate::registry::Registry;
use crate::shared::SharedRegistry;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// Why a single file was left out of the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// File could not be read
    #[error("unreadable: {0}")]
    Unreadable(String),

    /// File content is not a valid document
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A file excluded from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    /// Offending file
    pub path: PathBuf,
    /// What went wrong
    pub reason: FailureReason,
}

/// Outcome of a corpus scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Parsed documents, sorted by source path
    pub documents: Vec<Document>,
    /// Files that failed to read or parse
    pub failures: Vec<ScanFailure>,
    /// Declared cost classes that disagree with body size
    pub cost_warnings: Vec<CostMismatch>,
    /// Number of candidate files found
    pub files_scanned: usize,
    /// When the scan finished
    pub scanned_at: DateTime<Utc>,
}

impl ScanReport {
    /// Validate the scanned documents into a registry
    pub fn build_registry(&self) -> Result<Registry, ValidationError> {
        Registry::build(self.documents.clone())
    }
}

/// Scans corpus directories for documents
#[derive(Debug, Clone)]
pub struct CorpusScanner {
    /// Corpus roots
    directories: Vec<PathBuf>,
    /// Deadline for the whole scan
    timeout: Duration,
    /// Used for cost warnings
    estimator: CostEstimator,
}

impl Default for CorpusScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusScanner {
    /// Create a scanner with no directories
    #[must_use]
    pub fn new() -> Self {
        Self {
            directories: Vec::new(),
            timeout: ScanConfig::default().timeout(),
            estimator: CostEstimator::default(),
        }
    }

    /// Create a scanner from configuration
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        config
            .directories
            .iter()
            .fold(Self::new().with_timeout(config.timeout()), |scanner, dir| {
                scanner.add_directory(dir)
            })
    }

    /// Add a corpus directory to scan
    #[must_use]
    pub fn add_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Set the scan deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the estimator used for cost warnings
    #[must_use]
    pub fn with_estimator(mut self, estimator: CostEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Scan all configured directories
    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        info!(
            "Starting corpus scan in {} directories",
            self.directories.len()
        );

        let report = tokio::time::timeout(self.timeout, self.scan_all())
            .await
            .map_err(|_| ScanError::Timeout {
                timeout: self.timeout,
            })??;

        info!(
            "Scanned {} files: {} documents, {} failures, {} cost warnings",
            report.files_scanned,
            report.documents.len(),
            report.failures.len(),
            report.cost_warnings.len()
        );
        Ok(report)
    }

    /// Scan, build and swap the shared registry.
    ///
    /// On any failure the shared registry keeps its previous contents.
    pub async fn refresh(&self, shared: &SharedRegistry) -> Result<ScanReport, RefreshError> {
        let report = self.scan().await?;
        let registry = report.build_registry()?;
        shared.replace(registry);
        Ok(report)
    }

    async fn scan_all(&self) -> Result<ScanReport, ScanError> {
        let directories = self.directories.clone();
        let Discovery {
            files,
            failures: mut walk_failures,
        } = tokio::task::spawn_blocking(move || discover(&directories)).await?;
        let files_scanned = files.len();

        let mut tasks = JoinSet::new();
        for (index, path) in files.into_iter().enumerate() {
            tasks.spawn(async move {
                let outcome = load_document(&path).await;
                (index, path, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(files_scanned);
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined?);
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        failures.append(&mut walk_failures);
        for (_, path, outcome) in outcomes {
            match outcome {
                Ok(doc) => {
                    debug!("Parsed {} '{}' at {:?}", doc.kind, doc.id, path);
                    documents.push(doc);
                }
                Err(reason) => {
                    warn!("Skipping {:?}: {}", path, reason);
                    failures.push(ScanFailure { path, reason });
                }
            }
        }

        let cost_warnings = documents
            .iter()
            .filter_map(|doc| self.estimator.check(doc))
            .collect();

        Ok(ScanReport {
            documents,
            failures,
            cost_warnings,
            files_scanned,
            scanned_at: Utc::now(),
        })
    }
}

/// Read and parse one file, recording the size of each Tier-3 reference
async fn load_document(path: &Path) -> Result<Document, FailureReason> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FailureReason::Unreadable(e.to_string()))?;

    let mut doc = parser::parse(&raw, path)?;
    for ext in &mut doc.extended_files {
        ext.size_bytes = tokio::fs::metadata(&ext.path).await.ok().map(|m| m.len());
    }
    Ok(doc)
}

/// Candidate files and the paths the walk could not enter
#[derive(Debug, Default)]
struct Discovery {
    files: Vec<PathBuf>,
    failures: Vec<ScanFailure>,
}

/// Collect candidate document files under every root, sorted.
///
/// Symlinks are followed, so plugins installed as links are scanned; link
/// loops and unreadable entries become failures. A file reachable through
/// several paths is kept once.
fn discover(roots: &[PathBuf]) -> Discovery {
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for root in roots {
        if !root.exists() {
            debug!("Corpus directory does not exist: {:?}", root);
            continue;
        }
        if !root.is_dir() {
            warn!("Corpus path is not a directory: {:?}", root);
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    warn!("Failed to walk {:?}: {}", path, e);
                    discovery.failures.push(ScanFailure {
                        path,
                        reason: FailureReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            if entry.file_type().is_dir() || !is_document_file(entry.path()) {
                continue;
            }
            let canonical =
                fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
            if seen.insert(canonical) {
                discovery.files.push(entry.into_path());
            } else {
                debug!("Already discovered through another path: {:?}", entry.path());
            }
        }
    }

    discovery.files.sort();
    discovery
}

/// Hidden directories, `node_modules` and `target`
fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

/// `SKILL.md` anywhere, or a Markdown file directly inside `agents/` or `commands/`
fn is_document_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name == "SKILL.md" {
        return true;
    }

    let is_markdown = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str());

    is_markdown && matches!(parent, Some("agents" | "commands"))
}
