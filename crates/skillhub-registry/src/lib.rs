//! `Skillhub` Registry
//!
//! Registry and progressive-disclosure loader for a marketplace of Markdown
//! skills, agents and commands.
//!
//! ## Features
//!
//! - YAML frontmatter parsing (`name`, `description`, `summary`,
//!   `context_cost`, `load_when`, `requires`, `enhances`)
//! - All-or-nothing registry validation: unique names, no dangling
//!   references, acyclic `requires`
//! - Deterministic trigger matching against free-text queries
//! - Dependency expansion, dependencies first
//! - Budgeted, tiered loading that never shrinks as the budget grows
//!
//! ## Architecture
//!
//! Tier 1 (Summary): name, description and a few bullet points
//! Tier 2 (Body): the document's core content
//! Tier 3 (Extended): referenced files, read only when a plan is rendered

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod shared;

pub use config::{LoaderConfig, ScanConfig};
pub use cost::{CostEstimator, CostMismatch};
pub use error::{
    NotFound, ParseError, RefreshError, RenderError, ResolutionError, ScanError, ValidationError,
};
pub use loader::DisclosureLoader;
pub use matcher::{TriggerMatch, TriggerMatcher};
pub use registry::Registry;
pub use resolver::{DependencyResolver, Origin, Resolved};
pub use scan::{CorpusScanner, FailureReason, ScanFailure, ScanReport};
pub use shared::SharedRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CorpusScanner, DependencyResolver, DisclosureLoader, LoaderConfig, Registry,
        SharedRegistry, TriggerMatcher,
    };
    pub use skillhub_types::{Document, DocumentKind, LoadPlan, Tier};
}
