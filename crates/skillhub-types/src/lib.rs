//! Skillhub Types - Core types shared by the registry and the CLI
//!
//! A corpus is a set of Markdown documents (skills, agents, commands) with YAML
//! frontmatter. This crate defines the parsed [`Document`] and the [`LoadPlan`]
//! produced when a query is disclosed against a registry.

pub mod document;
pub mod plan;

pub use document::{ContextCost, Document, DocumentKind, ExtensionRef, UnknownVariant};
pub use plan::{ContentBlock, LoadPlan, PlanEntry, Tier};
