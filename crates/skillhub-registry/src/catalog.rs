//! Generated catalog views
//!
//! Index tables and prompt listings rendered from a registry, so no index
//! has to be maintained by hand.

use skillhub_types::{Document, DocumentKind};

use crate::registry::Registry;

/// Markdown index table for one kind, sorted by name
pub fn render_index(registry: &Registry, kind: DocumentKind) -> String {
    let mut documents: Vec<&Document> = registry.find_by_kind(kind).collect();
    documents.sort_by(|a, b| a.name.cmp(&b.name));

    let title = match kind {
        DocumentKind::Skill => "Skills",
        DocumentKind::Agent => "Agents",
        DocumentKind::Command => "Commands",
    };

    let mut index = format!("# {title} Index\n\n{} {}\n\n", documents.len(), kind.directory());
    if documents.is_empty() {
        return index;
    }

    index.push_str("| Name | Description | Cost | Load when |\n");
    index.push_str("|------|-------------|------|-----------|\n");
    for doc in documents {
        index.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cell(&doc.name),
            cell(&doc.description),
            doc.context_cost,
            cell(&doc.load_when.join(", "))
        ));
    }

    index
}

/// Index tables for every kind that has documents
pub fn render_full_index(registry: &Registry) -> String {
    DocumentKind::ALL
        .into_iter()
        .filter(|&kind| registry.find_by_kind(kind).next().is_some())
        .map(|kind| render_index(registry, kind))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape a value for a Markdown table cell
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Generate document list for LLM system prompt
/// Format:
/// Available skills (use /{name} to activate):
/// - skill-name: Description of what this skill does and when to use it
/// - another-skill: Another description...
pub fn generate_system_prompt(registry: &Registry, kind: DocumentKind) -> String {
    let mut sorted: Vec<&Document> = registry.find_by_kind(kind).collect();
    if sorted.is_empty() {
        return String::new();
    }

    // Sort by name for consistent ordering
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut prompt = format!(
        "\n\nAvailable {} (use /{{name}} to activate):\n",
        kind.directory()
    );
    for doc in sorted {
        prompt.push_str(&doc.to_summary());
        prompt.push('\n');
    }

    prompt
}

/// Generate a concise comma-separated list for tool descriptions
pub fn generate_list(registry: &Registry, kind: DocumentKind) -> String {
    let mut sorted: Vec<&Document> = registry.find_by_kind(kind).collect();
    if sorted.is_empty() {
        return format!("No {} available", kind.directory());
    }
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    sorted
        .iter()
        .map(|doc| format!("{}: {}", doc.name, doc.description))
        .collect::<Vec<_>>()
        .join(", ")
}
