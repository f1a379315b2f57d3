//! Immutable document registry
//!
//! Built once from a scanned corpus. Construction is all-or-nothing: any
//! duplicate name, dangling reference or `requires` cycle rejects the whole
//! document set.

use skillhub_types::{Document, DocumentKind};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{NotFound, ValidationError};

/// Registry of all documents in a corpus
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Documents in build order
    documents: Vec<Document>,
    /// `id` → index
    by_id: HashMap<String, usize>,
    /// (`kind`, `name`) → index
    by_name: HashMap<(DocumentKind, String), usize>,
}

/// DFS node state for cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl Registry {
    /// Validate a document set and build the registry
    pub fn build(documents: Vec<Document>) -> Result<Self, ValidationError> {
        let mut by_id: HashMap<String, usize> = HashMap::with_capacity(documents.len());
        let mut by_name = HashMap::with_capacity(documents.len());

        for (index, doc) in documents.iter().enumerate() {
            let clash = by_name
                .get(&(doc.kind, doc.name.clone()))
                .or_else(|| by_id.get(&doc.id))
                .copied();
            if let Some(existing) = clash {
                let first: &Document = &documents[existing];
                return Err(ValidationError::DuplicateName {
                    kind: doc.kind,
                    name: doc.name.clone(),
                    first: first.source_path.clone(),
                    second: doc.source_path.clone(),
                });
            }
            by_id.insert(doc.id.clone(), index);
            by_name.insert((doc.kind, doc.name.clone()), index);
        }

        for doc in &documents {
            let edges = doc
                .requires
                .iter()
                .map(|id| ("requires", id))
                .chain(doc.enhances.iter().map(|id| ("enhances", id)));
            for (relation, target) in edges {
                if !by_id.contains_key(target) {
                    return Err(ValidationError::DanglingReference {
                        from: doc.id.clone(),
                        missing: target.clone(),
                        relation,
                    });
                }
            }
        }

        let registry = Self {
            documents,
            by_id,
            by_name,
        };

        if let Some(cycle) = registry.find_requires_cycle() {
            return Err(ValidationError::CyclicRequires { cycle });
        }

        info!(
            "Registry built: {} documents ({} skills, {} agents, {} commands)",
            registry.len(),
            registry.find_by_kind(DocumentKind::Skill).count(),
            registry.find_by_kind(DocumentKind::Agent).count(),
            registry.find_by_kind(DocumentKind::Command).count()
        );

        Ok(registry)
    }

    /// Index documents without validating them
    #[cfg(test)]
    pub(crate) fn unchecked(documents: Vec<Document>) -> Self {
        let by_id = documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        let by_name = documents
            .iter()
            .enumerate()
            .map(|(i, d)| ((d.kind, d.name.clone()), i))
            .collect();
        Self {
            documents,
            by_id,
            by_name,
        }
    }

    /// Depth-first search over `requires` edges; a back edge to a node still
    /// on the stack is a cycle. Iterative, so chain length is not bounded by
    /// the thread stack.
    fn find_requires_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.documents.len()];
        // (node, index of its next `requires` edge)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.documents.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::OnStack;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let Some(target) = self.documents[node].requires.get(next) else {
                    stack.pop();
                    marks[node] = Mark::Done;
                    continue;
                };
                frame.1 += 1;

                let Some(&child) = self.by_id.get(target) else {
                    continue;
                };
                match marks[child] {
                    Mark::OnStack => {
                        let from = stack.iter().position(|&(n, _)| n == child).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[from..]
                            .iter()
                            .map(|&(n, _)| self.documents[n].id.clone())
                            .collect();
                        cycle.push(self.documents[child].id.clone());
                        debug!("requires cycle found: {}", cycle.join(" -> "));
                        return Some(cycle);
                    }
                    Mark::Unvisited => {
                        marks[child] = Mark::OnStack;
                        stack.push((child, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }

    /// Get a document by id
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&i| &self.documents[i])
    }

    /// Get a document by id, with [`NotFound`] for unknown ids
    pub fn fetch(&self, id: &str) -> Result<&Document, NotFound> {
        self.get(id).ok_or_else(|| NotFound { id: id.to_string() })
    }

    /// Get a document by kind and declared name
    pub fn get_by_name(&self, kind: DocumentKind, name: &str) -> Option<&Document> {
        self.by_name
            .get(&(kind, name.to_string()))
            .map(|&i| &self.documents[i])
    }

    /// All documents of a kind, in build order
    pub fn find_by_kind(&self, kind: DocumentKind) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |d| d.kind == kind)
    }

    /// All documents carrying a tag (case-insensitive), in build order
    pub fn find_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |d| d.has_tag(tag))
    }

    /// All documents, in build order
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Check if a document id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Get number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
