//! Dependency expansion over `requires` and `enhances` edges

use skillhub_types::Document;
use std::collections::{HashMap, HashSet};

use crate::error::ResolutionError;
use crate::registry::Registry;

/// Why a document is part of an expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Requested directly
    Seed,
    /// Pulled in by a transitive `requires` edge
    Required,
    /// Direct `enhances` target of a seed, or one of its prerequisites
    Enhancement,
}

/// One document in an expansion
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// The document
    pub document: &'a Document,
    /// Why it was included
    pub origin: Origin,
    /// Positions (in the seed list) of the seeds that reached it
    pub reached_from: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Expands seed documents into a dependency-ordered list
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    registry: &'a Registry,
}

/// Traversal state shared by one expansion
struct Walk<'a> {
    registry: &'a Registry,
    marks: HashMap<&'a str, Mark>,
    /// Current path: document and index of its next `requires` edge
    stack: Vec<(&'a Document, usize)>,
    order: Vec<&'a Document>,
}

impl<'a> Walk<'a> {
    fn document(&self, id: &str) -> Result<&'a Document, ResolutionError> {
        self.registry
            .get(id)
            .ok_or_else(|| ResolutionError::UnknownDocument { id: id.to_string() })
    }

    /// Post-order DFS: prerequisites land in `order` before their dependents.
    ///
    /// Iterative, one frame per document on the current path.
    fn visit(&mut self, root: &'a Document) -> Result<(), ResolutionError> {
        if self.marks.get(root.id.as_str()) == Some(&Mark::Done) {
            return Ok(());
        }
        self.enter(root);

        while let Some(frame) = self.stack.last_mut() {
            let (doc, next) = *frame;
            let Some(target) = doc.requires.get(next) else {
                self.stack.pop();
                self.marks.insert(doc.id.as_str(), Mark::Done);
                self.order.push(doc);
                continue;
            };
            frame.1 += 1;

            let dependency = self.document(target)?;
            match self.marks.get(dependency.id.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::OnStack) => {
                    let from = self
                        .stack
                        .iter()
                        .position(|(d, _)| d.id == dependency.id)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        self.stack[from..].iter().map(|(d, _)| d.id.clone()).collect();
                    cycle.push(dependency.id.clone());
                    return Err(ResolutionError::CycleDetected { cycle });
                }
                None => self.enter(dependency),
            }
        }
        Ok(())
    }

    fn enter(&mut self, doc: &'a Document) {
        self.marks.insert(doc.id.as_str(), Mark::OnStack);
        self.stack.push((doc, 0));
    }
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over a registry
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Expand seeds to document ids.
    ///
    /// `requires` is followed transitively and ordered dependencies first;
    /// seeds keep their given order where no edge forces otherwise. With
    /// `include_enhances`, direct `enhances` targets of the seeds are
    /// appended afterwards (not followed further).
    pub fn expand<S: AsRef<str>>(
        &self,
        seeds: &[S],
        include_enhances: bool,
    ) -> Result<Vec<String>, ResolutionError> {
        Ok(self
            .resolve(seeds, include_enhances)?
            .into_iter()
            .map(|r| r.document.id.clone())
            .collect())
    }

    /// Expand seeds, keeping the origin of every document
    pub fn resolve<S: AsRef<str>>(
        &self,
        seeds: &[S],
        include_enhances: bool,
    ) -> Result<Vec<Resolved<'a>>, ResolutionError> {
        let mut walk = Walk {
            registry: self.registry,
            marks: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };

        let mut seed_docs: Vec<&'a Document> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let doc = walk.document(seed.as_ref())?;
            if !seed_docs.iter().any(|d| d.id == doc.id) {
                seed_docs.push(doc);
            }
        }

        for doc in seed_docs.iter().copied() {
            walk.visit(doc)?;
        }
        let required_len = walk.order.len();

        if include_enhances {
            for doc in seed_docs.iter().copied() {
                for target in &doc.enhances {
                    let enhancement = walk.document(target)?;
                    walk.visit(enhancement)?;
                }
            }
        }

        let seed_ids: HashSet<&str> = seed_docs.iter().map(|d| d.id.as_str()).collect();
        let reach = self.reach(&seed_docs, include_enhances)?;

        Ok(walk
            .order
            .into_iter()
            .enumerate()
            .map(|(position, document)| {
                let origin = if seed_ids.contains(document.id.as_str()) {
                    Origin::Seed
                } else if position < required_len {
                    Origin::Required
                } else {
                    Origin::Enhancement
                };
                Resolved {
                    document,
                    origin,
                    reached_from: reach.get(document.id.as_str()).cloned().unwrap_or_default(),
                }
            })
            .collect())
    }

    /// For every reachable id, the seed positions whose closure contains it
    fn reach(
        &self,
        seeds: &[&'a Document],
        include_enhances: bool,
    ) -> Result<HashMap<&'a str, Vec<usize>>, ResolutionError> {
        let mut reach: HashMap<&'a str, Vec<usize>> = HashMap::new();

        for (position, &seed) in seeds.iter().enumerate() {
            let mut roots: Vec<&'a Document> = vec![seed];
            if include_enhances {
                for target in &seed.enhances {
                    roots.push(self.registry.get(target).ok_or_else(|| {
                        ResolutionError::UnknownDocument { id: target.clone() }
                    })?);
                }
            }

            let mut seen: HashSet<&'a str> = HashSet::new();
            while let Some(doc) = roots.pop() {
                if !seen.insert(doc.id.as_str()) {
                    continue;
                }
                reach.entry(doc.id.as_str()).or_default().push(position);
                for target in &doc.requires {
                    if let Some(dependency) = self.registry.get(target) {
                        roots.push(dependency);
                    }
                }
            }
        }

        Ok(reach)
    }
}
