//! Token cost estimation per tier

use skillhub_types::{ContextCost, Document, ExtensionRef};
use std::fmt;

use crate::config::LoaderConfig;

/// Tier-2 token count below which a document classifies as low cost
const LOW_COST_CEILING: usize = 1_000;
/// Tier-2 token count below which a document classifies as medium cost
const MEDIUM_COST_CEILING: usize = 4_000;

/// Declared cost class disagrees with the measured body size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMismatch {
    /// Document id
    pub id: String,
    /// Class written in frontmatter
    pub declared: ContextCost,
    /// Class derived from the body
    pub estimated: ContextCost,
    /// Estimated Tier-2 tokens
    pub body_tokens: usize,
}

impl fmt::Display for CostMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' declares context_cost {} but its body is ~{} tokens ({})",
            self.id, self.declared, self.body_tokens, self.estimated
        )
    }
}

/// Estimates per-tier token costs with fixed heuristics
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator {
    tokens_per_summary_line: usize,
    chars_per_token: usize,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

impl CostEstimator {
    /// Create an estimator from loader settings
    #[must_use]
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            tokens_per_summary_line: config.tokens_per_summary_line,
            chars_per_token: config.chars_per_token.max(1),
        }
    }

    /// Tier-1 cost. An empty summary falls back to the one-line description.
    #[must_use]
    pub fn summary_tokens(&self, doc: &Document) -> usize {
        self.tokens_per_summary_line * doc.summary.len().max(1)
    }

    /// Tier-2 cost (rough approximation: 1 token ≈ `chars_per_token` chars)
    #[must_use]
    pub fn body_tokens(&self, doc: &Document) -> usize {
        self.text_tokens(doc.body.chars().count()).max(1)
    }

    /// Tier-3 cost for one extension
    ///
    /// Uses the size recorded by the scanner; unknown sizes fall back to a
    /// default for the document's declared class.
    #[must_use]
    pub fn extension_tokens(&self, doc: &Document, ext: &ExtensionRef) -> usize {
        match ext.size_bytes {
            Some(bytes) => {
                self.text_tokens(usize::try_from(bytes).unwrap_or(usize::MAX)).max(1)
            }
            None => match doc.context_cost {
                ContextCost::Low => 500,
                ContextCost::Medium => 1_500,
                ContextCost::High => 4_000,
            },
        }
    }

    /// Classify a Tier-2 token count
    #[must_use]
    pub fn classify(tokens: usize) -> ContextCost {
        if tokens < LOW_COST_CEILING {
            ContextCost::Low
        } else if tokens < MEDIUM_COST_CEILING {
            ContextCost::Medium
        } else {
            ContextCost::High
        }
    }

    /// Compare the declared class with the measured body
    #[must_use]
    pub fn check(&self, doc: &Document) -> Option<CostMismatch> {
        let body_tokens = self.body_tokens(doc);
        let estimated = Self::classify(body_tokens);
        (estimated != doc.context_cost).then(|| CostMismatch {
            id: doc.id.clone(),
            declared: doc.context_cost,
            estimated,
            body_tokens,
        })
    }

    fn text_tokens(&self, chars: usize) -> usize {
        chars.div_ceil(self.chars_per_token)
    }
}
