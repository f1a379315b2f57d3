use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of detail disclosed for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Name, description and summary bullets
    Summary = 1,
    /// Core body
    Body = 2,
    /// Extended files referenced by the body
    Extended = 3,
}

impl Tier {
    /// Numeric tier level (1-3)
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier-{}", self.level())
    }
}

/// One document selected by a disclosure query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Document id
    pub id: String,
    /// Highest tier admitted
    pub tier: Tier,
    /// Estimated tokens for all admitted tiers
    pub estimated_tokens: usize,
    /// Tier-3 extensions admitted, by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Trigger score when the document matched the query directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
}

/// Result of a disclosure query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPlan {
    /// Query the plan answers
    pub query: String,
    /// Requested budget (may be zero or negative)
    pub budget_tokens: i64,
    /// Selected documents, dependencies before dependents
    pub entries: Vec<PlanEntry>,
    /// Sum of entry costs
    pub total_estimated_tokens: usize,
    /// Mandatory summaries pushed the plan past the budget
    pub over_budget: bool,
}

impl LoadPlan {
    /// Plan with no entries
    pub fn empty(query: impl Into<String>, budget_tokens: i64) -> Self {
        Self {
            query: query.into(),
            budget_tokens,
            entries: Vec::new(),
            total_estimated_tokens: 0,
            over_budget: false,
        }
    }

    /// Get the entry for a document
    pub fn entry(&self, id: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Check if a document is part of the plan
    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    /// Document ids in plan order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rendered text for one plan entry, ready for context injection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Document id
    pub id: String,
    /// Tier the text was rendered to
    pub tier: Tier,
    /// Injected text
    pub text: String,
}
